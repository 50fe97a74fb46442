//! Broadlink backend over the `rbroadlink` crate.
//!
//! `rbroadlink` performs the hello/auth exchange while constructing a
//! device, so a session returned from here is already authenticated.  Its
//! calls are blocking UDP round trips.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::sync::mpsc;
use std::time::Duration;

use rbroadlink::{Device, RemoteDevice};
use tracing::{debug, warn};

use crate::domain::MacAddress;

use super::{ControllerError, DeviceController, DeviceSession};

/// Controller backed by real Broadlink devices on the local network.
#[derive(Debug, Default, Clone, Copy)]
pub struct BroadlinkController;

impl BroadlinkController {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceController for BroadlinkController {
    fn discover(&self, timeout: Duration) -> Result<Vec<Box<dyn DeviceSession>>, ControllerError> {
        // `Device::list` has no deadline parameter; bound it from outside.
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("ir-bridge-discovery".to_string())
            .spawn(move || {
                let _ = tx.send(Device::list(None));
            })?;

        let devices = match rx.recv_timeout(timeout) {
            Ok(Ok(devices)) => devices,
            Ok(Err(e)) => return Err(ControllerError::Unreachable(e)),
            Err(_) => return Err(ControllerError::Timeout),
        };

        Ok(devices
            .into_iter()
            .filter_map(|device| match device {
                Device::Remote { remote } => {
                    Some(Box::new(BroadlinkSession { remote }) as Box<dyn DeviceSession>)
                }
                _ => {
                    debug!("ignoring discovered non-remote device");
                    None
                }
            })
            .collect())
    }

    fn handshake(&self, host: &str) -> Result<Option<Box<dyn DeviceSession>>, ControllerError> {
        let ip = resolve_ipv4(host)?;
        match Device::from_ip(ip, None).map_err(ControllerError::Unreachable)? {
            Device::Remote { remote } => Ok(Some(Box::new(BroadlinkSession { remote }))),
            _ => {
                warn!("{host} is not an IR/RF remote device");
                Ok(None)
            }
        }
    }
}

fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, ControllerError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    (host, 0)
        .to_socket_addrs()
        .map_err(|e| ControllerError::Unreachable(format!("{host}: {e}")))?
        .find_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ControllerError::Unreachable(format!("{host}: no IPv4 address")))
}

struct BroadlinkSession {
    remote: RemoteDevice,
}

impl DeviceSession for BroadlinkSession {
    fn authenticate(&self) -> Result<bool, ControllerError> {
        Ok(true)
    }

    fn send_packet(&self, packet: &[u8]) -> Result<(), ControllerError> {
        self.remote
            .send_code(packet)
            .map(|_| ())
            .map_err(ControllerError::Rejected)
    }

    fn mac_address(&self) -> [u8; 6] {
        // Devices report their MAC least significant octet first.
        MacAddress::from_reversed(self.remote.info.mac).octets()
    }

    fn host_address(&self) -> IpAddr {
        IpAddr::V4(self.remote.info.address)
    }
}
