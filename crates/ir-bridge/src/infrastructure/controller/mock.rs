//! In-memory device controller for tests.
//!
//! Lets tests declare a set of fake devices, flip their reachability, and
//! inspect every packet the bridge sent, without any network access.

use std::net::IpAddr;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use parking_lot::Mutex;

use super::{ControllerError, DeviceController, DeviceSession};

/// A fake device known to a [`MockController`].
#[derive(Debug, Clone)]
struct MockDevice {
    host: String,
    ip: IpAddr,
    mac: [u8; 6],
    reachable: bool,
    discoverable: bool,
    accepts_auth: bool,
    send_fails: bool,
    handshakes: u32,
    sent: Vec<Vec<u8>>,
}

impl MockDevice {
    fn answers_to(&self, host: &str) -> bool {
        self.host == host || self.ip.to_string() == host
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    discover_calls: u32,
    handshake_gate: Option<Arc<Barrier>>,
}

impl MockState {
    fn find(&self, host: &str) -> Option<&MockDevice> {
        self.devices.iter().find(|d| d.answers_to(host))
    }

    fn find_mut(&mut self, host: &str) -> Option<&mut MockDevice> {
        self.devices.iter_mut().find(|d| d.answers_to(host))
    }
}

/// A mock implementation of [`DeviceController`].
///
/// Cloning shares the underlying state, so a test can keep one handle for
/// inspection while the registry owns another.
#[derive(Debug, Clone, Default)]
pub struct MockController {
    state: Arc<Mutex<MockState>>,
}

impl MockController {
    /// Creates a controller that knows no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reachable device that answers handshakes on `host` or `ip` but
    /// does not show up in discovery.
    pub fn with_device(self, host: &str, ip: IpAddr, mac: [u8; 6]) -> Self {
        self.push(host, ip, mac, false);
        self
    }

    /// Adds a reachable device that also answers discovery broadcasts.
    pub fn with_discoverable_device(self, host: &str, ip: IpAddr, mac: [u8; 6]) -> Self {
        self.push(host, ip, mac, true);
        self
    }

    fn push(&self, host: &str, ip: IpAddr, mac: [u8; 6], discoverable: bool) {
        self.state.lock().devices.push(MockDevice {
            host: host.to_string(),
            ip,
            mac,
            reachable: true,
            discoverable,
            accepts_auth: true,
            send_fails: false,
            handshakes: 0,
            sent: Vec::new(),
        });
    }

    /// Makes `host` time out on handshake (and on sends through existing
    /// sessions) until set reachable again.
    pub fn set_reachable(&self, host: &str, reachable: bool) {
        if let Some(device) = self.state.lock().find_mut(host) {
            device.reachable = reachable;
        }
    }

    /// Makes `host` refuse authentication.
    pub fn set_accepts_auth(&self, host: &str, accepts: bool) {
        if let Some(device) = self.state.lock().find_mut(host) {
            device.accepts_auth = accepts;
        }
    }

    /// Makes every send to `host` fail while the handshake still succeeds.
    pub fn set_send_fails(&self, host: &str, fails: bool) {
        if let Some(device) = self.state.lock().find_mut(host) {
            device.send_fails = fails;
        }
    }

    /// Makes every handshake wait on `gate` before answering, so tests can
    /// force several handshakes to overlap.  `None` removes the gate.
    pub fn set_handshake_gate(&self, gate: Option<Arc<Barrier>>) {
        self.state.lock().handshake_gate = gate;
    }

    /// Packets delivered to `host`, oldest first.
    pub fn sent_packets(&self, host: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .find(host)
            .map(|d| d.sent.clone())
            .unwrap_or_default()
    }

    /// Number of handshakes attempted against `host`.
    pub fn handshake_count(&self, host: &str) -> u32 {
        self.state.lock().find(host).map_or(0, |d| d.handshakes)
    }

    /// Number of discovery broadcasts performed.
    pub fn discover_count(&self) -> u32 {
        self.state.lock().discover_calls
    }

    fn session_for(&self, device: &MockDevice) -> Box<dyn DeviceSession> {
        Box::new(MockSession {
            key: device.host.clone(),
            ip: device.ip,
            mac: device.mac,
            state: Arc::clone(&self.state),
        })
    }
}

impl DeviceController for MockController {
    fn discover(&self, _timeout: Duration) -> Result<Vec<Box<dyn DeviceSession>>, ControllerError> {
        let found: Vec<MockDevice> = {
            let mut state = self.state.lock();
            state.discover_calls += 1;
            state
                .devices
                .iter()
                .filter(|d| d.discoverable && d.reachable)
                .cloned()
                .collect()
        };
        Ok(found.iter().map(|d| self.session_for(d)).collect())
    }

    fn handshake(&self, host: &str) -> Result<Option<Box<dyn DeviceSession>>, ControllerError> {
        let (device, gate) = {
            let mut state = self.state.lock();
            let gate = state.handshake_gate.clone();
            let Some(device) = state.find_mut(host) else {
                return Err(ControllerError::Unreachable(host.to_string()));
            };
            device.handshakes += 1;
            if !device.reachable {
                return Err(ControllerError::Timeout);
            }
            (device.clone(), gate)
        };
        // Wait outside the lock so the other handshakes can reach the gate.
        if let Some(gate) = gate {
            gate.wait();
        }
        Ok(Some(self.session_for(&device)))
    }
}

/// Session handed out by [`MockController`].
struct MockSession {
    key: String,
    ip: IpAddr,
    mac: [u8; 6],
    state: Arc<Mutex<MockState>>,
}

impl DeviceSession for MockSession {
    fn authenticate(&self) -> Result<bool, ControllerError> {
        let state = self.state.lock();
        match state.find(&self.key) {
            Some(device) if !device.reachable => Err(ControllerError::Timeout),
            Some(device) => Ok(device.accepts_auth),
            None => Err(ControllerError::Unreachable(self.key.clone())),
        }
    }

    fn send_packet(&self, packet: &[u8]) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        let device = state
            .find_mut(&self.key)
            .ok_or_else(|| ControllerError::Unreachable(self.key.clone()))?;
        if !device.reachable {
            return Err(ControllerError::Timeout);
        }
        if device.send_fails {
            return Err(ControllerError::Rejected("send refused".to_string()));
        }
        device.sent.push(packet.to_vec());
        Ok(())
    }

    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }

    fn host_address(&self) -> IpAddr {
        self.ip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: [u8; 6] = [0x34, 0xea, 0x34, 0x01, 0x02, 0x03];

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_handshake_by_host_or_ip() {
        // Arrange
        let controller = MockController::new().with_device("blaster.lan", ip(5), MAC);

        // Act / Assert
        assert!(controller.handshake("blaster.lan").unwrap().is_some());
        assert!(controller.handshake("10.0.0.5").unwrap().is_some());
        assert_eq!(controller.handshake_count("blaster.lan"), 2);
    }

    #[test]
    fn test_handshake_unknown_host_is_unreachable() {
        let controller = MockController::new();
        assert!(matches!(
            controller.handshake("nowhere"),
            Err(ControllerError::Unreachable(_))
        ));
    }

    #[test]
    fn test_unreachable_device_times_out() {
        // Arrange
        let controller = MockController::new().with_device("a", ip(1), MAC);
        controller.set_reachable("a", false);

        // Act / Assert
        assert!(matches!(controller.handshake("a"), Err(ControllerError::Timeout)));
    }

    #[test]
    fn test_session_records_sent_packets() {
        // Arrange
        let controller = MockController::new().with_device("a", ip(1), MAC);
        let session = controller.handshake("a").unwrap().unwrap();

        // Act
        session.send_packet(&[0x26, 0x00]).unwrap();
        session.send_packet(&[0xb2, 0x01]).unwrap();

        // Assert
        assert_eq!(controller.sent_packets("a"), vec![vec![0x26, 0x00], vec![0xb2, 0x01]]);
        assert_eq!(session.mac_address(), MAC);
        assert_eq!(session.host_address(), ip(1));
    }

    #[test]
    fn test_send_failure_is_reported() {
        let controller = MockController::new().with_device("a", ip(1), MAC);
        let session = controller.handshake("a").unwrap().unwrap();
        controller.set_send_fails("a", true);

        assert!(session.send_packet(&[0x26]).is_err());
        assert!(controller.sent_packets("a").is_empty());
    }

    #[test]
    fn test_discover_returns_only_discoverable_devices() {
        // Arrange
        let controller = MockController::new()
            .with_discoverable_device("a", ip(1), MAC)
            .with_device("b", ip(2), MAC)
            .with_discoverable_device("c", ip(3), MAC);
        controller.set_reachable("c", false);

        // Act
        let found = controller.discover(Duration::from_secs(1)).unwrap();

        // Assert
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].host_address(), ip(1));
        assert_eq!(controller.discover_count(), 1);
    }

    #[test]
    fn test_handshake_gate_releases_overlapping_handshakes() {
        // Arrange
        let controller = MockController::new().with_device("a", ip(1), MAC);
        controller.set_handshake_gate(Some(Arc::new(Barrier::new(2))));

        // Act: neither call returns until both are waiting
        let (first, second) = std::thread::scope(|scope| {
            let first = scope.spawn(|| controller.handshake("a").is_ok());
            let second = scope.spawn(|| controller.handshake("a").is_ok());
            (first.join().unwrap(), second.join().unwrap())
        });

        // Assert
        assert!(first && second);
        assert_eq!(controller.handshake_count("a"), 2);
    }

    #[test]
    fn test_authentication_can_be_refused() {
        let controller = MockController::new().with_device("a", ip(1), MAC);
        controller.set_accepts_auth("a", false);
        let session = controller.handshake("a").unwrap().unwrap();

        assert!(!session.authenticate().unwrap());
    }
}
