//! Registry: every known device, plus the named command table.
//!
//! Front ends hand the registry whatever identifier their client supplied
//! and get back a [`Device`].  Resolution tries, in order:
//!
//! 1. an exact alias (every device has at least its host as an alias);
//! 2. `"default"`, meaning the first device ever registered (not found,
//!    without any network attempt, while the registry is empty);
//! 3. a scan of known devices by host, MAC address (any separator style) or
//!    resolved address;
//! 4. a fresh device for the identifier, kept only if it connects.
//!
//! # Concurrency
//!
//! All mutation goes through one `RwLock` writer.  Lookups clone what they
//! need out of the lock before touching the network, so a slow handshake
//! never blocks other requests.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use ir_core::{decode_text, CanonicalPacket};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::application::commands::CommandTable;
use crate::application::device::Device;
use crate::domain::{BridgeError, MacAddress};
use crate::infrastructure::controller::DeviceController;

/// Alias that always refers to the first registered device.
pub const DEFAULT_ALIAS: &str = "default";

#[derive(Default)]
struct RegistryInner {
    by_alias: HashMap<String, Arc<Device>>,
    devices: Vec<Arc<Device>>,
}

/// The shared device registry.  Wrap it in an `Arc` and hand a clone to each
/// front end.
pub struct Registry {
    controller: Arc<dyn DeviceController>,
    commands: CommandTable,
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub fn new(controller: Arc<dyn DeviceController>) -> Self {
        Self {
            controller,
            commands: CommandTable::new(),
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    /// Finds the device for `id`, connecting to it on demand if it is not
    /// known yet.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] when nothing matched and no device
    /// answered at `id`.
    pub fn resolve(&self, id: &str) -> Result<Arc<Device>, BridgeError> {
        let devices = {
            let inner = self.inner.read();
            if let Some(device) = inner.by_alias.get(id) {
                return Ok(Arc::clone(device));
            }
            if id == DEFAULT_ALIAS {
                return inner
                    .devices
                    .first()
                    .cloned()
                    .ok_or_else(|| BridgeError::NotFound(id.to_string()));
            }
            inner.devices.clone()
        };

        if let Some(device) = Self::scan(&devices, id) {
            return Ok(device);
        }

        debug!("{id}: not registered, trying on demand");
        let device = Arc::new(Device::new(id, Arc::clone(&self.controller), self.commands.clone()));
        if !device.ensure_connected() {
            return Err(BridgeError::NotFound(id.to_string()));
        }

        match self.register_device(Arc::clone(&device), None) {
            Some(registered) => Ok(registered),
            // Another request registered the same host while we connected.
            None => self
                .inner
                .read()
                .by_alias
                .get(id)
                .cloned()
                .ok_or_else(|| BridgeError::NotFound(id.to_string())),
        }
    }

    /// Looks for `id` among known devices.  Matching by MAC or address needs
    /// a connection, so this may contact devices that are not connected yet.
    fn scan(devices: &[Arc<Device>], id: &str) -> Option<Arc<Device>> {
        if let Some(device) = devices.iter().find(|d| d.host() == id) {
            return Some(Arc::clone(device));
        }

        let mac = MacAddress::parse(id);
        let ip = id.parse::<IpAddr>().ok();
        if mac.is_none() && ip.is_none() {
            return None;
        }

        devices
            .iter()
            .find(|device| {
                if !device.ensure_connected() {
                    return false;
                }
                (mac.is_some() && device.cached_mac() == mac)
                    || ip.is_some_and(|ip| device.addresses().contains(&ip))
            })
            .cloned()
    }

    /// Resolves `id` and transmits `payload` on it.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NotFound`] for unknown devices.
    /// - [`BridgeError::InvalidCode`] for undecodable payloads.
    /// - [`BridgeError::ConnectionFailed`] when the device was found but could
    ///   not be reached or refused the packet.  The next call reconnects.
    pub fn transmit(&self, id: &str, payload: &[u8], repeat: Option<u32>) -> Result<(), BridgeError> {
        let device = self.resolve(id)?;
        if device.transmit(payload, repeat)? {
            Ok(())
        } else {
            Err(BridgeError::ConnectionFailed(device.to_string()))
        }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Creates a device for `host`, connects it, and registers it under
    /// `alias` (default: the host itself).
    ///
    /// Returns `None` without contacting the host when the alias is already
    /// taken.  A device that fails to connect is still registered and retried
    /// on first use.
    pub fn add_device(&self, host: &str, alias: Option<&str>) -> Option<Arc<Device>> {
        let alias = alias.unwrap_or(host);
        if self.inner.read().by_alias.contains_key(alias) {
            info!("{alias}: alias already registered, skipping {host}");
            return None;
        }

        let device = Arc::new(Device::new(host, Arc::clone(&self.controller), self.commands.clone()));
        if !device.ensure_connected() {
            warn!("{host}: not reachable yet, will retry on first use");
        }
        self.register_device(device, Some(alias))
    }

    /// Registers an existing device under `alias` (default: its host).
    ///
    /// Returns `None` when `alias` is already taken.
    pub fn register_device(&self, device: Arc<Device>, alias: Option<&str>) -> Option<Arc<Device>> {
        let alias = alias.unwrap_or(device.host()).to_string();

        let mut inner = self.inner.write();
        if inner.by_alias.contains_key(&alias) {
            info!("{alias}: alias already registered, skipping {}", device.host());
            return None;
        }

        inner.by_alias.insert(alias.clone(), Arc::clone(&device));
        inner.devices.push(Arc::clone(&device));
        info!("registered {device} as {alias}");
        Some(device)
    }

    /// Broadcasts for devices for `timeout` and registers every one found.
    ///
    /// Disabled (returns `false` immediately) when `timeout` is `None` or
    /// zero.  Otherwise returns whether at least one device is known
    /// afterwards.  Discovery failures are logged, not returned.
    pub fn discover(&self, timeout: Option<Duration>) -> bool {
        let Some(timeout) = timeout.filter(|t| !t.is_zero()) else {
            return false;
        };

        info!("discovering devices for {timeout:?}");
        match self.controller.discover(timeout) {
            Ok(sessions) => {
                info!("discovery found {} device(s)", sessions.len());
                for session in sessions {
                    let device = Device::from_session(
                        session,
                        Arc::clone(&self.controller),
                        self.commands.clone(),
                    );
                    self.register_device(Arc::new(device), None);
                }
            }
            Err(e) => warn!("discovery failed: {e}"),
        }

        !self.inner.read().devices.is_empty()
    }

    /// Decodes `payload` and stores it as command `name`, replacing any
    /// previous definition.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidCommandName`] when `name` is empty or
    /// contains whitespace, and [`BridgeError::InvalidCode`] when the payload
    /// cannot be decoded.
    pub fn set_command(&self, name: &str, payload: &[u8]) -> Result<(), BridgeError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(BridgeError::InvalidCommandName(name.to_string()));
        }
        let (packet, _) = decode_text(payload, None)?;
        debug!("command {name}: {} byte packet", packet.len());
        self.commands.insert(name, packet);
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Every registered device, in registration order.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.inner.read().devices.clone()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.names()
    }

    pub fn command(&self, name: &str) -> Option<CanonicalPacket> {
        self.commands.get(name)
    }

    /// Every command, in insertion order.
    pub fn commands(&self) -> Vec<(String, CanonicalPacket)> {
        self.commands.snapshot()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("aliases", &inner.by_alias.keys().collect::<Vec<_>>())
            .field("devices", &inner.devices)
            .field("commands", &self.commands.names())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
