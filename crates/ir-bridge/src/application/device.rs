//! Device handle: one IR/RF blaster and its lazily established connection.
//!
//! A [`Device`] is created the first time anything refers to it (manual
//! configuration, discovery, or an on-demand lookup) and lives for the rest
//! of the process.  Its connection, however, comes and goes:
//!
//! ```text
//! Disconnected ──ensure_connected()──► Connected(conn)
//!      ▲                                     │
//!      └──────────── send failure ───────────┘
//! ```
//!
//! The connection bundles everything learnt during the handshake (the bound
//! session, the MAC address, the resolved addresses) and is swapped in and
//! out as one unit under a single lock.  Handshakes run outside the lock; if
//! two callers race, the first connection stored wins and the other is
//! discarded.
//!
//! All methods block on network I/O.  Async callers use `spawn_blocking`.

use std::fmt;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Arc;

use ir_core::{decode, CanonicalPacket, CodecError, IrCode};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::application::commands::CommandTable;
use crate::domain::{MacAddress, UNKNOWN_MAC};
use crate::infrastructure::controller::{DeviceController, DeviceSession};

/// Everything known about a live device session.
pub struct Connection {
    session: Box<dyn DeviceSession>,
    mac: MacAddress,
    addresses: Vec<IpAddr>,
}

impl Connection {
    /// Binds an authenticated session to `host`, resolving the host name and
    /// adding the session's own address.
    fn bind(host: &str, session: Box<dyn DeviceSession>) -> Self {
        let mac = MacAddress::new(session.mac_address());
        let mut addresses = resolve_host(host);
        let own = session.host_address();
        if !addresses.contains(&own) {
            addresses.push(own);
        }
        Self {
            session,
            mac,
            addresses,
        }
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn addresses(&self) -> &[IpAddr] {
        &self.addresses
    }
}

/// Connection state of a [`Device`].
#[derive(Clone, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected(Arc<Connection>),
}

/// One blaster known to the registry.
pub struct Device {
    host: String,
    controller: Arc<dyn DeviceController>,
    commands: CommandTable,
    state: RwLock<ConnectionState>,
}

impl Device {
    /// Creates a disconnected device for `host` (address or host name).
    pub fn new(host: &str, controller: Arc<dyn DeviceController>, commands: CommandTable) -> Self {
        Self {
            host: host.to_string(),
            controller,
            commands,
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    /// Wraps a session returned by discovery.  The host is the session's
    /// address and the device starts out connected.
    pub fn from_session(
        session: Box<dyn DeviceSession>,
        controller: Arc<dyn DeviceController>,
        commands: CommandTable,
    ) -> Self {
        let host = session.host_address().to_string();
        let connection = Connection::bind(&host, session);
        Self {
            host,
            controller,
            commands,
            state: RwLock::new(ConnectionState::Connected(Arc::new(connection))),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.read(), ConnectionState::Connected(_))
    }

    /// Connects if needed.  Returns `true` when a connection is available.
    ///
    /// Failures (resolution, timeout, refused authentication) are logged and
    /// leave the device disconnected; the next call tries again.
    pub fn ensure_connected(&self) -> bool {
        self.connect().is_some()
    }

    /// MAC address in display form, connecting if needed.  Falls back to
    /// [`UNKNOWN_MAC`] when the device cannot be reached.
    pub fn mac(&self) -> String {
        self.connected_mac()
            .map_or_else(|| UNKNOWN_MAC.to_string(), |mac| mac.to_string())
    }

    /// MAC address, connecting if needed.
    pub fn connected_mac(&self) -> Option<MacAddress> {
        self.connect().map(|connection| connection.mac)
    }

    /// MAC address learnt by the current connection, without connecting.
    pub fn cached_mac(&self) -> Option<MacAddress> {
        self.connection().map(|connection| connection.mac)
    }

    /// Addresses learnt by the current connection; empty while disconnected.
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.connection()
            .map(|connection| connection.addresses.clone())
            .unwrap_or_default()
    }

    /// Decodes `payload` and sends it.
    ///
    /// `payload` may be a registered command name, Pronto hex, base64, or a
    /// binary packet, optionally prefixed with an `N*` repeat multiplier.
    ///
    /// Returns `Ok(false)` when no connection could be established or the
    /// send failed.  A failed send drops the connection so the next call
    /// performs a fresh handshake.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the payload cannot be decoded.
    pub fn transmit(&self, payload: &[u8], repeat: Option<u32>) -> Result<bool, CodecError> {
        let packet = self.prepare(payload, repeat)?;

        let Some(connection) = self.connect() else {
            warn!("{self}: not connected, dropping {} byte packet", packet.len());
            return Ok(false);
        };

        match connection.session.send_packet(packet.as_bytes()) {
            Ok(()) => {
                debug!(
                    "{self}: sent {} byte {:?} packet (repeat {})",
                    packet.len(),
                    packet.packet_type(),
                    packet.repeat()
                );
                Ok(true)
            }
            Err(e) => {
                warn!("{self}: send failed: {e}");
                self.drop_connection(&connection);
                Ok(false)
            }
        }
    }

    /// Turns a raw payload into the packet that [`transmit`](Self::transmit)
    /// would send, substituting registered command names.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the payload cannot be decoded.
    pub fn prepare(&self, payload: &[u8], repeat: Option<u32>) -> Result<CanonicalPacket, CodecError> {
        let (code, repeat) = IrCode::classify(payload, repeat, |name| self.commands.contains(name))?;
        match code {
            IrCode::Named(name) => {
                let stored = self
                    .commands
                    .get(&name)
                    .ok_or(CodecError::UnresolvedCommand(name))?;
                Ok(match repeat {
                    Some(repeat) => stored.with_repeat(repeat),
                    None => stored,
                })
            }
            code => decode(&code, repeat).map(|(packet, _)| packet),
        }
    }

    // ── Connection management ─────────────────────────────────────────────────

    fn connection(&self) -> Option<Arc<Connection>> {
        match &*self.state.read() {
            ConnectionState::Connected(connection) => Some(Arc::clone(connection)),
            ConnectionState::Disconnected => None,
        }
    }

    fn connect(&self) -> Option<Arc<Connection>> {
        if let Some(connection) = self.connection() {
            return Some(connection);
        }

        let fresh = Arc::new(self.handshake()?);

        let mut state = self.state.write();
        match &*state {
            ConnectionState::Connected(winner) => Some(Arc::clone(winner)),
            ConnectionState::Disconnected => {
                *state = ConnectionState::Connected(Arc::clone(&fresh));
                info!("connected to {}@{}", fresh.mac, self.host);
                Some(fresh)
            }
        }
    }

    fn handshake(&self) -> Option<Connection> {
        let session = match self.controller.handshake(&self.host) {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!("{}: no supported device answered", self.host);
                return None;
            }
            Err(e) => {
                warn!("{}: handshake failed: {e}", self.host);
                return None;
            }
        };

        match session.authenticate() {
            Ok(true) => Some(Connection::bind(&self.host, session)),
            Ok(false) => {
                warn!("{}: authentication refused", self.host);
                None
            }
            Err(e) => {
                warn!("{}: authentication failed: {e}", self.host);
                None
            }
        }
    }

    /// Drops `stale` unless another caller has already replaced it.
    fn drop_connection(&self, stale: &Arc<Connection>) {
        let mut state = self.state.write();
        if let ConnectionState::Connected(current) = &*state {
            if Arc::ptr_eq(current, stale) {
                *state = ConnectionState::Disconnected;
            }
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cached_mac() {
            Some(mac) => write!(f, "{mac}@{}", self.host),
            None => write!(f, "{UNKNOWN_MAC}@{}", self.host),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("host", &self.host)
            .field("mac", &self.cached_mac())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Resolves `host` through the system resolver.  Literal addresses skip the
/// lookup.
fn resolve_host(host: &str) -> Vec<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return vec![ip];
    }
    match (host, 0).to_socket_addrs() {
        Ok(addrs) => {
            let mut ips: Vec<IpAddr> = Vec::new();
            for ip in addrs.map(|addr| addr.ip()) {
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }
            ips
        }
        Err(e) => {
            debug!("{host}: resolution failed: {e}");
            Vec::new()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
