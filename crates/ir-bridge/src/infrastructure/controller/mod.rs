//! Device-control collaborator: discovery, handshake and raw packet delivery.
//!
//! The bridge never speaks the device wire protocol itself.  Locating a
//! blaster on the LAN, negotiating its session key and encrypting each packet
//! all happen behind the two traits in this module:
//!
//! - [`DeviceController`] finds devices, either by broadcasting for a while
//!   ([`discover`](DeviceController::discover)) or by contacting one host
//!   directly ([`handshake`](DeviceController::handshake)).
//! - [`DeviceSession`] is one live, bound device: it can authenticate and
//!   send canonical packets.
//!
//! # Testability
//!
//! The production implementation lives in [`broadlink`] (behind the
//! `broadlink` cargo feature).  Tests use [`mock::MockController`], which
//! records every packet it is asked to send.
//!
//! All methods are blocking.  Async callers run them on the blocking pool.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

pub mod mock;

#[cfg(feature = "broadlink")]
pub mod broadlink;

/// Error type for device-control operations.
///
/// The application layer never propagates these: every variant is logged and
/// downgraded to a failed attempt.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The host name did not resolve or the device did not answer.
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// The device answered too slowly.
    #[error("device timed out")]
    Timeout,

    /// The device refused the request (bad key, unsupported type, ...).
    #[error("device rejected request: {0}")]
    Rejected(String),

    /// A socket error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bound session with one physical device.
pub trait DeviceSession: Send + Sync {
    /// Negotiates the session key.  `Ok(false)` means the device answered
    /// but refused the credentials.
    fn authenticate(&self) -> Result<bool, ControllerError>;

    /// Delivers one canonical packet (the backend adds its own transport
    /// header and encryption).
    fn send_packet(&self, packet: &[u8]) -> Result<(), ControllerError>;

    /// Hardware address in display order (most significant octet first).
    fn mac_address(&self) -> [u8; 6];

    /// Address the session is bound to.
    fn host_address(&self) -> IpAddr;
}

/// Locates devices and opens sessions with them.
pub trait DeviceController: Send + Sync {
    /// Broadcasts for devices for up to `timeout` and returns a session for
    /// each one that answered.
    fn discover(&self, timeout: Duration) -> Result<Vec<Box<dyn DeviceSession>>, ControllerError>;

    /// Contacts `host` (address or host name) directly.
    ///
    /// Returns `Ok(None)` when the host answered but is not a supported
    /// device.
    fn handshake(&self, host: &str) -> Result<Option<Box<dyn DeviceSession>>, ControllerError>;
}
