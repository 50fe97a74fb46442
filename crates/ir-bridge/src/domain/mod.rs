//! Domain layer for ir-bridge.
//!
//! Pure types with no I/O: MAC address normalisation and the error kinds the
//! front ends translate into their own failure representations.
//!
//! # What does NOT belong here?
//!
//! - Sockets, async tasks, or device sessions (infrastructure)
//! - Registry bookkeeping (application)

pub mod error;
pub mod mac;

pub use error::BridgeError;
pub use mac::{MacAddress, UNKNOWN_MAC};
