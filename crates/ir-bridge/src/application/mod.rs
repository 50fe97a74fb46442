//! Application layer for ir-bridge.
//!
//! # What is the "application" layer? (for beginners)
//!
//! It sits between the pure domain types and the I/O adapters.  Everything
//! here talks to devices only through the
//! [`DeviceController`](crate::infrastructure::controller::DeviceController)
//! trait, so the whole layer runs against the mock controller in tests.
//!
//! # Sub-modules
//!
//! - **`commands`**  – The shared table of named commands (name → packet).
//!
//! - **`device`**    – One blaster: lazy connection, MAC/address cache, and
//!   the transmit pipeline (classify → substitute → decode → send).
//!
//! - **`registry`**  – Every known device, reachable by alias, MAC, host or
//!   address.  Unknown identifiers are tried on demand.
//!
//! - **`bootstrap`** – Builds a registry from the loaded configuration.

pub mod bootstrap;
pub mod commands;
pub mod device;
pub mod registry;

pub use commands::CommandTable;
pub use device::Device;
pub use registry::Registry;
