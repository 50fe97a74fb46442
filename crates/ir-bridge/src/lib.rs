//! ir-bridge library crate.
//!
//! Routes "transmit this code" requests arriving over HTTP, the LIRC line
//! protocol, or MQTT to a shared registry of IR/RF blaster devices.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! HTTP client   LIRC client (irsend)   MQTT broker
//!      ↕               ↕                   ↕
//! [ir-bridge]
//!   ├── domain/           MAC addresses, error kinds
//!   ├── application/      Registry, device handle, startup bootstrap
//!   └── infrastructure/
//!         ├── controller/ Device-control collaborator traits (+ mock, broadlink)
//!         ├── lirc/       LIRC-compatible TCP line protocol
//!         ├── http        axum router: POST /device/{id}
//!         ├── mqtt        rumqttc subscriber: {prefix}/{id}/transmit
//!         └── storage/    TOML configuration
//!      ↕
//! IR/RF blaster devices (UDP, owned by the controller backend)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain`, `ir-core` and the controller traits;
//!   it never touches sockets directly.
//! - `infrastructure` depends on all other layers plus `tokio`, `axum` and
//!   `rumqttc`.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: registry, device handle and bootstrap.
pub mod application;

/// Infrastructure layer: controller adapters, front ends and configuration.
pub mod infrastructure;

/// Command-line interface definition.
pub mod cli;

/// Front-end orchestration for the binary.
pub mod app;

/// Identity reported by the LIRC `VERSION` command.
pub const SERVER_IDENTITY: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
