//! Infrastructure layer for ir-bridge.
//!
//! # Responsibilities
//!
//! - Talking to physical devices through a [`controller::DeviceController`]
//! - Accepting LIRC line-protocol clients over TCP
//! - Serving the HTTP transmit endpoint
//! - Subscribing to the MQTT transmit topics
//! - Loading the TOML configuration file
//!
//! # What does NOT belong here?
//!
//! - Device lookup rules and command substitution (application layer)
//! - Code transcoding (`ir-core`)

pub mod controller;
pub mod http;
pub mod lirc;
pub mod mqtt;
pub mod storage;
