//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML file named on the command line and
//! fills every missing section or field with its default, so an absent file
//! and an empty file behave the same.

pub mod config;

pub use config::{load_config, parse_config, AppConfig, ConfigError};
