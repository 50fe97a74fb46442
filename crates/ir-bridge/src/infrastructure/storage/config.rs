//! TOML configuration for the bridge.
//!
//! # Example
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [commands]              # name = payload (Pronto, base64, "N*<code>")
//! power = "JgAEABAgECANBQAA"
//!
//! [devices]               # alias = host
//! living-room = "192.168.1.20"
//!
//! [discovery]
//! timeout = 5             # seconds; <= 0 disables
//!
//! [http]
//! port = 8780             # 0 disables
//! bind_address = "0.0.0.0"
//!
//! [lirc]
//! port = 8765             # 0 disables
//! bind_address = "0.0.0.0"
//! idle_timeout = 0        # seconds; 0 disables
//!
//! [mqtt]
//! broker_url = ""         # empty disables
//! prefix = "ir-bridge"
//! client_id = "ir-bridge"
//! ```
//!
//! # Serde default values
//!
//! Every section is optional and every field inside a section falls back to
//! a `#[serde(default = "...")]` helper, so a config file only needs the
//! values it changes.
//!
//! `[commands]` and `[devices]` are read into `IndexMap`s so entries are
//! registered in the order they are written.  The first device in the file
//! becomes `"default"` unless discovery found one earlier.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `bind_address` is not an IP address.
    #[error("invalid bind address {value:?}: {source}")]
    InvalidBindAddress {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Named commands: name → payload.
    #[serde(default)]
    pub commands: IndexMap<String, String>,
    /// Manually configured devices: alias → host.
    #[serde(default)]
    pub devices: IndexMap<String, String>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub lirc: LircConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when neither `RUST_LOG` nor `--debug` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Broadcast duration in seconds.  Zero or negative disables discovery.
    #[serde(default = "default_discovery_timeout")]
    pub timeout: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HttpConfig {
    /// TCP port; 0 disables the HTTP front end.
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LircConfig {
    /// TCP port; 0 disables the LIRC front end.
    #[serde(default = "default_lirc_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Seconds a client may stay silent before being disconnected; 0 waits
    /// forever.
    #[serde(default)]
    pub idle_timeout: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MqttConfig {
    /// `mqtt://[user:pass@]host[:port]` or `mqtts://...`; empty disables.
    #[serde(default)]
    pub broker_url: String,
    /// Topic prefix; messages arrive on `{prefix}/{device}/transmit`.
    #[serde(default = "default_mqtt_prefix")]
    pub prefix: String,
    #[serde(default = "default_mqtt_client_id")]
    pub client_id: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_timeout() -> i64 {
    5
}
fn default_http_port() -> u16 {
    8780
}
fn default_lirc_port() -> u16 {
    8765
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_mqtt_prefix() -> String {
    "ir-bridge".to_string()
}
fn default_mqtt_client_id() -> String {
    "ir-bridge".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout: default_discovery_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for LircConfig {
    fn default() -> Self {
        Self {
            port: default_lirc_port(),
            bind_address: default_bind_address(),
            idle_timeout: 0,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: String::new(),
            prefix: default_mqtt_prefix(),
            client_id: default_mqtt_client_id(),
        }
    }
}

// ── Derived settings ──────────────────────────────────────────────────────────

impl DiscoveryConfig {
    /// `None` when discovery is disabled.
    pub fn duration(&self) -> Option<Duration> {
        u64::try_from(self.timeout)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

impl HttpConfig {
    /// Listen address, or `None` when the front end is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not an
    /// IP address.
    pub fn listen_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        listen_addr(&self.bind_address, self.port)
    }
}

impl LircConfig {
    /// Listen address, or `None` when the front end is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not an
    /// IP address.
    pub fn listen_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        listen_addr(&self.bind_address, self.port)
    }

    /// `None` when idle clients are never disconnected.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }
}

impl MqttConfig {
    pub fn is_enabled(&self) -> bool {
        !self.broker_url.trim().is_empty()
    }
}

fn listen_addr(bind_address: &str, port: u16) -> Result<Option<SocketAddr>, ConfigError> {
    if port == 0 {
        return Ok(None);
    }
    let ip: IpAddr = bind_address
        .parse()
        .map_err(|source| ConfigError::InvalidBindAddress {
            value: bind_address.to_string(),
            source,
        })?;
    Ok(Some(SocketAddr::new(ip, port)))
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses configuration text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has
/// the wrong type.
pub fn parse_config(text: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Loads the configuration from `path`, or returns the defaults when no path
/// was given.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist) and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
