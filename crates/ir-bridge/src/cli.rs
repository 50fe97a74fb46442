//! Command-line interface.
//!
//! ```text
//! ir-bridge [OPTIONS] [CONFIG]
//!
//! Arguments:
//!   [CONFIG]       TOML configuration file [env: IR_BRIDGE_CONFIG]
//!
//! Options:
//!   -d, --debug    Log at debug level (RUST_LOG still wins when set)
//! ```
//!
//! Everything else lives in the configuration file.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// IR/RF blaster bridge.
///
/// Exposes Broadlink-style blasters over HTTP, the LIRC line protocol and
/// MQTT.
#[derive(Debug, Parser)]
#[command(
    name = "ir-bridge",
    about = "Bridge IR/RF blasters to HTTP, LIRC and MQTT clients",
    version
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// Without one, built-in defaults apply: HTTP on 8780, LIRC on 8765,
    /// MQTT off, five seconds of discovery.
    #[arg(env = "IR_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Picks the log filter: `RUST_LOG`, then `--debug`, then the level from
    /// the configuration file.
    pub fn log_filter(&self, config_level: &str) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| self.fallback_filter(config_level))
    }

    fn fallback_filter(&self, config_level: &str) -> EnvFilter {
        if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(config_level).unwrap_or_else(|_| EnvFilter::new("info"))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
