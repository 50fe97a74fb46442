//! Startup: turns a loaded configuration into a populated registry.
//!
//! Order matters:
//!
//! 1. `[commands]` first, so devices can use them as soon as they exist;
//! 2. `[devices]` in file order (the first becomes `"default"`);
//! 3. discovery, which only adds devices whose host is not yet an alias.
//!
//! Discovery blocks for its whole duration, so async callers run this on the
//! blocking pool.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::registry::Registry;
use crate::domain::BridgeError;
use crate::infrastructure::controller::DeviceController;
use crate::infrastructure::storage::AppConfig;

/// A configured command could not be registered.
#[derive(Debug, Error)]
#[error("invalid command {name:?} in configuration: {source}")]
pub struct BootstrapError {
    pub name: String,
    #[source]
    pub source: BridgeError,
}

/// Builds the registry described by `config`.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first `[commands]` entry whose name or
/// payload is invalid.  Unreachable devices and failed discovery are logged
/// but not fatal.
pub fn build_registry(
    config: &AppConfig,
    controller: Arc<dyn DeviceController>,
) -> Result<Registry, BootstrapError> {
    let registry = Registry::new(controller);

    for (name, payload) in &config.commands {
        registry
            .set_command(name, payload.as_bytes())
            .map_err(|source| BootstrapError {
                name: name.clone(),
                source,
            })?;
        info!("registered command {name}");
    }

    for (alias, host) in &config.devices {
        registry.add_device(host, Some(alias));
    }

    let timeout = config.discovery.duration();
    if timeout.is_none() {
        info!("discovery disabled");
    } else if !registry.discover(timeout) {
        info!("no devices known yet; unknown ids will be tried on demand");
    }

    Ok(registry)
}
