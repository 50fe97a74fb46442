//! ir-bridge entry point.
//!
//! # What happens at startup
//!
//! 1. The command line is parsed (`ir-bridge [-d] [CONFIG]`).
//! 2. The configuration file is loaded; a missing or malformed file is fatal.
//! 3. Logging is initialised.  `RUST_LOG` wins, then `--debug`, then
//!    `[logging] level` from the file.
//! 4. The registry is built on the blocking pool: commands, configured
//!    devices, then network discovery.
//! 5. A Ctrl+C handler clears the shared `running` flag.
//! 6. The HTTP, LIRC and MQTT front ends run until that flag is cleared.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info};

use ir_bridge::app;
use ir_bridge::application::bootstrap::build_registry;
use ir_bridge::cli::Cli;
use ir_bridge::infrastructure::controller::broadlink::BroadlinkController;
use ir_bridge::infrastructure::storage::load_config;
use ir_bridge::SERVER_IDENTITY;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter(&config.logging.level))
        .init();

    info!("{SERVER_IDENTITY} starting");

    let registry = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || build_registry(&config, Arc::new(BroadlinkController::new())))
            .await
            .context("registry setup task failed")??
    };
    let commands = registry.commands();
    for (name, packet) in &commands {
        debug!(
            "command {name}: {:?}, {} bytes, repeat {}",
            packet.packet_type(),
            packet.len(),
            packet.repeat()
        );
    }
    info!(
        "{} device(s), {} command(s) registered",
        registry.devices().len(),
        commands.len()
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    app::run(&config, Arc::new(registry), running).await?;

    info!("{SERVER_IDENTITY} stopped");
    Ok(())
}
