//! Front-end orchestration.
//!
//! Binds every enabled listener before spawning anything, so a port that is
//! already taken stops startup instead of leaving a half-running bridge.
//! The HTTP and LIRC servers watch the shared `running` flag; the MQTT task
//! has no such check and is aborted once the others have stopped.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::registry::Registry;
use crate::infrastructure::http::serve_http;
use crate::infrastructure::lirc::serve_lirc;
use crate::infrastructure::mqtt::MqttFrontEnd;
use crate::infrastructure::storage::AppConfig;

const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Runs all enabled front ends until `running` is cleared.
///
/// # Errors
///
/// Returns an error if a bind address is invalid, a listener cannot be
/// bound, or the MQTT broker URL is invalid.
pub async fn run(
    config: &AppConfig,
    registry: Arc<Registry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let mut servers: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    if let Some(addr) = config.http.listen_addr()? {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;
        info!("HTTP server listening on {addr}");
        let (registry, running) = (Arc::clone(&registry), Arc::clone(&running));
        servers.push((
            "HTTP",
            tokio::spawn(async move {
                if let Err(e) = serve_http(listener, registry, running).await {
                    error!("{e:#}");
                }
            }),
        ));
    } else {
        info!("HTTP front end disabled");
    }

    if let Some(addr) = config.lirc.listen_addr()? {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind LIRC listener on {addr}"))?;
        info!("LIRC server listening on {addr}");
        let idle_timeout = config.lirc.idle_timeout();
        let (registry, running) = (Arc::clone(&registry), Arc::clone(&running));
        servers.push((
            "LIRC",
            tokio::spawn(serve_lirc(listener, registry, idle_timeout, running)),
        ));
    } else {
        info!("LIRC front end disabled");
    }

    let mqtt = if config.mqtt.is_enabled() {
        let front_end = MqttFrontEnd::new(&config.mqtt).context("invalid MQTT configuration")?;
        Some(tokio::spawn(front_end.run(Arc::clone(&registry))))
    } else {
        info!("MQTT front end disabled");
        None
    };

    if servers.is_empty() && mqtt.is_none() {
        warn!("no front end is enabled; nothing will reach the devices");
    }

    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }

    if let Some(task) = mqtt {
        task.abort();
        info!("MQTT client stopped");
    }
    for (name, task) in servers {
        if let Err(e) = task.await {
            error!("{name} server task failed: {e}");
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
