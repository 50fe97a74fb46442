//! HTTP front end.
//!
//! One route:
//!
//! ```text
//! POST /device/{id}        body = raw code (Pronto, base64, binary, or a command name)
//!
//! 204 No Content           sent
//! 404 Not Found            unknown route or device
//! 400 Bad Request          empty body, undecodable code, or the device did not take it
//! ```
//!
//! Built on `axum`.  Device lookups and transmissions block on the network,
//! so the handler moves them onto the blocking pool.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::application::registry::Registry;
use crate::domain::BridgeError;
use crate::SERVER_IDENTITY;

/// Builds the router.  Exposed so tests can drive it without a socket.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/device/:id", post(transmit))
        .with_state(registry)
}

async fn transmit(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let status = match tokio::task::spawn_blocking(move || transmit_blocking(&registry, &id, &body)).await {
        Ok(status) => status,
        Err(e) => {
            error!("HTTP: transmit task failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, [(header::SERVER, SERVER_IDENTITY)])
}

fn transmit_blocking(registry: &Registry, id: &str, body: &[u8]) -> StatusCode {
    match registry.transmit(id, body, None) {
        Ok(()) => {
            debug!("HTTP: POST /device/{id}: sent");
            StatusCode::NO_CONTENT
        }
        Err(e @ BridgeError::NotFound(_)) => {
            warn!("HTTP: {e}");
            StatusCode::NOT_FOUND
        }
        Err(e) if e.is_bad_payload() => {
            warn!("HTTP: POST /device/{id}: rejected payload: {e}");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            warn!("HTTP: POST /device/{id}: not sent: {e}");
            StatusCode::BAD_REQUEST
        }
    }
}

/// Serves HTTP on an already bound listener, shutting down gracefully once
/// `running` is cleared.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve_http(
    listener: TcpListener,
    registry: Arc<Registry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move {
            while running.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            info!("HTTP server stopping");
        })
        .await
        .context("HTTP server failed")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
