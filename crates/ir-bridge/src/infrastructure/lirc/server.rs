//! LIRC TCP server: accept loop and per-client task management.
//!
//! The caller binds the listener.  The accept loop never blocks on a client: every accepted connection is
//! handed to its own Tokio task.  Shutdown is signalled through a shared
//! `AtomicBool` that the loop checks every 200 ms.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::session::serve_connection;
use crate::application::registry::Registry;

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Serves LIRC clients on an already bound listener until `running` is
/// cleared.
pub async fn serve_lirc(
    listener: TcpListener,
    registry: Arc<Registry>,
    idle_timeout: Option<Duration>,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("LIRC server stopping");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                debug!("LIRC client connected: {peer}");
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    match serve_connection(stream, registry, idle_timeout).await {
                        Ok(()) => debug!("LIRC client {peer} disconnected"),
                        Err(e) => warn!("LIRC client {peer} closed with error: {e}"),
                    }
                });
            }
            Ok(Err(e)) => error!("LIRC accept error: {e}"),
            Err(_) => {
                // No connection in the last poll interval.
            }
        }
    }
}
