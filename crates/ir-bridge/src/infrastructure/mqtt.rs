//! MQTT front end.
//!
//! Subscribes to `{prefix}/#` and transmits the payload of every message
//! published on `{prefix}/{device}/transmit`.  Nothing is published back; a
//! request that cannot be honoured is logged at warn level and dropped.
//!
//! # Broker URL
//!
//! ```text
//! mqtt://[user:pass@]host[:port]     plain TCP, default port 1883
//! mqtts://[user:pass@]host[:port]    TLS (rustls), default port 8883
//! host[:port]                        same as mqtt://
//! ```
//!
//! The subscription is renewed after every `CONNACK`, so a broker restart
//! does not silently stop the bridge from receiving commands.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::registry::Registry;
use crate::infrastructure::storage::config::MqttConfig;

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_TLS_PORT: u16 = 8883;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Error type for MQTT setup.  All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("invalid broker URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported broker URL scheme {0:?} (expected mqtt or mqtts)")]
    UnsupportedScheme(String),

    #[error("broker URL has no host")]
    MissingHost,
}

/// Connection settings extracted from a broker URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub credentials: Option<(String, String)>,
}

impl BrokerAddress {
    /// Parses `mqtt://` and `mqtts://` URLs.  A URL without a scheme is
    /// treated as `mqtt://`.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError`] for unparsable URLs, other schemes, or a missing
    /// host.
    pub fn parse(text: &str) -> Result<Self, MqttError> {
        let text = text.trim();
        let url = if text.contains("://") {
            Url::parse(text)?
        } else {
            Url::parse(&format!("mqtt://{text}"))?
        };

        let (tls, default_port) = match url.scheme() {
            "mqtt" => (false, DEFAULT_PORT),
            "mqtts" => (true, DEFAULT_TLS_PORT),
            other => return Err(MqttError::UnsupportedScheme(other.to_string())),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(MqttError::MissingHost)?
            .to_string();

        let credentials = match (url.username(), url.password()) {
            ("", None) => None,
            (user, password) => Some((user.to_string(), password.unwrap_or_default().to_string())),
        };
        if url.query_pairs().any(|(key, _)| key == "insecure") {
            warn!("MQTT: 'insecure' is not supported; the broker certificate is always verified");
        }

        Ok(Self {
            host,
            port: url.port().unwrap_or(default_port),
            tls,
            credentials,
        })
    }
}

/// What became of one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Sent,
    /// Not a `{prefix}/{device}/transmit` topic.
    Ignored,
    MissingDevice,
    DeviceNotFound,
    EmptyPayload,
    InvalidCode,
    /// The device was found but did not take the packet.
    NotSent,
}

/// Extracts the device id from `{prefix}/{device}/transmit`.
///
/// `Some("")` means the device segment is present but empty.
fn transmit_target<'a>(prefix: &str, topic: &'a str) -> Option<&'a str> {
    let rest = topic.strip_prefix(prefix)?.strip_prefix('/')?;
    let device = rest.strip_suffix("transmit")?.strip_suffix('/')?;
    (!device.contains('/')).then_some(device)
}

/// Handles one message.  Blocks while transmitting.
pub fn handle_message(registry: &Registry, prefix: &str, topic: &str, payload: &[u8]) -> MessageOutcome {
    let Some(id) = transmit_target(prefix, topic) else {
        debug!("MQTT {topic}: ignored");
        return MessageOutcome::Ignored;
    };
    if id.is_empty() {
        warn!("MQTT {topic}: device missing");
        return MessageOutcome::MissingDevice;
    }

    let device = match registry.resolve(id) {
        Ok(device) => device,
        Err(e) => {
            warn!("MQTT {topic}: {e}");
            return MessageOutcome::DeviceNotFound;
        }
    };
    if payload.is_empty() {
        warn!("MQTT {topic}: no payload");
        return MessageOutcome::EmptyPayload;
    }

    match device.transmit(payload, None) {
        Ok(true) => {
            debug!("MQTT {topic}: sent");
            MessageOutcome::Sent
        }
        Ok(false) => {
            warn!("MQTT {topic}: {device} did not accept the code");
            MessageOutcome::NotSent
        }
        Err(e) => {
            warn!("MQTT {topic}: invalid payload: {e}");
            MessageOutcome::InvalidCode
        }
    }
}

/// A configured, not yet running MQTT subscriber.
pub struct MqttFrontEnd {
    client: AsyncClient,
    eventloop: EventLoop,
    prefix: String,
    broker: BrokerAddress,
}

impl MqttFrontEnd {
    /// Validates the broker URL and prepares the client.  No network I/O
    /// happens until [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns [`MqttError`] for an invalid broker URL.
    pub fn new(config: &MqttConfig) -> Result<Self, MqttError> {
        let broker = BrokerAddress::parse(&config.broker_url)?;

        let mut options = MqttOptions::new(&config.client_id, &broker.host, broker.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let Some((user, password)) = &broker.credentials {
            options.set_credentials(user, password);
        }
        if broker.tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, eventloop) = AsyncClient::new(options, 16);
        Ok(Self {
            client,
            eventloop,
            prefix: config.prefix.trim_end_matches('/').to_string(),
            broker,
        })
    }

    /// Polls the broker connection forever.  Stop it by aborting its task.
    pub async fn run(mut self, registry: Arc<Registry>) {
        let filter = format!("{}/#", self.prefix);
        info!(
            "MQTT client connecting to {}:{} (prefix {})",
            self.broker.host, self.broker.port, self.prefix
        );

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("MQTT connected to {}", self.broker.host);
                    if let Err(e) = self.client.try_subscribe(filter.as_str(), QoS::AtMostOnce) {
                        warn!("MQTT subscribe to {filter} failed: {e}");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let registry = Arc::clone(&registry);
                    let prefix = self.prefix.clone();
                    let handled = tokio::task::spawn_blocking(move || {
                        handle_message(&registry, &prefix, &publish.topic, &publish.payload)
                    })
                    .await;
                    if let Err(e) = handled {
                        warn!("MQTT message task failed: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT connection to {} lost: {e}", self.broker.host);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
