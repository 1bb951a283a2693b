//! MQTT gateway for telemetry publication and command ingestion.

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use spalink_core::{Command, DeviceState, TopicScheme};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Configuration for the bus gateway.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Broker address (`tcp://host:port`, `mqtt://…`, or bare `host[:port]`)
    pub broker: String,
    /// Client id announced to the broker
    pub client_id: String,
    /// Optional broker username
    pub username: Option<String>,
    /// Optional broker password
    pub password: Option<String>,
    /// Keep-alive interval
    pub keep_alive: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            broker: "tcp://localhost:1883".to_string(),
            client_id: "spalink".to_string(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Gateway over one long-lived broker connection.
pub struct BusGateway {
    client: AsyncClient,
    topics: TopicScheme,
}

impl BusGateway {
    /// Connect to the broker.
    ///
    /// Returns the gateway plus the event loop that must be driven by
    /// [`BusGateway::start`].
    ///
    /// # Errors
    ///
    /// Returns error if the broker address cannot be parsed.
    pub fn connect(config: &BusConfig, topics: TopicScheme) -> Result<(Self, EventLoop), BusError> {
        let (host, port) = parse_broker_addr(&config.broker)?;

        let mut options = MqttOptions::new(&config.client_id, host, port);
        options.set_keep_alive(config.keep_alive);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(options, 100);

        Ok((Self { client, topics }, eventloop))
    }

    /// Drive the event loop on a background task.
    ///
    /// Subscribes to the command namespace once the broker accepts the
    /// connection and forwards inbound control messages over the returned
    /// channel. A refused connect is logged and left to the transport's
    /// own retry; it never takes the process down.
    pub fn start(&self, mut eventloop: EventLoop) -> mpsc::Receiver<Command> {
        let (tx, rx) = mpsc::channel(100);
        let client = self.client.clone();
        let topics = self.topics.clone();

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            let filter = topics.command_wildcard();
                            tracing::info!(topic = %filter, "connected to broker, subscribing");
                            if let Err(e) = client.subscribe(&filter, QoS::AtLeastOnce).await {
                                tracing::error!(error = %e, "subscribe failed");
                            }
                        } else {
                            tracing::error!(code = ?ack.code, "broker refused connection");
                        }
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        tracing::info!("command subscription acknowledged");
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let topic = publish.topic.clone();

                        let Some(name) = topics.parse_command(&topic) else {
                            tracing::debug!(topic, "ignoring message outside command namespace");
                            continue;
                        };
                        let payload = match std::str::from_utf8(&publish.payload) {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::warn!(topic, error = %e, "dropping non-UTF-8 payload");
                                continue;
                            }
                        };

                        let command = Command::new(name, payload);
                        tracing::debug!(topic, command = %command.name, "received command");

                        if tx.send(command).await.is_err() {
                            tracing::warn!("command receiver dropped, stopping bus task");
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        rx
    }

    /// Publish a telemetry snapshot to the info topic.
    ///
    /// # Errors
    ///
    /// Returns error if the snapshot cannot be encoded or queued.
    pub async fn publish_state(&self, state: &DeviceState) -> Result<(), BusError> {
        let topic = self.topics.telemetry();
        let payload = serde_json::to_string(state).map_err(|e| BusError::Encode(e.to_string()))?;

        tracing::debug!(topic, payload_len = payload.len(), "publishing telemetry");

        self.client
            .publish(&topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    /// Close the broker connection.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect cannot be queued.
    pub async fn disconnect(&self) -> Result<(), BusError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| BusError::Disconnect(e.to_string()))
    }
}

/// Parse a broker address into host and port.
fn parse_broker_addr(input: &str) -> Result<(String, u16), BusError> {
    if input.contains("://") {
        let url =
            Url::parse(input).map_err(|e| BusError::InvalidAddress(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(BusError::InvalidAddress(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| BusError::InvalidAddress(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BusError::InvalidAddress(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port
            .parse()
            .map_err(|_| BusError::InvalidAddress(format!("{input}: invalid port '{port}'")))?,
    };
    if parts.next().is_some() {
        return Err(BusError::InvalidAddress(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors for gateway operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    /// Invalid broker address
    #[error("invalid broker address: {0}")]
    InvalidAddress(String),
    /// Snapshot encoding failed
    #[error("encode error: {0}")]
    Encode(String),
    /// Publish failed
    #[error("publish error: {0}")]
    Publish(String),
    /// Disconnect failed
    #[error("disconnect error: {0}")]
    Disconnect(String),
}
