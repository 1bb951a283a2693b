//! Agent runtime: one-shot actions and the continuous bridge loop.

use crate::config::AgentConfig;
use crate::store::Credentials;
use anyhow::{Context, Result};
use spalink_api::{ApiClient, ApiError};
use spalink_core::{Command, DeviceState};
use spalink_mqtt::BusGateway;

/// The bridge runtime, driving the cloud API and the bus.
///
/// Owns the device state snapshot and the session credentials; the bus
/// task only produces commands over a channel, so no locking is needed.
pub struct Agent {
    config: AgentConfig,
    client: ApiClient,
    credentials: Credentials,
    state: DeviceState,
}

impl Agent {
    /// Create the runtime from bootstrapped credentials.
    pub fn new(config: AgentConfig, client: ApiClient, credentials: Credentials) -> Self {
        Self {
            config,
            client,
            credentials,
            state: DeviceState::new(),
        }
    }

    /// One-shot: fetch telemetry and print it.
    ///
    /// # Errors
    ///
    /// Returns error only when the snapshot cannot be rendered; fetch
    /// failures are logged and skipped.
    pub async fn print_state(&mut self) -> Result<()> {
        if self.fetch().await {
            println!("{}", serde_json::to_string_pretty(&self.state)?);
        }
        Ok(())
    }

    /// One-shot: fetch telemetry and publish it to the bus.
    ///
    /// # Errors
    ///
    /// Returns error when the broker connection cannot be set up or torn
    /// down; fetch failures are logged and skipped.
    pub async fn publish_once(&mut self) -> Result<()> {
        let bus_config = self.config.bus_config();
        let (gateway, eventloop) = BusGateway::connect(&bus_config, self.config.topics())
            .context("cannot connect to broker")?;
        let _commands = gateway.start(eventloop);

        self.poll_and_publish(&gateway).await;

        gateway.disconnect().await?;
        Ok(())
    }

    /// One-shot: send a single named command to the device.
    ///
    /// # Errors
    ///
    /// Never fails; dispatch errors are logged.
    pub async fn send(&self, name: &str, value: &str) -> Result<()> {
        let command = Command::new(name, value);
        self.dispatch(&command).await;
        Ok(())
    }

    /// Continuous mode: subscribe for commands and poll periodically.
    ///
    /// Per-cycle API failures are logged and the loop keeps running; only
    /// a shutdown signal stops it.
    ///
    /// # Errors
    ///
    /// Returns error when the broker connection cannot be set up.
    pub async fn run_loop(&mut self) -> Result<()> {
        let bus_config = self.config.bus_config();
        let (gateway, eventloop) = BusGateway::connect(&bus_config, self.config.topics())
            .context("cannot connect to broker")?;
        let mut commands = gateway.start(eventloop);

        let interval = self.config.poll_interval();
        tracing::info!(interval_secs = interval.as_secs(), "starting bridge loop");

        // First tick fires immediately, giving subscribers an initial
        // snapshot at startup.
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_and_publish(&gateway).await;
                }
                Some(command) = commands.recv() => {
                    self.dispatch(&command).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        gateway.disconnect().await?;
        tracing::info!("bridge stopped");
        Ok(())
    }

    /// Fetch the latest snapshot, replacing the held state on success.
    ///
    /// Returns whether a fresh snapshot is held. Empty responses and API
    /// errors skip the cycle; the state keeps its previous value.
    async fn fetch(&mut self) -> bool {
        let fetched = self
            .client
            .fetch_telemetry(&self.credentials.device_id, &self.credentials.token)
            .await;

        match fetched {
            Ok(state) => {
                self.state = state;
                true
            }
            Err(ApiError::EmptyResponse { body }) => {
                tracing::warn!(body, "telemetry carried no attributes, skipping cycle");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "telemetry fetch failed, skipping cycle");
                false
            }
        }
    }

    async fn poll_and_publish(&mut self, gateway: &BusGateway) {
        if self.fetch().await {
            if let Err(e) = gateway.publish_state(&self.state).await {
                tracing::error!(error = %e, "telemetry publish failed");
            }
        }
    }

    /// Relay an inbound command to the cloud API.
    async fn dispatch(&self, command: &Command) {
        tracing::info!(command = %command.name, value = %command.value, "dispatching command");

        if let Err(e) = self
            .client
            .send_command(&self.credentials.device_id, &self.credentials.token, command)
            .await
        {
            tracing::error!(command = %command.name, error = %e, "command dispatch failed");
        }
    }
}
