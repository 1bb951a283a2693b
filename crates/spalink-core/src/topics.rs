//! MQTT topic scheme for the bridge.
//!
//! Telemetry snapshots are published to `<root_topic>/info`; control
//! messages arrive on `<command_topic>/<name>` where the trailing segment
//! is the attribute name.

use serde::{Deserialize, Serialize};

/// Topic suffix for outbound telemetry.
pub const TELEMETRY_SUFFIX: &str = "info";

/// Topic layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicScheme {
    /// Root topic for outbound telemetry
    pub root_topic: String,
    /// Namespace for inbound control messages
    pub command_topic: String,
}

impl TopicScheme {
    /// Create a new topic scheme.
    #[must_use]
    pub fn new(root_topic: impl Into<String>, command_topic: impl Into<String>) -> Self {
        Self {
            root_topic: root_topic.into(),
            command_topic: command_topic.into(),
        }
    }

    /// Topic telemetry snapshots are published to.
    #[must_use]
    pub fn telemetry(&self) -> String {
        format!("{}/{TELEMETRY_SUFFIX}", self.root_topic)
    }

    /// Wildcard subscription covering every command under the prefix.
    #[must_use]
    pub fn command_wildcard(&self) -> String {
        format!("{}/#", self.command_topic)
    }

    /// Extract the command name from an inbound topic.
    ///
    /// Returns `None` for topics outside the command namespace.
    #[must_use]
    pub fn parse_command(&self, topic: &str) -> Option<String> {
        let rest = topic
            .strip_prefix(self.command_topic.as_str())?
            .strip_prefix('/')?;

        let name = rest.rsplit('/').next()?;
        if name.is_empty() {
            return None;
        }
        Some(name.to_string())
    }
}
