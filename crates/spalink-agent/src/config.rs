//! Agent configuration, loaded from the TOML config file.

use crate::store::Credentials;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use spalink_core::TopicScheme;
use spalink_mqtt::BusConfig;
use std::path::Path;
use std::time::Duration;

/// Minimum poll interval; the cloud API rate-limits aggressive polling.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(600);

/// Top-level agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Cloud API identity and account credentials
    pub spa: SpaConfig,
    /// Broker connection settings
    pub mqtt: MqttConfig,
}

/// `[spa]` section: cloud API identity.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaConfig {
    /// Base URL of the vendor cloud API
    pub api_url: String,
    /// Application id issued by the vendor
    pub application_id: String,
    /// Account email, required when no session is cached
    #[serde(default)]
    pub email: String,
    /// Account password, required when no session is cached
    #[serde(default)]
    pub password: String,
    /// Bound device id, filled in by a binding lookup
    #[serde(default)]
    pub device_id: String,
    /// Cached session token, filled in by a login
    #[serde(default)]
    pub token: String,
    /// Account uid reported by the last login
    #[serde(default)]
    pub uid: String,
}

/// `[mqtt]` section: broker connection.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker address
    pub host: String,
    /// Optional broker username
    #[serde(default)]
    pub username: Option<String>,
    /// Optional broker password
    #[serde(default)]
    pub password: Option<String>,
    /// Client id announced to the broker
    pub client_id: String,
    /// Root topic for outbound telemetry
    pub root_topic: String,
    /// Namespace for inbound control messages
    pub command_topic: String,
    /// Poll interval in seconds, clamped to [`MIN_POLL_INTERVAL`]
    pub poll_interval_secs: u64,
}

impl AgentConfig {
    /// Load and validate the config file.
    ///
    /// # Errors
    ///
    /// Returns error when the file is missing, malformed, or a required
    /// key is absent or empty.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("spa.api_url", &self.spa.api_url),
            ("spa.application_id", &self.spa.application_id),
            ("mqtt.host", &self.mqtt.host),
            ("mqtt.client_id", &self.mqtt.client_id),
            ("mqtt.root_topic", &self.mqtt.root_topic),
            ("mqtt.command_topic", &self.mqtt.command_topic),
        ];
        for (key, value) in required {
            if value.is_empty() {
                bail!("config key {key} must not be empty");
            }
        }
        Ok(())
    }

    /// Poll interval, clamped to the API-friendly minimum.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.mqtt.poll_interval_secs).max(MIN_POLL_INTERVAL)
    }

    /// Credentials as loaded from the `[spa]` section.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            application_id: self.spa.application_id.clone(),
            device_id: self.spa.device_id.clone(),
            email: self.spa.email.clone(),
            password: self.spa.password.clone(),
            token: self.spa.token.clone(),
            uid: self.spa.uid.clone(),
        }
    }

    /// Topic scheme from the `[mqtt]` section.
    #[must_use]
    pub fn topics(&self) -> TopicScheme {
        TopicScheme::new(&self.mqtt.root_topic, &self.mqtt.command_topic)
    }

    /// Bus gateway configuration from the `[mqtt]` section.
    ///
    /// Empty username/password values mean an unauthenticated broker.
    #[must_use]
    pub fn bus_config(&self) -> BusConfig {
        let non_empty = |value: &Option<String>| value.clone().filter(|s| !s.is_empty());
        BusConfig {
            broker: self.mqtt.host.clone(),
            client_id: self.mqtt.client_id.clone(),
            username: non_empty(&self.mqtt.username),
            password: non_empty(&self.mqtt.password),
            ..BusConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[spa]
api_url = "https://euapi.gizwits.com/app"
application_id = "app-id"
email = "spa@example.com"
password = "secret"
device_id = "D"
token = "T"
uid = "U"

[mqtt]
host = "tcp://localhost:1883"
username = "mqtt-user"
password = "mqtt-pass"
client_id = "spalink-1"
root_topic = "layzspa"
command_topic = "layzspa/cmd"
poll_interval_secs = 900
"#;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn full_config_parses() {
        let file = write_config(FULL);
        let config = AgentConfig::load(file.path()).unwrap();

        assert_eq!(config.spa.device_id, "D");
        assert_eq!(config.mqtt.client_id, "spalink-1");
        assert_eq!(config.poll_interval(), Duration::from_secs(900));
        assert_eq!(config.topics().telemetry(), "layzspa/info");
        assert_eq!(config.bus_config().broker, "tcp://localhost:1883");
        assert_eq!(config.bus_config().username.as_deref(), Some("mqtt-user"));
    }

    #[test]
    fn empty_broker_auth_means_none() {
        let anon = FULL.replace("username = \"mqtt-user\"", "username = \"\"");
        let file = write_config(&anon);
        let config = AgentConfig::load(file.path()).unwrap();
        assert!(config.bus_config().username.is_none());
    }

    #[test]
    fn optional_identity_keys_default_empty() {
        let minimal = r#"
[spa]
api_url = "https://euapi.gizwits.com/app"
application_id = "app-id"

[mqtt]
host = "localhost"
client_id = "spalink-1"
root_topic = "layzspa"
command_topic = "layzspa/cmd"
poll_interval_secs = 600
"#;
        let file = write_config(minimal);
        let config = AgentConfig::load(file.path()).unwrap();

        assert!(config.spa.email.is_empty());
        assert!(config.spa.token.is_empty());
        assert!(config.mqtt.username.is_none());
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let broken = r#"
[spa]
api_url = "https://euapi.gizwits.com/app"

[mqtt]
host = "localhost"
client_id = "spalink-1"
root_topic = "layzspa"
command_topic = "layzspa/cmd"
poll_interval_secs = 600
"#;
        let file = write_config(broken);
        let err = AgentConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("application_id"));
    }

    #[test]
    fn empty_required_key_is_an_error() {
        let broken = FULL.replace("client_id = \"spalink-1\"", "client_id = \"\"");
        let file = write_config(&broken);
        let err = AgentConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("mqtt.client_id"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AgentConfig::load(Path::new("/nonexistent/spalink.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("cannot read config file"));
    }

    #[test]
    fn short_poll_interval_is_clamped() {
        let short = FULL.replace("poll_interval_secs = 900", "poll_interval_secs = 60");
        let file = write_config(&short);
        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(600));
    }
}
