//! Credential persistence.
//!
//! The config file doubles as the durable store for session material, so
//! a refreshed token survives process restarts. Saving rewrites only the
//! identity keys under `[spa]`; every other key and section in the
//! document is preserved.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// API identity and account credentials.
///
/// At least one complete pair must be present for the bridge to operate:
/// either (`device_id`, `token`) or (`email`, `password`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Application id issued by the vendor
    pub application_id: String,
    /// Bound device id
    pub device_id: String,
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
    /// Cached session token
    pub token: String,
    /// Account uid reported by the last login
    pub uid: String,
}

impl Credentials {
    /// True when a cached session (device id + token) is usable as-is.
    #[must_use]
    pub fn has_session(&self) -> bool {
        !self.device_id.is_empty() && !self.token.is_empty()
    }

    /// True when account credentials allow driving a fresh login.
    #[must_use]
    pub fn has_account(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }
}

/// Durable store for credentials, backed by the TOML config file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store over the given config file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The config file this store writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write refreshed session material back to the `[spa]` section.
    ///
    /// Unrelated keys and sections are left untouched; re-saving the same
    /// credentials is a no-op in effect.
    ///
    /// # Errors
    ///
    /// Returns error when the file cannot be read, parsed, or written.
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read config file {}", self.path.display()))?;
        let mut doc: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", self.path.display()))?;

        let spa = doc
            .get_mut("spa")
            .and_then(toml::Value::as_table_mut)
            .context("config file has no [spa] section")?;
        spa.insert(
            "device_id".to_string(),
            toml::Value::String(credentials.device_id.clone()),
        );
        spa.insert(
            "token".to_string(),
            toml::Value::String(credentials.token.clone()),
        );
        spa.insert(
            "uid".to_string(),
            toml::Value::String(credentials.uid.clone()),
        );

        let rendered = toml::to_string_pretty(&doc).context("cannot serialize config")?;
        std::fs::write(&self.path, rendered)
            .with_context(|| format!("cannot write config file {}", self.path.display()))?;

        tracing::info!(path = %self.path.display(), "credentials persisted");
        Ok(())
    }
}
