//! Device telemetry snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Last-fetched snapshot of device telemetry.
///
/// Attribute values are heterogeneous (numeric, boolean, string). The
/// snapshot is replaced wholesale on each successful poll and never
/// partially merged; it stays empty until the first successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState {
    attrs: Map<String, Value>,
}

impl DeviceState {
    /// Empty snapshot, used until the first successful fetch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a raw attribute map.
    #[must_use]
    pub fn from_attrs(attrs: Map<String, Value>) -> Self {
        Self { attrs }
    }

    /// True until the first successful fetch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Look up a single attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// The raw attribute map.
    #[must_use]
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }
}
