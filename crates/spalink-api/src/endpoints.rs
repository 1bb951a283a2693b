//! Fully-qualified API URLs.

/// Read-only set of cloud API endpoints, derived from the base URL.
///
/// The telemetry and control URLs additionally embed the bound device id,
/// so they are rebuilt whenever the binding changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    /// Derive the endpoint set from a base API URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Account login URL.
    #[must_use]
    pub fn login(&self) -> String {
        format!("{}/login", self.base)
    }

    /// Device binding lookup URL.
    #[must_use]
    pub fn bindings(&self) -> String {
        format!("{}/bindings?limit=20&skip=0", self.base)
    }

    /// Latest telemetry URL for a bound device.
    #[must_use]
    pub fn latest_data(&self, device_id: &str) -> String {
        format!("{}/devdata/{device_id}/latest", self.base)
    }

    /// Control dispatch URL for a bound device.
    #[must_use]
    pub fn control(&self, device_id: &str) -> String {
        format!("{}/control/{device_id}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_from_base() {
        let endpoints = Endpoints::new("https://euapi.gizwits.com/app");
        assert_eq!(endpoints.login(), "https://euapi.gizwits.com/app/login");
        assert_eq!(
            endpoints.bindings(),
            "https://euapi.gizwits.com/app/bindings?limit=20&skip=0"
        );
        assert_eq!(
            endpoints.latest_data("abc123"),
            "https://euapi.gizwits.com/app/devdata/abc123/latest"
        );
        assert_eq!(
            endpoints.control("abc123"),
            "https://euapi.gizwits.com/app/control/abc123"
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let endpoints = Endpoints::new("https://euapi.gizwits.com/app/");
        assert_eq!(endpoints.login(), "https://euapi.gizwits.com/app/login");
    }
}
