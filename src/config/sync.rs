//! Sync cycle configuration

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use super::error::ValidationError;
use crate::domain::PortSet;

/// Settings for the reconciliation loop
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Seconds to wait between sync cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Comma-separated ports that must never be forwarded (e.g. "22,443")
    #[serde(default)]
    pub excluded_ports: String,

    /// Per-request timeout for both remote APIs, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl SyncConfig {
    /// Get the sync interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the excluded-port list into a canonical set.
    ///
    /// Malformed entries are dropped with a warning rather than failing
    /// startup; an empty list is valid.
    pub fn excluded_ports(&self) -> PortSet {
        let mut ports = PortSet::new();
        for raw in self.excluded_ports.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<u32>() {
                Ok(port) => {
                    ports.insert(port);
                }
                Err(_) => warn!(entry = raw, "ignoring invalid excluded-port entry"),
            }
        }
        ports
    }

    /// Validate sync configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidInterval);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            excluded_ports: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.excluded_ports().is_empty());
    }

    #[test]
    fn test_excluded_ports_parses_comma_list() {
        let config = SyncConfig {
            excluded_ports: "22, 80,443".to_string(),
            ..Default::default()
        };
        assert_eq!(config.excluded_ports(), PortSet::from([22, 80, 443]));
    }

    #[test]
    fn test_excluded_ports_drops_invalid_entries() {
        let config = SyncConfig {
            excluded_ports: "22,ssh,,-1,443".to_string(),
            ..Default::default()
        };
        assert_eq!(config.excluded_ports(), PortSet::from([22, 443]));
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let config = SyncConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidInterval)
        ));
    }
}
