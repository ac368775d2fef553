//! OPNsense firewall configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// Connection settings for the OPNsense firewall API
#[derive(Debug, Clone, Deserialize)]
pub struct FirewallConfig {
    /// Firewall base URL (e.g. https://fw.example.com)
    pub base_url: String,

    /// API key, the username half of the basic-auth pair
    pub api_key: String,

    /// API secret, the password half of the basic-auth pair
    pub api_secret: Secret<String>,

    /// Verify the firewall's TLS certificate
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Name of the port alias to manage
    #[serde(default = "default_alias_name")]
    pub alias_name: String,
}

impl FirewallConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Exposes the API secret (for building requests)
    pub fn api_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }

    /// Validate firewall configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PORT_MAPPER__FIREWALL__BASE_URL",
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("firewall.base_url"));
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PORT_MAPPER__FIREWALL__API_KEY",
            ));
        }
        if self.api_secret().is_empty() {
            return Err(ValidationError::MissingRequired(
                "PORT_MAPPER__FIREWALL__API_SECRET",
            ));
        }
        if self.alias_name.is_empty() {
            return Err(ValidationError::EmptyAliasName);
        }
        Ok(())
    }
}

fn default_verify_tls() -> bool {
    true
}

fn default_alias_name() -> String {
    "pterodactyl_ports".to_string()
}
