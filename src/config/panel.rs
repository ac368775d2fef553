//! Pterodactyl panel configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// Connection settings for the Pterodactyl application API
#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    /// Panel base URL (e.g. https://panel.example.com)
    pub base_url: String,

    /// Application API key, sent as a bearer token
    pub api_key: Secret<String>,
}

impl PanelConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Exposes the API key (for building requests)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Validate panel configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("PORT_MAPPER__PANEL__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("panel.base_url"));
        }
        if self.api_key().is_empty() {
            return Err(ValidationError::MissingRequired("PORT_MAPPER__PANEL__API_KEY"));
        }
        Ok(())
    }
}
