//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `PORT_MAPPER`
//! prefix and nested sections use double underscores as separators.
//! Configuration is loaded once at startup and immutable afterwards.
//!
//! # Example
//!
//! ```no_run
//! use port_mapper::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Managing alias {}", config.firewall.alias_name);
//! ```

mod error;
mod firewall;
mod panel;
mod sync;

pub use error::{ConfigError, ValidationError};
pub use firewall::FirewallConfig;
pub use panel::PanelConfig;
pub use sync::SyncConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the port mapper. Load using
/// [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Pterodactyl panel connection (base URL, bearer token)
    pub panel: PanelConfig,

    /// OPNsense firewall connection (base URL, key/secret, alias name)
    pub firewall: FirewallConfig,

    /// Sync loop settings (interval, excluded ports, timeouts)
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `PORT_MAPPER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PORT_MAPPER__PANEL__BASE_URL=...` -> `panel.base_url = ...`
    /// - `PORT_MAPPER__SYNC__INTERVAL_SECS=30` -> `sync.interval_secs = 30`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required values are missing or cannot be
    /// parsed into the expected types. A failed load is fatal: the process
    /// must not enter the sync loop without credentials.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PORT_MAPPER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.panel.validate()?;
        self.firewall.validate()?;
        self.sync.validate()?;
        Ok(())
    }
}
