//! OPNsense firewall client - Implementation of `AliasStore` over the
//! firewall management API.
//!
//! Uses HTTP basic auth with the key/secret pair. Scalar alias fields may
//! arrive either as plain strings or wrapped in a `{"selected": ...}`
//! object depending on firmware version; both forms are accepted on read
//! and flattened to plain strings, which is what the write endpoint
//! expects. Writes are always full-record replaces: the setItem endpoint
//! has no field-level patch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FirewallConfig;
use crate::domain::{AliasContent, PortSet};
use crate::ports::{AliasRecord, AliasStore, StoreError};

/// Result discriminator the firewall returns for an accepted write.
const RESULT_SAVED: &str = "saved";

/// Client for the OPNsense firewall API.
pub struct OpnsenseClient {
    base_url: String,
    api_key: String,
    api_secret: String,
    alias_name: String,
    client: Client,
}

impl OpnsenseClient {
    /// Creates a new firewall client from configuration.
    pub fn new(config: &FirewallConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url().to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret().to_string(),
            alias_name: config.alias_name.clone(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/firewall/alias/{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let response = self
            .client
            .get(self.url(path))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedResponse(format!(
                "{} returned {}: {}",
                path, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedResponse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl AliasStore for OpnsenseClient {
    async fn resolve_handle(&self, name: &str) -> Result<String, StoreError> {
        let body: UuidResponse = self.get_json(&format!("getAliasUUID/{}", name)).await?;

        if body.uuid.is_empty() {
            return Err(StoreError::AliasNotFound(name.to_string()));
        }
        debug!(alias = name, handle = %body.uuid, "resolved alias handle");
        Ok(body.uuid)
    }

    async fn read_record(&self, handle: &str) -> Result<AliasRecord, StoreError> {
        let body: GetItemResponse = self.get_json(&format!("getItem/{}", handle)).await?;

        match body.alias {
            Some(alias) => Ok(alias.into_record(&self.alias_name)),
            None => Err(StoreError::UnexpectedResponse(format!(
                "getItem/{} returned no alias",
                handle
            ))),
        }
    }

    async fn replace_ports(
        &self,
        handle: &str,
        ports: &PortSet,
        default_description: &str,
    ) -> Result<(), StoreError> {
        // Read-modify-write: fetch the full record so every field the
        // firewall requires is echoed back.
        let current = self.read_record(handle).await?;
        let updated = current.with_ports(ports, default_description);

        let payload = SetItemRequest {
            alias: SetAliasBody {
                enabled: &updated.enabled,
                name: &updated.name,
                kind: &updated.kind,
                content: AliasContent::encode(ports),
                description: &updated.description,
            },
        };

        let response = self
            .client
            .post(self.url(&format!("setItem/{}", handle)))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::WriteRejected(format!(
                "setItem returned {}: {}",
                status, body
            )));
        }

        let body: SetItemResponse = response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedResponse(format!("setItem: {}", e)))?;

        if body.result != RESULT_SAVED {
            return Err(StoreError::WriteRejected(format!(
                "setItem result was '{}'",
                body.result
            )));
        }

        debug!(handle, ports = ports.len(), "alias content replaced");
        Ok(())
    }

    async fn apply_changes(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url("reconfigure"))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedResponse(format!(
                "reconfigure returned {}: {}",
                status, body
            )));
        }

        debug!("firewall reconfigure triggered");
        Ok(())
    }
}

// ----- Firewall API Types -----

#[derive(Debug, Deserialize)]
struct UuidResponse {
    #[serde(default)]
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct GetItemResponse {
    #[serde(default)]
    alias: Option<WireAlias>,
}

/// Alias record as the firewall serializes it on read.
#[derive(Debug, Deserialize)]
struct WireAlias {
    #[serde(default)]
    enabled: FieldValue,
    #[serde(default)]
    name: FieldValue,
    #[serde(default, rename = "type")]
    kind: FieldValue,
    #[serde(default, deserialize_with = "lenient_content")]
    content: Option<AliasContent>,
    #[serde(default)]
    description: FieldValue,
}

impl WireAlias {
    /// Flattens the wire shape into a record, defaulting the name to the
    /// configured alias name so a sparse read can't blank it on write.
    fn into_record(self, default_name: &str) -> AliasRecord {
        AliasRecord {
            enabled: self.enabled.into_string("1"),
            name: self.name.into_string(default_name),
            kind: self.kind.into_string("port"),
            content: self.content,
            description: self.description.into_string(""),
        }
    }
}

/// Content that is neither a mapping nor a string decodes to `None`
/// (empty set) rather than failing the whole record.
fn lenient_content<'de, D>(deserializer: D) -> Result<Option<AliasContent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A scalar alias field: plain string, wrapped in `{"selected": ...}`, or
/// some other JSON scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Plain(String),
    Wrapped {
        #[serde(default)]
        selected: Option<serde_json::Value>,
    },
    Other(serde_json::Value),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Plain(String::new())
    }
}

impl FieldValue {
    /// Flattens the field to the plain string the write endpoint expects,
    /// falling back to `default` when empty or absent.
    fn into_string(self, default: &str) -> String {
        let value = match self {
            FieldValue::Plain(s) => s,
            FieldValue::Wrapped { selected } => match selected {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => String::new(),
            },
            FieldValue::Other(serde_json::Value::Number(n)) => n.to_string(),
            FieldValue::Other(serde_json::Value::Bool(b)) => {
                if b {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
            FieldValue::Other(_) => String::new(),
        };

        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }
}

#[derive(Debug, Serialize)]
struct SetItemRequest<'a> {
    alias: SetAliasBody<'a>,
}

#[derive(Debug, Serialize)]
struct SetAliasBody<'a> {
    enabled: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    content: String,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct SetItemResponse {
    #[serde(default)]
    result: String,
}
