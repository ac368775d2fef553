//! Pterodactyl panel client - Implementation of `AllocationSource` over
//! the application API.
//!
//! Fetches `GET /api/application/servers?include=allocations&page=N` with
//! a bearer token, walking pages until the reported current page reaches
//! the reported total. A failed page does not fail the fetch: pagination
//! stops and the accumulated records are returned with the `truncated`
//! flag set, so a partial snapshot is visible but still usable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::PanelConfig;
use crate::domain::Allocation;
use crate::ports::{AllocationFetch, AllocationSource, SourceError};

/// Client for the Pterodactyl application API.
pub struct PterodactylClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl PterodactylClient {
    /// Creates a new panel client from configuration.
    pub fn new(config: &PanelConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url().to_string(),
            api_key: config.api_key().to_string(),
            client,
        }
    }

    /// Builds the server listing URL for one page.
    fn servers_url(&self, page: u32) -> String {
        format!(
            "{}/api/application/servers?include=allocations&page={}",
            self.base_url, page
        )
    }
}

#[async_trait]
impl AllocationSource for PterodactylClient {
    async fn fetch_all(&self) -> Result<AllocationFetch, SourceError> {
        Ok(drain_pages(self).await)
    }
}

/// One page fetch, separated from the pagination walk so the walk can be
/// tested without a live panel.
#[async_trait]
trait PageFetcher {
    async fn fetch_page(&self, page: u32) -> Result<ServerPage, String>;
}

#[async_trait]
impl PageFetcher for PterodactylClient {
    async fn fetch_page(&self, page: u32) -> Result<ServerPage, String> {
        let response = self
            .client
            .get(self.servers_url(page))
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status, body));
        }

        response
            .json::<ServerPage>()
            .await
            .map_err(|e| format!("malformed response body: {}", e))
    }
}

/// Walks pages starting at 1, flattening allocations as it goes.
///
/// Stops when the pagination block says the last page was reached, when
/// the block is missing or malformed (treated as single page), or when a
/// page fails (partial result, `truncated` set).
async fn drain_pages(fetcher: &impl PageFetcher) -> AllocationFetch {
    let mut fetch = AllocationFetch::default();
    let mut page = 1;

    loop {
        let body = match fetcher.fetch_page(page).await {
            Ok(body) => body,
            Err(error) => {
                warn!(page, error = %error, "page fetch failed, returning partial results");
                fetch.truncated = true;
                break;
            }
        };

        fetch.servers_seen += body.data.len();
        for server in body.data {
            flatten_server(server, &mut fetch.records);
        }

        match body.meta.and_then(|m| m.pagination) {
            Some(p) if p.current_page < p.total_pages => page += 1,
            _ => break,
        }
    }

    debug!(
        servers = fetch.servers_seen,
        allocations = fetch.records.len(),
        truncated = fetch.truncated,
        "allocation fetch complete"
    );
    fetch
}

/// Flattens one server's embedded allocations into records.
fn flatten_server(server: ServerObject, records: &mut Vec<Allocation>) {
    let attrs = server.attributes;

    for allocation in attrs.relationships.allocations.data {
        let alloc_attrs = allocation.attributes;
        records.push(Allocation {
            server_name: attrs.name.clone(),
            server_id: attrs.identifier.clone(),
            server_uuid: attrs.uuid.clone(),
            ip: alloc_attrs.ip.unwrap_or_else(unknown),
            port: alloc_attrs.port.unwrap_or(0),
            is_default: alloc_attrs.is_default,
            allocation_key: Allocation::key(&allocation.object, alloc_attrs.id),
        });
    }
}

// ----- Panel API Types -----

#[derive(Debug, Default, Deserialize)]
struct ServerPage {
    #[serde(default)]
    data: Vec<ServerObject>,
    #[serde(default, deserialize_with = "lenient")]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default, deserialize_with = "lenient")]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default = "first_page")]
    current_page: u32,
    #[serde(default = "first_page")]
    total_pages: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ServerObject {
    #[serde(default)]
    attributes: ServerAttributes,
}

#[derive(Debug, Deserialize)]
struct ServerAttributes {
    #[serde(default = "unknown")]
    name: String,
    #[serde(default = "unknown")]
    identifier: String,
    #[serde(default = "unknown")]
    uuid: String,
    #[serde(default)]
    relationships: Relationships,
}

impl Default for ServerAttributes {
    fn default() -> Self {
        Self {
            name: unknown(),
            identifier: unknown(),
            uuid: unknown(),
            relationships: Relationships::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Relationships {
    #[serde(default)]
    allocations: AllocationList,
}

#[derive(Debug, Default, Deserialize)]
struct AllocationList {
    #[serde(default)]
    data: Vec<AllocationObject>,
}

#[derive(Debug, Deserialize)]
struct AllocationObject {
    #[serde(default = "allocation_kind")]
    object: String,
    #[serde(default)]
    attributes: AllocationAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct AllocationAttributes {
    #[serde(default)]
    id: u64,
    ip: Option<String>,
    port: Option<u32>,
    #[serde(default)]
    is_default: bool,
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn allocation_kind() -> String {
    "allocation".to_string()
}

fn first_page() -> u32 {
    1
}

/// Deserializes a value that may not have the expected shape, falling
/// back to `None` instead of failing the whole page.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Canned page sequence for testing the pagination walk.
    struct CannedPages {
        pages: Mutex<Vec<Result<ServerPage, String>>>,
    }

    impl CannedPages {
        fn new(pages: Vec<Result<ServerPage, String>>) -> Self {
            let mut pages = pages;
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for CannedPages {
        async fn fetch_page(&self, _page: u32) -> Result<ServerPage, String> {
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err("no more canned pages".to_string()))
        }
    }

    fn page_json(body: &str) -> ServerPage {
        serde_json::from_str(body).unwrap()
    }

    fn page_with_server(name: &str, port: u32, current: u32, total: u32) -> ServerPage {
        page_json(&format!(
            r#"{{
                "data": [{{
                    "attributes": {{
                        "name": "{name}",
                        "identifier": "id-{port}",
                        "uuid": "uuid-{port}",
                        "relationships": {{
                            "allocations": {{
                                "data": [{{
                                    "object": "allocation",
                                    "attributes": {{"id": {port}, "ip": "0.0.0.0", "port": {port}, "is_default": true}}
                                }}]
                            }}
                        }}
                    }}
                }}],
                "meta": {{"pagination": {{"current_page": {current}, "total_pages": {total}}}}}
            }}"#
        ))
    }

    #[tokio::test]
    async fn walks_all_pages_and_flattens_allocations() {
        let fetcher = CannedPages::new(vec![
            Ok(page_with_server("S1", 25565, 1, 2)),
            Ok(page_with_server("S2", 25566, 2, 2)),
        ]);

        let fetch = drain_pages(&fetcher).await;

        assert!(!fetch.truncated);
        assert_eq!(fetch.servers_seen, 2);
        let ports: Vec<u32> = fetch.records.iter().map(|a| a.port).collect();
        assert_eq!(ports, vec![25565, 25566]);
        assert_eq!(fetch.records[0].server_name, "S1");
        assert_eq!(fetch.records[0].allocation_key, "allocation_25565");
    }

    #[tokio::test]
    async fn failed_middle_page_truncates_without_raising() {
        let fetcher = CannedPages::new(vec![
            Ok(page_with_server("S1", 25565, 1, 3)),
            Err("status 500 Internal Server Error".to_string()),
            Ok(page_with_server("S3", 25567, 3, 3)),
        ]);

        let fetch = drain_pages(&fetcher).await;

        assert!(fetch.truncated);
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].port, 25565);
    }

    #[tokio::test]
    async fn failed_first_page_yields_empty_truncated_fetch() {
        let fetcher = CannedPages::new(vec![Err("connection refused".to_string())]);

        let fetch = drain_pages(&fetcher).await;

        assert!(fetch.truncated);
        assert!(fetch.records.is_empty());
        assert_eq!(fetch.servers_seen, 0);
    }

    #[tokio::test]
    async fn missing_pagination_block_means_single_page() {
        let fetcher = CannedPages::new(vec![Ok(page_json(r#"{"data": []}"#))]);

        let fetch = drain_pages(&fetcher).await;

        assert!(!fetch.truncated);
        assert_eq!(fetch.servers_seen, 0);
    }

    #[tokio::test]
    async fn malformed_pagination_block_means_single_page() {
        let body = r#"{"data": [], "meta": {"pagination": "nonsense"}}"#;
        let fetcher = CannedPages::new(vec![Ok(page_json(body))]);

        let fetch = drain_pages(&fetcher).await;

        assert!(!fetch.truncated);
    }

    #[test]
    fn missing_fields_default_to_unknown_and_zero() {
        let page = page_json(
            r#"{
                "data": [{
                    "attributes": {
                        "relationships": {
                            "allocations": {"data": [{"attributes": {}}]}
                        }
                    }
                }]
            }"#,
        );

        let mut records = Vec::new();
        for server in page.data {
            flatten_server(server, &mut records);
        }

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.server_name, "Unknown");
        assert_eq!(record.server_id, "Unknown");
        assert_eq!(record.server_uuid, "Unknown");
        assert_eq!(record.ip, "Unknown");
        assert_eq!(record.port, 0);
        assert!(!record.is_default);
        assert_eq!(record.allocation_key, "allocation_0");
    }

    #[test]
    fn server_without_allocations_contributes_nothing() {
        let page = page_json(r#"{"data": [{"attributes": {"name": "S1"}}]}"#);

        let mut records = Vec::new();
        for server in page.data {
            flatten_server(server, &mut records);
        }

        assert!(records.is_empty());
    }
}
