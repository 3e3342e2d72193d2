//! etcd v2 keys API client
//!
//! `GET <endpoint>/v2/keys<key>?recursive=..&sorted=..` returns
//! `{"action": "get", "node": {...}}` on success and
//! `{"errorCode": 100, "message": "Key not found", ...}` with HTTP 404 when
//! the key is absent.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{normalize_key, GetOptions, KeysApi, Node};
use crate::error::StoreError;

/// etcd error code for a missing key
const ETCD_KEY_NOT_FOUND: u64 = 100;

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeysErrorResponse {
    error_code: u64,
    #[serde(default)]
    message: String,
}

/// HTTP client for the etcd v2 keys API
#[derive(Clone)]
pub struct EtcdKeysClient {
    endpoint: String,
    client: reqwest::Client,
}

impl EtcdKeysClient {
    /// Create a client for `endpoint` (e.g. `http://127.0.0.1:2379`).
    ///
    /// The `reqwest::Client` is shared with the other fetchers and carries
    /// the per-request timeout.
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.contains("://") {
            endpoint
        } else {
            format!("http://{}", endpoint)
        };
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/v2/keys{}", self.endpoint, key)
    }
}

#[async_trait]
impl KeysApi for EtcdKeysClient {
    async fn get(&self, key: &str, options: GetOptions) -> Result<Node, StoreError> {
        let key = normalize_key(key);
        let url = self.url_for(&key);
        debug!(key = %key, recursive = options.recursive, "Listing coordination store key");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("recursive", options.recursive.to_string()),
                ("sorted", options.sorted.to_string()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::request(&key, e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::request(&key, e.to_string()))?;

        if status.is_success() {
            let parsed: KeysResponse = serde_json::from_slice(&body)
                .map_err(|e| StoreError::decode(&key, e.to_string()))?;
            return Ok(parsed.node);
        }

        match serde_json::from_slice::<KeysErrorResponse>(&body) {
            Ok(err) if err.error_code == ETCD_KEY_NOT_FOUND => Err(StoreError::key_not_found(key)),
            Ok(err) => Err(StoreError::status(&key, status.as_u16(), err.message)),
            Err(_) if status == reqwest::StatusCode::NOT_FOUND => {
                Err(StoreError::key_not_found(key))
            }
            Err(_) => Err(StoreError::status(
                &key,
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            )),
        }
    }
}
