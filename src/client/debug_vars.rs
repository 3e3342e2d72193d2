//! Member debug-state client
//!
//! Every member process exposes its live state at
//! `http://<host>:<port>/debug/vars`. The document carries a table of active
//! journal readers:
//!
//! ```json
//! { "gazette": { "readers": { "<journal>": { "bytes": 1024, "head": 4096 } } } }
//! ```
//!
//! Only `head` is consumed. A journal missing from the table is a member that
//! owns the shard but is not reading it right now.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::{ReadHead, ReadHeadSource};
use crate::error::FetchError;

/// Default port of the member debug endpoint
pub const DEFAULT_DEBUG_PORT: u16 = 8090;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DebugVars {
    #[serde(default)]
    pub(crate) gazette: Option<GazetteVars>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GazetteVars {
    #[serde(default)]
    pub(crate) readers: HashMap<String, ReaderVars>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReaderVars {
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) bytes: i64,
    pub(crate) head: i64,
}

impl DebugVars {
    /// Read head of `journal` from the reader table
    pub(crate) fn read_head(&self, journal: &str) -> ReadHead {
        self.gazette
            .as_ref()
            .and_then(|g| g.readers.get(journal))
            .map(|r| ReadHead::Offset(r.head))
            .unwrap_or(ReadHead::NotReading)
    }
}

/// HTTP client for member debug endpoints
#[derive(Clone)]
pub struct DebugVarsClient {
    port: u16,
    client: reqwest::Client,
}

impl DebugVarsClient {
    pub fn new(port: u16, client: reqwest::Client) -> Self {
        Self { port, client }
    }

    /// Debug URL of the member on `host`
    pub fn debug_url(&self, host: &str) -> String {
        if host.contains(':') && !host.starts_with('[') {
            format!("http://[{}]:{}/debug/vars", host, self.port)
        } else {
            format!("http://{}:{}/debug/vars", host, self.port)
        }
    }
}

#[async_trait]
impl ReadHeadSource for DebugVarsClient {
    async fn read_head(&self, host: &str, journal: &str) -> Result<ReadHead, FetchError> {
        let url = self.debug_url(host);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(&url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, &e))?;
        let vars: DebugVars =
            serde_json::from_slice(&body).map_err(|e| FetchError::decode(&url, e.to_string()))?;
        Ok(vars.read_head(journal))
    }
}
