//! Outbound clients for journal offsets
//!
//! Two independent sources feed a lag pass:
//!
//! - [`WriteHeadSource`]: the broker's current write offset of a journal
//! - [`ReadHeadSource`]: the offset a member process has read a journal through,
//!   taken from its live debug state
//!
//! Both are traits so a pass can be driven against in-process fakes. The HTTP
//! implementations share one `reqwest::Client` built by [`build_http_client`],
//! which applies the per-request timeout to every call.

pub mod broker;
pub mod debug_vars;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{FetchError, Result, ShardlagError};

pub use broker::BrokerClient;
pub use debug_vars::DebugVarsClient;

/// A member's live read position for one journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadHead {
    /// The member is reading and has consumed through this offset
    Offset(i64),
    /// The member answered but has no reader for the journal
    NotReading,
}

/// Source of journal write heads
#[async_trait]
pub trait WriteHeadSource: Send + Sync {
    async fn write_head(&self, journal: &str) -> std::result::Result<i64, FetchError>;
}

/// Source of member read heads
#[async_trait]
pub trait ReadHeadSource: Send + Sync {
    /// Read head of `journal` as reported by the member process on `host`
    async fn read_head(&self, host: &str, journal: &str)
        -> std::result::Result<ReadHead, FetchError>;
}

/// Build the HTTP client shared by every outbound call of the process
pub fn build_http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .connect_timeout(request_timeout)
        .build()
        .map_err(|e| ShardlagError::Internal(format!("Failed to create HTTP client: {}", e)))
}
