//! Error types for shardlag
//!
//! Fatal errors (the coordination store cannot produce a topology, the
//! configuration is invalid) travel as [`ShardlagError`]. Per-journal fetch
//! failures are [`FetchError`] values carried inside task results and never
//! abort a pass.

use thiserror::Error;

mod domain;
mod hints;

pub use domain::{ConfigError, FetchError, StoreError};
pub use hints::ErrorHint;

/// Result type alias for shardlag operations
pub type Result<T> = std::result::Result<T, ShardlagError>;

/// Main error type for shardlag
#[derive(Error, Debug)]
pub enum ShardlagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {0}")]
    ConfigDomain(#[from] ConfigError),

    #[error("Coordination store error: {0}")]
    Store(#[from] StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShardlagError {
    /// Create a configuration error for a specific setting
    pub fn invalid_setting(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        ShardlagError::ConfigDomain(ConfigError::invalid_setting(setting, reason))
    }

    /// Whether this error came from the coordination store
    pub fn is_store_error(&self) -> bool {
        matches!(self, ShardlagError::Store(_))
    }
}
