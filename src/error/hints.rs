//! Error hints for actionable error messages

use super::{ConfigError, ShardlagError, StoreError};

/// Extension trait for adding hints to errors
pub trait ErrorHint {
    /// Get a helpful hint for resolving this error
    fn hint(&self) -> Option<String>;

    /// Format the error with hint for display
    fn with_hint(&self) -> String;
}

impl ErrorHint for ShardlagError {
    fn hint(&self) -> Option<String> {
        match self {
            ShardlagError::Store(StoreError::KeyNotFound(key)) => Some(format!(
                "Key '{}' does not exist. Check the --prefix value points at a consumer root (a directory holding `items`) or a parent of consumer roots",
                key
            )),
            ShardlagError::Store(StoreError::Request { .. }) => Some(
                "The coordination store is unreachable. Verify --etcd-endpoint (or SHARDLAG_ETCD_ENDPOINT) and that etcd serves the v2 keys API".into()
            ),
            ShardlagError::Store(StoreError::Status { status, .. }) => Some(format!(
                "The coordination store answered with HTTP {}. Verify the endpoint is an etcd v2 keys API",
                status
            )),
            ShardlagError::ConfigDomain(ConfigError::Missing(setting)) => Some(format!(
                "Provide {} on the command line, through the environment, or in shardlag.toml (see --generate-config)",
                setting
            )),
            ShardlagError::Config(_) | ShardlagError::ConfigDomain(_) => Some(
                "Run with --generate-config to print a commented example configuration".into()
            ),
            ShardlagError::Server(msg) if msg.contains("in use") => Some(
                "Pick a free address with --metrics-addr".into()
            ),
            _ => None,
        }
    }

    fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
