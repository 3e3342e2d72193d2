//! Configuration module for shardlag
//!
//! - `defaults` - Default constants and values
//! - `args` - CLI argument definitions
//! - `file` - TOML configuration file
//! - `merge` - File values applied under CLI arguments

mod args;
mod defaults;
pub mod file;
mod merge;

pub use args::LagArgs;
pub use defaults::*;
pub use file::ConfigFile;
pub use merge::merge_config_with_args;

use std::net::SocketAddr;
use std::time::Duration;

use crate::consumer::PassConfig;
use crate::error::{ConfigError, Result, ShardlagError};
use crate::report::OutputFormat;

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct LagConfig {
    /// Etcd prefixes to check for consumers
    pub prefixes: Vec<String>,

    /// Etcd v2 endpoint
    pub etcd_endpoint: String,

    /// Broker endpoint used for write heads
    pub broker_endpoint: String,

    /// Port of member debug endpoints
    pub debug_port: u16,

    /// Prefix prepended to derived journal names
    pub journal_root: String,

    /// Monitor mode settings, `None` for a one-shot report
    pub monitor: Option<MonitorConfig>,

    /// Timeout of every outbound request
    pub request_timeout: Duration,

    /// Deadline of the fetch phase of one pass
    pub pass_timeout: Duration,

    /// Output format of one-shot reports
    pub format: OutputFormat,

    /// Log level
    pub log_level: String,
}

/// Monitor mode settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between passes
    pub interval: Duration,

    /// Listen address of the /metrics endpoint
    pub metrics_addr: SocketAddr,
}

impl LagConfig {
    /// Create a validated configuration from command-line arguments
    pub fn from_args(args: LagArgs) -> Result<Self> {
        let prefixes: Vec<String> = args
            .prefixes
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if prefixes.is_empty() {
            return Err(ConfigError::missing("--prefix").into());
        }

        if args.etcd_endpoint.trim().is_empty() {
            return Err(ShardlagError::invalid_setting("etcd_endpoint", "must not be empty"));
        }
        if args.broker_endpoint.trim().is_empty() {
            return Err(ShardlagError::invalid_setting("broker_endpoint", "must not be empty"));
        }
        if args.debug_port == 0 {
            return Err(ShardlagError::invalid_setting(
                "debug_port",
                "must be between 1 and 65535",
            ));
        }
        if args.request_timeout_ms == 0 {
            return Err(ShardlagError::invalid_setting("request_timeout_ms", "must be positive"));
        }
        if args.pass_timeout_ms == 0 {
            return Err(ShardlagError::invalid_setting("pass_timeout_ms", "must be positive"));
        }
        if args.pass_timeout_ms < args.request_timeout_ms {
            tracing::warn!(
                pass_timeout_ms = args.pass_timeout_ms,
                request_timeout_ms = args.request_timeout_ms,
                "Pass deadline is shorter than the request timeout; slow members will be cut off early"
            );
        }

        let monitor = if args.monitor {
            if args.monitor_interval == 0 {
                return Err(ShardlagError::invalid_setting(
                    "monitor_interval",
                    "must be positive",
                ));
            }
            let metrics_addr: SocketAddr = args.metrics_addr.parse().map_err(|e| {
                ShardlagError::Config(format!(
                    "Invalid metrics address '{}': {}",
                    args.metrics_addr, e
                ))
            })?;
            Some(MonitorConfig {
                interval: Duration::from_secs(args.monitor_interval),
                metrics_addr,
            })
        } else {
            None
        };

        Ok(Self {
            prefixes,
            etcd_endpoint: args.etcd_endpoint,
            broker_endpoint: args.broker_endpoint,
            debug_port: args.debug_port,
            journal_root: args.journal_root.trim_matches('/').to_string(),
            monitor,
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            pass_timeout: Duration::from_millis(args.pass_timeout_ms),
            format: args.format,
            log_level: args.log_level,
        })
    }

    /// Settings handed to each lag pass
    pub fn pass_config(&self) -> PassConfig {
        PassConfig {
            journal_root: self.journal_root.clone(),
            pass_timeout: self.pass_timeout,
        }
    }
}
