//! Command-line arguments for shardlag

use clap::Parser;
use std::path::PathBuf;

use super::defaults::*;
use crate::report::OutputFormat;

/// Command-line arguments for shardlag
#[derive(Parser, Debug, Clone)]
#[command(name = "shardlag")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replication lag reporter for sharded consumer groups")]
pub struct LagArgs {
    /// Path to configuration file (TOML format)
    /// If not specified, looks for shardlag.toml in current directory,
    /// /etc/shardlag/, or ~/.config/shardlag/
    #[arg(short, long, env = "SHARDLAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Generate example configuration file and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Etcd prefix to check for consumers (repeatable)
    #[arg(short, long = "prefix", env = "SHARDLAG_PREFIX", value_delimiter = ',')]
    pub prefixes: Vec<String>,

    /// Etcd v2 endpoint
    #[arg(long, env = "SHARDLAG_ETCD_ENDPOINT", default_value = DEFAULT_ETCD_ENDPOINT)]
    pub etcd_endpoint: String,

    /// Broker endpoint used for write heads
    #[arg(long, env = "SHARDLAG_BROKER_ENDPOINT", default_value = DEFAULT_BROKER_ENDPOINT)]
    pub broker_endpoint: String,

    /// Port of member debug endpoints
    #[arg(long, env = "SHARDLAG_DEBUG_PORT", default_value_t = DEFAULT_DEBUG_PORT)]
    pub debug_port: u16,

    /// Prefix prepended to derived journal names
    #[arg(long, env = "SHARDLAG_JOURNAL_ROOT", default_value = DEFAULT_JOURNAL_ROOT)]
    pub journal_root: String,

    /// Export lag as Prometheus metrics on an interval instead of printing once
    #[arg(long, env = "SHARDLAG_MONITOR")]
    pub monitor: bool,

    /// Seconds between passes in monitor mode
    #[arg(long, env = "SHARDLAG_MONITOR_INTERVAL", default_value_t = DEFAULT_MONITOR_INTERVAL_SECS)]
    pub monitor_interval: u64,

    /// Listen address of the /metrics endpoint in monitor mode
    #[arg(long, env = "SHARDLAG_METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: String,

    /// Timeout of every outbound request in milliseconds
    #[arg(long, env = "SHARDLAG_REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// Deadline of the fetch phase of one pass in milliseconds.
    /// Journals without an answer by then are reported as unavailable.
    #[arg(long, env = "SHARDLAG_PASS_TIMEOUT_MS", default_value_t = DEFAULT_PASS_TIMEOUT_MS)]
    pub pass_timeout_ms: u64,

    /// Output format of one-shot reports
    #[arg(long, value_enum, env = "SHARDLAG_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SHARDLAG_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}
