//! Default constants for shardlag configuration

/// Default etcd v2 endpoint
pub const DEFAULT_ETCD_ENDPOINT: &str = "http://127.0.0.1:2379";

/// Default broker endpoint answering write-head requests
pub const DEFAULT_BROKER_ENDPOINT: &str = "http://127.0.0.1:8081";

/// Default port of member debug endpoints
pub const DEFAULT_DEBUG_PORT: u16 = crate::client::debug_vars::DEFAULT_DEBUG_PORT;

/// Default journal root; empty means derived names are used as-is
pub const DEFAULT_JOURNAL_ROOT: &str = "";

/// Default interval between monitor passes in seconds
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 60;

/// Default listen address of the metrics endpoint
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9100";

/// Default per-request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default pass deadline in milliseconds
pub const DEFAULT_PASS_TIMEOUT_MS: u64 = 30_000;

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
