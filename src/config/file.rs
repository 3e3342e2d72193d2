//! Configuration file support for shardlag
//!
//! ## Priority Order
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! ## Example Configuration
//!
//! ```toml
//! # shardlag.toml
//!
//! prefixes = ["/gazette/consumers"]
//! log_level = "info"
//!
//! [store]
//! etcd_endpoint = "http://etcd:2379"
//!
//! [broker]
//! endpoint = "http://gazette:8081"
//! journal_root = "pippio-journals"
//!
//! [members]
//! debug_port = 8090
//! request_timeout_ms = 5000
//!
//! [monitor]
//! interval_secs = 60
//! metrics_addr = "0.0.0.0:9100"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShardlagError};

/// Root configuration structure for TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Etcd prefixes to check for consumers
    pub prefixes: Option<Vec<String>>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,

    /// Coordination store configuration
    pub store: StoreSection,

    /// Broker configuration
    pub broker: BrokerSection,

    /// Member debug endpoint configuration
    pub members: MembersSection,

    /// Monitor mode configuration
    pub monitor: MonitorSection,

    /// Report output configuration
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Etcd v2 endpoint
    pub etcd_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    /// Broker endpoint used for write heads
    pub endpoint: Option<String>,

    /// Prefix prepended to derived journal names
    pub journal_root: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MembersSection {
    /// Port of member debug endpoints
    pub debug_port: Option<u16>,

    /// Timeout of every outbound request in milliseconds
    pub request_timeout_ms: Option<u64>,

    /// Deadline of the fetch phase of one pass in milliseconds
    pub pass_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// Run in monitor mode
    pub enabled: Option<bool>,

    /// Seconds between passes
    pub interval_secs: Option<u64>,

    /// Listen address of the /metrics endpoint
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// One of text, json, csv, tsv
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ShardlagError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            ShardlagError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Try to load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./shardlag.toml
    /// 2. /etc/shardlag/shardlag.toml
    /// 3. ~/.config/shardlag/shardlag.toml
    pub fn load_default() -> Option<Self> {
        let default_paths = [
            PathBuf::from("shardlag.toml"),
            PathBuf::from("/etc/shardlag/shardlag.toml"),
            dirs::config_dir()
                .map(|p| p.join("shardlag/shardlag.toml"))
                .unwrap_or_default(),
        ];

        for path in default_paths.iter().filter(|p| !p.as_os_str().is_empty()) {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {:?}", path);
                        return Some(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        None
    }

    /// Generate an example configuration file
    pub fn generate_example() -> String {
        r#"# shardlag Configuration File
# Copy to shardlag.toml and customize as needed
#
# Configuration priority (highest to lowest):
# 1. Command-line arguments
# 2. Environment variables
# 3. This configuration file
# 4. Default values

# Etcd prefixes to check for consumers. A prefix is either a consumer root
# (it has an items/ or members/ child) or a directory of further prefixes.
prefixes = ["/gazette/consumers"]

# Log level (trace, debug, info, warn, error)
log_level = "info"

[store]
# Etcd v2 endpoint
etcd_endpoint = "http://127.0.0.1:2379"

[broker]
# Broker endpoint used for write heads
endpoint = "http://127.0.0.1:8081"

# Prefix prepended to derived journal names
# journal_root = "pippio-journals"

[members]
# Port of member debug endpoints (/debug/vars)
debug_port = 8090

# Timeout of every outbound request in milliseconds
request_timeout_ms = 5000

# Deadline of the fetch phase of one pass in milliseconds
pass_timeout_ms = 30000

[monitor]
# Export Prometheus metrics on an interval instead of printing once
enabled = false

# Seconds between passes
interval_secs = 60

# Listen address of the /metrics endpoint
metrics_addr = "0.0.0.0:9100"

[output]
# text, json, csv or tsv
format = "text"
"#
        .to_string()
    }
}
