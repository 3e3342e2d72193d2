//! Configuration merging utilities
//!
//! CLI arguments take precedence; a file value applies only where the CLI is
//! still at its default.

use clap::ValueEnum;
use tracing::warn;

use super::args::LagArgs;
use super::file::ConfigFile;
use super::*;
use crate::report::OutputFormat;

/// Merge configuration file values with CLI arguments.
/// CLI arguments take precedence over config file values.
/// Only applies config file values where CLI uses defaults.
pub fn merge_config_with_args(mut args: LagArgs, config: &ConfigFile) -> LagArgs {
    macro_rules! apply_if_default {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(val) = $config_val {
                if args.$field == $default {
                    args.$field = val;
                }
            }
        };
    }

    macro_rules! apply_if_default_string {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(ref val) = $config_val {
                if args.$field == $default {
                    args.$field = val.clone();
                }
            }
        };
    }

    if args.prefixes.is_empty() {
        if let Some(ref prefixes) = config.prefixes {
            args.prefixes = prefixes.clone();
        }
    }
    apply_if_default_string!(log_level, config.log_level, DEFAULT_LOG_LEVEL);

    // Store and broker
    apply_if_default_string!(etcd_endpoint, config.store.etcd_endpoint, DEFAULT_ETCD_ENDPOINT);
    apply_if_default_string!(broker_endpoint, config.broker.endpoint, DEFAULT_BROKER_ENDPOINT);
    apply_if_default_string!(journal_root, config.broker.journal_root, DEFAULT_JOURNAL_ROOT);

    // Members
    apply_if_default!(debug_port, config.members.debug_port, DEFAULT_DEBUG_PORT);
    apply_if_default!(
        request_timeout_ms,
        config.members.request_timeout_ms,
        DEFAULT_REQUEST_TIMEOUT_MS
    );
    apply_if_default!(
        pass_timeout_ms,
        config.members.pass_timeout_ms,
        DEFAULT_PASS_TIMEOUT_MS
    );

    // Monitor
    apply_if_default!(monitor, config.monitor.enabled, false);
    apply_if_default!(
        monitor_interval,
        config.monitor.interval_secs,
        DEFAULT_MONITOR_INTERVAL_SECS
    );
    apply_if_default_string!(metrics_addr, config.monitor.metrics_addr, DEFAULT_METRICS_ADDR);

    // Output
    if let Some(ref format) = config.output.format {
        if args.format == OutputFormat::Text {
            match OutputFormat::from_str(format, true) {
                Ok(parsed) => args.format = parsed,
                Err(_) => warn!(format = %format, "Ignoring unknown output format in config file"),
            }
        }
    }

    args
}
