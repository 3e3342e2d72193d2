//! Monitor mode
//!
//! Runs a lag pass for every discovered consumer on a fixed interval and
//! publishes the results as Prometheus gauges. Prefixes are re-expanded every
//! tick so consumers that appear or vanish are picked up. Ctrl-C stops the
//! loop and the HTTP endpoint.

pub mod server;

use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::consumer::LagPass;
use crate::error::Result;
use crate::metrics;

pub use server::MonitorServerState;

/// Outcome of the most recent monitor tick
#[derive(Debug, Clone, Default)]
pub struct PassStatus {
    /// Completed ticks
    pub passes: u64,
    /// Consumers discovered on the last tick
    pub consumers: usize,
    /// Consumers whose pass failed on the last tick
    pub failed_consumers: usize,
    /// Fatal error of the last tick
    pub last_error: Option<String>,
}

/// One monitor tick: discover, run every consumer, publish gauges
pub async fn tick(pass: &LagPass, prefixes: &[String], status: &RwLock<PassStatus>) {
    match pass.run_all(prefixes).await {
        Ok(results) => {
            let consumers = results.len();
            let mut failed = 0;
            for (consumer, result) in results {
                match result {
                    Ok(lag) => metrics::record_consumer_lag(&lag),
                    Err(e) => {
                        failed += 1;
                        warn!(consumer = %consumer, error = %e, "Lag pass failed");
                    }
                }
            }

            let mut status = status.write().await;
            status.passes += 1;
            status.consumers = consumers;
            status.failed_consumers = failed;
            status.last_error = None;
        }
        Err(e) => {
            error!(error = %e, "Consumer discovery failed");
            let mut status = status.write().await;
            status.passes += 1;
            status.last_error = Some(e.to_string());
        }
    }
}

/// Run monitor mode until Ctrl-C
pub async fn run_monitor(pass: LagPass, prefixes: Vec<String>, config: MonitorConfig) -> Result<()> {
    let status = Arc::new(RwLock::new(PassStatus::default()));
    let gauge_idle = metrics::gauge_idle_timeout(config.interval, pass.config().pass_timeout);
    let state = MonitorServerState {
        metrics_handle: metrics::init_metrics(Some(gauge_idle)),
        status: Arc::clone(&status),
    };

    let listener = server::bind(config.metrics_addr).await?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(server::serve(listener, state, async move {
        let _ = server_shutdown.changed().await;
    }));

    info!(
        interval_secs = config.interval.as_secs(),
        prefixes = ?prefixes,
        "Monitor mode started"
    );

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, stopping monitor"),
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C, monitor runs until killed");
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    loop {
        tokio::select! {
            _ = interval.tick() => tick(&pass, &prefixes, &status).await,
            _ = shutdown_rx.changed() => break,
        }
    }

    match server.await {
        Ok(result) => result,
        Err(e) => Err(crate::error::ShardlagError::Internal(format!(
            "Metrics server task failed: {}",
            e
        ))),
    }
}
