//! One reconciliation pass over a consumer group
//!
//! Resolve topology, then fetch heads and persisted offsets concurrently, then
//! reconcile. Nothing carries between passes.

use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{ReadHeadSource, WriteHeadSource};
use crate::consumer::discovery::expand_prefixes;
use crate::consumer::heads::HeadFetcher;
use crate::consumer::lag::{reconcile, ConsumerLag};
use crate::consumer::offsets::{load_checkpoint_offsets, CheckpointOffsets};
use crate::consumer::topology::load_topology;
use crate::coordination::KeysApi;
use crate::error::Result;
use crate::metrics;

/// Default bound on a whole pass
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings of a [`LagPass`]
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Prefix prepended to derived journal names; empty for none
    pub journal_root: String,
    /// Deadline applied to the fetch phase of each pass
    pub pass_timeout: Duration,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            journal_root: String::new(),
            pass_timeout: DEFAULT_PASS_TIMEOUT,
        }
    }
}

/// Drives lag passes against shared store and fetch clients
#[derive(Clone)]
pub struct LagPass {
    keys: Arc<dyn KeysApi>,
    fetcher: HeadFetcher,
    config: PassConfig,
}

impl LagPass {
    pub fn new(
        keys: Arc<dyn KeysApi>,
        writes: Arc<dyn WriteHeadSource>,
        reads: Arc<dyn ReadHeadSource>,
        config: PassConfig,
    ) -> Self {
        Self {
            keys,
            fetcher: HeadFetcher::new(writes, reads),
            config,
        }
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// Consumer roots under `prefixes`
    pub async fn discover(&self, prefixes: &[String]) -> Result<Vec<String>> {
        expand_prefixes(self.keys.as_ref(), prefixes).await
    }

    /// Run one pass for `consumer`.
    ///
    /// Only a failure to resolve the topology is an error; everything after
    /// degrades into unavailable journals.
    pub async fn run(&self, consumer: &str) -> Result<ConsumerLag> {
        let started = StdInstant::now();

        let topology =
            load_topology(self.keys.as_ref(), consumer, &self.config.journal_root).await?;
        debug!(
            consumer = %consumer,
            shards = topology.shards.len(),
            members = topology.members.len(),
            "Resolved topology"
        );

        let deadline = Instant::now() + self.config.pass_timeout;
        let checkpoints = async {
            match tokio::time::timeout_at(
                deadline,
                load_checkpoint_offsets(self.keys.as_ref(), consumer),
            )
            .await
            {
                Ok(offsets) => offsets,
                Err(_) => {
                    warn!(consumer = %consumer, "persisted offsets not loaded before pass deadline");
                    CheckpointOffsets::new()
                }
            }
        };
        let (heads, checkpoints) = tokio::join!(self.fetcher.fetch(&topology, deadline), checkpoints);

        let lag = reconcile(&topology, &heads, &checkpoints);
        let elapsed = started.elapsed();
        metrics::record_pass_duration(elapsed);

        info!(
            consumer = %consumer,
            journals = lag.journals.len(),
            total_lag = lag.total_lag(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Lag pass complete"
        );
        Ok(lag)
    }

    /// Discover consumers under `prefixes` and run a pass for each.
    ///
    /// Discovery failure is fatal; a single consumer's failure is returned in
    /// its slot.
    pub async fn run_all(&self, prefixes: &[String]) -> Result<Vec<(String, Result<ConsumerLag>)>> {
        let consumers = self.discover(prefixes).await?;
        let mut results = Vec::with_capacity(consumers.len());
        for consumer in consumers {
            let lag = self.run(&consumer).await;
            results.push((consumer, lag));
        }
        Ok(results)
    }
}
