//! Concurrent write-head and read-head collection
//!
//! One task per journal asks the broker for its write head; one more task per
//! journal with a pollable primary asks that member for its read head. Every
//! task owns a sender of an unbounded channel (one channel per fetch kind) and
//! delivers exactly one [`HeadResult`], success or failure. The collector
//! drains a channel until every sender is gone, which is the completion
//! barrier for that kind, or until the pass deadline, at which point
//! outstanding tasks are aborted and their journals stay unknown.
//!
//! Results are folded into a [`HeadSnapshot`] keyed by journal, so the
//! snapshot does not depend on arrival order.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ReadHead, ReadHeadSource, WriteHeadSource};
use crate::consumer::topology::ConsumerTopology;
use crate::error::FetchError;
use crate::metrics;

/// Which offset a fetch task asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    WriteHead,
    ReadHead,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::WriteHead => "write_head",
            FetchKind::ReadHead => "read_head",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result record of one fetch task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResult<T> {
    pub journal: String,
    pub outcome: Result<T, FetchError>,
}

/// Offsets gathered by one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadSnapshot {
    pub write_heads: HashMap<String, i64>,
    pub read_heads: HashMap<String, ReadHead>,
}

impl HeadSnapshot {
    /// Fold a write-head result in. Failures leave the journal unknown.
    pub fn absorb_write(&mut self, result: HeadResult<i64>) {
        match result.outcome {
            Ok(head) => {
                self.write_heads.insert(result.journal, head);
            }
            Err(e) => {
                warn!(journal = %result.journal, error = %e, "failed to retrieve write-head info");
                metrics::record_fetch_error(FetchKind::WriteHead.as_str());
            }
        }
    }

    /// Fold a read-head result in. Failures leave the journal unknown.
    pub fn absorb_read(&mut self, result: HeadResult<ReadHead>) {
        match result.outcome {
            Ok(head) => {
                self.read_heads.insert(result.journal, head);
            }
            Err(e) => {
                warn!(journal = %result.journal, error = %e, "failed to retrieve read-head info");
                metrics::record_fetch_error(FetchKind::ReadHead.as_str());
            }
        }
    }
}

/// Fans head requests out over the tokio runtime
#[derive(Clone)]
pub struct HeadFetcher {
    writes: Arc<dyn WriteHeadSource>,
    reads: Arc<dyn ReadHeadSource>,
}

impl HeadFetcher {
    pub fn new(writes: Arc<dyn WriteHeadSource>, reads: Arc<dyn ReadHeadSource>) -> Self {
        Self { writes, reads }
    }

    /// Fetch every head of `topology`, waiting at most until `deadline`
    pub async fn fetch(&self, topology: &ConsumerTopology, deadline: Instant) -> HeadSnapshot {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (read_tx, read_rx) = mpsc::unbounded_channel();

        let mut write_tasks = Vec::with_capacity(topology.shards.len());
        let mut write_expected = BTreeSet::new();
        for journal in topology.journals() {
            let tx = write_tx.clone();
            let source = Arc::clone(&self.writes);
            let journal = journal.to_string();
            write_expected.insert(journal.clone());
            write_tasks.push(tokio::spawn(async move {
                let outcome = source.write_head(&journal).await;
                let _ = tx.send(HeadResult { journal, outcome });
            }));
        }
        drop(write_tx);

        let mut read_tasks = Vec::new();
        let mut read_expected = BTreeSet::new();
        for (journal, host) in topology.read_targets() {
            let tx = read_tx.clone();
            let source = Arc::clone(&self.reads);
            let journal = journal.to_string();
            let host = host.to_string();
            read_expected.insert(journal.clone());
            read_tasks.push(tokio::spawn(async move {
                let outcome = source.read_head(&host, &journal).await;
                let _ = tx.send(HeadResult { journal, outcome });
            }));
        }
        drop(read_tx);

        debug!(
            consumer = %topology.consumer,
            write_tasks = write_tasks.len(),
            read_tasks = read_tasks.len(),
            "Scheduled head fetches"
        );

        let mut snapshot = HeadSnapshot::default();

        let writes = collect(write_rx, deadline, &write_tasks).await;
        report_unanswered(FetchKind::WriteHead, &write_expected, writes.iter().map(|r| &r.journal));
        for result in writes {
            snapshot.absorb_write(result);
        }

        let reads = collect(read_rx, deadline, &read_tasks).await;
        report_unanswered(FetchKind::ReadHead, &read_expected, reads.iter().map(|r| &r.journal));
        for result in reads {
            snapshot.absorb_read(result);
        }

        snapshot
    }
}

/// Drain `rx` until all senders are dropped or `deadline` passes.
///
/// On deadline the remaining tasks are aborted; whatever already reached the
/// channel is still returned.
async fn collect<T>(
    mut rx: UnboundedReceiver<HeadResult<T>>,
    deadline: Instant,
    tasks: &[JoinHandle<()>],
) -> Vec<HeadResult<T>> {
    let mut results = Vec::with_capacity(tasks.len());
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(result)) => results.push(result),
            Ok(None) => return results,
            Err(_) => break,
        }
    }

    for task in tasks {
        task.abort();
    }
    rx.close();
    while let Ok(result) = rx.try_recv() {
        results.push(result);
    }
    results
}

fn report_unanswered<'a>(
    kind: FetchKind,
    expected: &BTreeSet<String>,
    answered: impl Iterator<Item = &'a String>,
) {
    let answered: BTreeSet<&String> = answered.collect();
    for journal in expected.iter().filter(|j| !answered.contains(j)) {
        warn!(journal = %journal, kind = %kind, "no response before pass deadline, treating as unavailable");
        metrics::record_fetch_error(kind.as_str());
    }
}
