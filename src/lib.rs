#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # shardlag
//!
//! Replication lag reporter for sharded stream-processing consumer groups.
//!
//! A consumer group keeps its shard assignment in etcd: every shard item under
//! `<group>/items` lists the members holding it, oldest first, so the first
//! entry is the primary. Each shard reads one journal. `shardlag` compares the
//! broker's write head of every journal with the read head the primary reports
//! on its debug endpoint, falls back to the offsets persisted under
//! `<group>/offsets` when the live value is missing or suspect, and classifies
//! every journal (`OK`, `Recovering`, `NotReading`, `EtcdAhead`,
//! `Unavailable`).
//!
//! ## Quick Start
//!
//! ```bash
//! # One-shot report of every consumer under a prefix
//! $ shardlag --prefix /gazette/consumers --etcd-endpoint http://etcd:2379
//!
//! # Export Prometheus gauges every minute on :9100/metrics
//! $ shardlag --prefix /gazette/consumers --monitor
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use shardlag::client::{build_http_client, BrokerClient, DebugVarsClient};
//! use shardlag::coordination::EtcdKeysClient;
//! use shardlag::consumer::{LagPass, PassConfig};
//!
//! # async fn example() -> shardlag::Result<()> {
//! let http = build_http_client(Duration::from_secs(5))?;
//! let pass = LagPass::new(
//!     Arc::new(EtcdKeysClient::new("127.0.0.1:2379", http.clone())),
//!     Arc::new(BrokerClient::new("http://127.0.0.1:8081", http.clone())),
//!     Arc::new(DebugVarsClient::new(8090, http)),
//!     PassConfig::default(),
//! );
//! let lag = pass.run("/gazette/consumers/indexer").await?;
//! println!("total lag: {}", lag.total_lag());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]

pub mod client;
pub mod config;
pub mod consumer;
pub mod coordination;
pub mod error;
pub mod metrics;
#[cfg(feature = "metrics")]
pub mod monitor;
pub mod report;

pub use consumer::{ConsumerLag, JournalLag, JournalState, LagPass, MemberLag, PassConfig};
pub use error::{Result, ShardlagError};
