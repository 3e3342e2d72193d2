//! Consumer group lag reconciliation
//!
//! A pass resolves a group's shard topology from the coordination store,
//! fans out write-head and read-head fetches, loads persisted checkpoint
//! offsets, and reconciles everything into per-journal and per-member lag.

pub mod checkpoint;
pub mod discovery;
pub mod heads;
pub mod lag;
pub mod offsets;
pub mod pass;
pub mod topology;

pub use checkpoint::{
    build_checkpoint, flatten_producer_states, flatten_read_through, AckIntent,
    BuildCheckpointArgs, Checkpoint, ProducerCheckpoint, ProducerState, SourceCheckpoint,
};
pub use discovery::expand_prefixes;
pub use heads::{FetchKind, HeadFetcher, HeadResult, HeadSnapshot};
pub use lag::{
    classify, reconcile, ConsumerLag, JournalLag, JournalState, LagStats, MemberLag,
};
pub use offsets::{load_checkpoint_offsets, CheckpointOffsets};
pub use pass::{LagPass, PassConfig};
pub use topology::{
    derive_journal_name, load_topology, resolve_topology, ConsumerTopology, MemberInfo,
    Replica, ReplicaRole, ReplicaState, ShardRoute,
};
