//! Consumer checkpoint helpers
//!
//! A checkpoint is the durable consumption progress of a shard: the offset
//! read through per source journal, the acknowledgement state of every
//! producer seen on that journal, and the acknowledgement intents still to be
//! written out. These helpers build a [`Checkpoint`] from its flat parts and
//! flatten it back.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Width of a producer id in bytes
pub const PRODUCER_ID_LEN: usize = 6;

/// Identifier of a message producer
pub type ProducerId = [u8; PRODUCER_ID_LEN];

/// Journal -> offset
pub type Offsets = HashMap<String, i64>;

/// Acknowledgement state of one producer on one journal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerCheckpoint {
    /// Clock of the last acknowledged message
    pub last_ack: u64,
    /// Offset of the first message of a pending transaction, or -1
    pub begin: i64,
}

/// Progress through one source journal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCheckpoint {
    pub read_through: i64,
    /// Keyed by the producer id bytes; serialized with hex keys
    #[serde(with = "hex_producer_keys")]
    pub producers: HashMap<ProducerId, ProducerCheckpoint>,
}

mod hex_producer_keys {
    use super::{ProducerCheckpoint, ProducerId};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::{BTreeMap, HashMap};

    pub fn serialize<S: Serializer>(
        producers: &HashMap<ProducerId, ProducerCheckpoint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        producers
            .iter()
            .map(|(id, state)| (hex::encode(id), state))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<ProducerId, ProducerCheckpoint>, D::Error> {
        let encoded = BTreeMap::<String, ProducerCheckpoint>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(key, state)| {
                let mut id = ProducerId::default();
                hex::decode_to_slice(&key, &mut id)
                    .map_err(|e| D::Error::custom(format!("invalid producer id {:?}: {}", key, e)))?;
                Ok((id, state))
            })
            .collect()
    }
}

/// Durable consumption progress of a shard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub sources: HashMap<String, SourceCheckpoint>,
    /// Journal -> encoded acknowledgement intent
    pub ack_intents: HashMap<String, Vec<u8>>,
}

/// Producer state flattened out of a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducerState<'a> {
    pub journal: &'a str,
    pub producer: ProducerId,
    pub last_ack: u64,
    pub begin: i64,
}

/// Pending acknowledgement for a journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckIntent {
    pub journal: String,
    pub intent: Vec<u8>,
}

/// Arguments of [`build_checkpoint`]
#[derive(Debug, Clone, Default)]
pub struct BuildCheckpointArgs<'a> {
    pub read_through: Offsets,
    pub producer_states: Vec<ProducerState<'a>>,
    pub ack_intents: Vec<AckIntent>,
}

/// Build a checkpoint from its flat parts.
///
/// A producer state for a journal absent from `read_through` creates that
/// source with `read_through = 0`.
pub fn build_checkpoint(args: BuildCheckpointArgs<'_>) -> Checkpoint {
    let mut cp = Checkpoint {
        sources: HashMap::with_capacity(args.read_through.len()),
        ack_intents: HashMap::with_capacity(args.ack_intents.len()),
    };

    for (journal, offset) in args.read_through {
        cp.sources.insert(
            journal,
            SourceCheckpoint {
                read_through: offset,
                producers: HashMap::new(),
            },
        );
    }
    for state in args.producer_states {
        cp.sources
            .entry(state.journal.to_string())
            .or_default()
            .producers
            .insert(
                state.producer,
                ProducerCheckpoint {
                    last_ack: state.last_ack,
                    begin: state.begin,
                },
            );
    }
    for ack in args.ack_intents {
        cp.ack_intents.insert(ack.journal, ack.intent);
    }
    cp
}

/// Every producer state recorded in `cp`
pub fn flatten_producer_states(cp: &Checkpoint) -> Vec<ProducerState<'_>> {
    cp.sources
        .iter()
        .flat_map(|(journal, source)| {
            source.producers.iter().map(move |(producer, state)| ProducerState {
                journal: journal.as_str(),
                producer: *producer,
                last_ack: state.last_ack,
                begin: state.begin,
            })
        })
        .collect()
}

/// Read-through offset of every source journal in `cp`
pub fn flatten_read_through(cp: &Checkpoint) -> Offsets {
    cp.sources
        .iter()
        .map(|(journal, source)| (journal.clone(), source.read_through))
        .collect()
}
