//! Persisted checkpoint offsets
//!
//! Consumers persist read-through offsets under `<group>/offsets/<journal>`
//! as hex-encoded integers. They are a lower bound for a shard's read head
//! that holds even while the shard is in transition, so the reconciler falls
//! back to them when the live read head is missing or suspect.
//!
//! The subtree is optional: a missing key or a failed fetch yields an empty map.

use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use crate::coordination::{join_key, GetOptions, KeysApi, Node};

/// Journal -> persisted read-through offset
pub type CheckpointOffsets = HashMap<String, i64>;

/// Parse a hex-encoded offset as written by consumers
pub fn parse_hex_offset(value: &str) -> Result<i64, std::num::ParseIntError> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    i64::from_str_radix(digits, 16)
}

/// Flatten an offsets subtree rooted at `root_key` into a journal -> offset map.
///
/// Directories are walked breadth-first; a leaf's key minus `root_key/` is
/// its journal name.
pub fn collect_checkpoint_offsets(root_key: &str, root: &Node) -> CheckpointOffsets {
    let prefix = format!("{}/", root_key.trim_end_matches('/'));
    let mut offsets = CheckpointOffsets::new();
    let mut frontier: VecDeque<&Node> = root.nodes.iter().collect();

    while let Some(node) = frontier.pop_front() {
        if node.dir {
            frontier.extend(node.nodes.iter());
            continue;
        }

        let journal = node.key.strip_prefix(&prefix).unwrap_or(&node.key);
        match parse_hex_offset(node.value_str()) {
            Ok(offset) => {
                offsets.insert(journal.to_string(), offset);
            }
            Err(e) => {
                warn!(key = %node.key, value = %node.value_str(), error = %e, "can't parse offset");
            }
        }
    }

    offsets
}

/// Load the persisted offsets of `consumer`, tolerating an absent subtree
pub async fn load_checkpoint_offsets(keys: &dyn KeysApi, consumer: &str) -> CheckpointOffsets {
    let key = join_key(consumer, "offsets");
    match keys.get(&key, GetOptions::recursive()).await {
        Ok(root) => collect_checkpoint_offsets(&key, &root),
        Err(e) if e.is_not_found() => {
            debug!(key = %key, "consumer has no persisted offsets");
            CheckpointOffsets::new()
        }
        Err(e) => {
            warn!(key = %key, error = %e, "failed to load persisted offsets, continuing without them");
            CheckpointOffsets::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_offset() {
        assert_eq!(parse_hex_offset("ff").unwrap(), 255);
        assert_eq!(parse_hex_offset("0x10").unwrap(), 16);
        assert_eq!(parse_hex_offset(" 3e8\n").unwrap(), 1000);
        assert!(parse_hex_offset("zz").is_err());
        assert!(parse_hex_offset("").is_err());
    }

    #[test]
    fn test_collect_nested_offsets() {
        let root = Node::directory(
            "/c/offsets",
            vec![
                Node::directory(
                    "/c/offsets/pippio-journals",
                    vec![Node::directory(
                        "/c/offsets/pippio-journals/events",
                        vec![
                            Node::leaf("/c/offsets/pippio-journals/events/part-000", "3e8", 1),
                            Node::leaf("/c/offsets/pippio-journals/events/part-001", "12c", 2),
                        ],
                    )],
                ),
                Node::leaf("/c/offsets/flat/part-000", "a", 3),
            ],
        );

        let offsets = collect_checkpoint_offsets("/c/offsets", &root);
        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets["pippio-journals/events/part-000"], 1000);
        assert_eq!(offsets["pippio-journals/events/part-001"], 300);
        assert_eq!(offsets["flat/part-000"], 10);
    }

    #[test]
    fn test_collect_skips_unparseable_values() {
        let root = Node::directory(
            "/c/offsets",
            vec![
                Node::leaf("/c/offsets/a/part-000", "not-hex", 1),
                Node::leaf("/c/offsets/a/part-001", "64", 2),
            ],
        );

        let offsets = collect_checkpoint_offsets("/c/offsets/", &root);
        assert_eq!(offsets.len(), 1);
        assert_eq!(offsets["a/part-001"], 100);
    }

    #[test]
    fn test_collect_empty_tree() {
        let root = Node::directory("/c/offsets", vec![]);
        assert!(collect_checkpoint_offsets("/c/offsets", &root).is_empty());
    }
}
