//! Shard topology resolution
//!
//! A consumer group keeps one directory per shard under `<group>/items`.
//! The item's base key encodes the journal the shard reads
//! (`<index>-<topic>-<partition>`), and its children are the members holding
//! the shard, each child's value being that member's lifecycle state:
//!
//! ```text
//! /consumers/word-count/items/
//!   0000000003-mytopic-00000002/
//!     10.0.1.4:8080   = "ready"        <- oldest entry, primary
//!     10.0.1.9:8080   = "recovering"   <- standby
//! ```
//!
//! Entries are ordered by creation index, so the longest-standing holder is the
//! primary. Only primaries are polled for read heads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, warn};

use crate::coordination::{base_name, join_key, GetOptions, KeysApi, Node};
use crate::error::Result;

/// Self-reported lifecycle state of a shard replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaState {
    Ready,
    Recovering,
    /// Any state string this tool does not interpret
    Other(String),
}

impl ReplicaState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "ready" => ReplicaState::Ready,
            "recovering" => ReplicaState::Recovering,
            other => ReplicaState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReplicaState::Ready => "ready",
            ReplicaState::Recovering => "recovering",
            ReplicaState::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a replica within its shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaRole {
    Primary,
    Standby,
}

/// One member holding a shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    /// Member id, normally `host:port`
    pub member: String,
    pub role: ReplicaRole,
    pub state: ReplicaState,
}

/// A shard item and the members holding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRoute {
    pub item_key: String,
    pub journal: String,
    /// Replicas in creation order; index 0 is the primary
    pub replicas: Vec<Replica>,
    /// Host of the primary's debug endpoint, if the member id parsed
    pub read_host: Option<String>,
}

impl ShardRoute {
    pub fn primary(&self) -> Option<&Replica> {
        self.replicas.first()
    }
}

/// Per-member shard accounting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Shards this member holds as primary
    pub masters: usize,
    /// Shards this member holds as standby
    pub replicas: usize,
    /// Lifecycle state per journal
    pub states: BTreeMap<String, ReplicaState>,
}

/// Shard topology of one consumer group at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerTopology {
    pub consumer: String,
    pub shards: Vec<ShardRoute>,
    pub members: BTreeMap<String, MemberInfo>,
    /// Journal -> primary member id
    pub owners: BTreeMap<String, String>,
}

impl ConsumerTopology {
    /// Every journal of the group, in item order
    pub fn journals(&self) -> impl Iterator<Item = &str> {
        self.shards.iter().map(|s| s.journal.as_str())
    }

    pub fn owner(&self, journal: &str) -> Option<&str> {
        self.owners.get(journal).map(String::as_str)
    }

    /// Lifecycle state `member` reported for `journal`
    pub fn member_state(&self, member: &str, journal: &str) -> Option<&ReplicaState> {
        self.members.get(member).and_then(|m| m.states.get(journal))
    }

    /// `(journal, host)` pairs whose primary can be polled for a read head
    pub fn read_targets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.shards
            .iter()
            .filter_map(|s| s.read_host.as_deref().map(|h| (s.journal.as_str(), h)))
    }
}

/// Derive the journal name from a shard item key.
///
/// The base key is `<index>-<topic>-<partition>`; the topic may itself contain
/// dashes. The partition suffix is kept verbatim. Returns `None` for keys with
/// fewer than three segments.
pub fn derive_journal_name(item_key: &str, journal_root: &str) -> Option<String> {
    let parts: Vec<&str> = base_name(item_key).split('-').collect();
    if parts.len() < 3 {
        return None;
    }
    let topic = parts[1..parts.len() - 1].join("-");
    let partition = parts[parts.len() - 1];
    if topic.is_empty() || partition.is_empty() {
        return None;
    }

    let root = journal_root.trim_matches('/');
    if root.is_empty() {
        Some(format!("{}/part-{}", topic, partition))
    } else {
        Some(format!("{}/{}/part-{}", root, topic, partition))
    }
}

/// Split a `host:port` member id, returning the host.
///
/// Accepts bracketed IPv6 (`[::1]:8080`). The port must be numeric.
pub fn member_host(member: &str) -> std::result::Result<&str, String> {
    let (host, port) = if let Some(rest) = member.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| "missing ']' in address".to_string())?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| "missing port in address".to_string())?;
        (host, port)
    } else {
        let (host, port) = member
            .rsplit_once(':')
            .ok_or_else(|| "missing port in address".to_string())?;
        if host.contains(':') {
            return Err("too many colons in address".to_string());
        }
        (host, port)
    };

    if host.is_empty() {
        return Err("missing host in address".to_string());
    }
    port.parse::<u16>()
        .map_err(|e| format!("invalid port {:?}: {}", port, e))?;
    Ok(host)
}

/// Build a [`ConsumerTopology`] from a recursive listing of `<group>/items`
pub fn resolve_topology(consumer: &str, items: &Node, journal_root: &str) -> ConsumerTopology {
    let mut topology = ConsumerTopology {
        consumer: consumer.to_string(),
        ..Default::default()
    };

    for item in &items.nodes {
        let Some(journal) = derive_journal_name(&item.key, journal_root) else {
            warn!(item = %item.key, "item key does not encode a journal, skipping");
            continue;
        };

        let mut entries: Vec<&Node> = item.nodes.iter().filter(|n| !n.dir).collect();
        entries.sort_by_key(|n| n.created_index);

        let mut route = ShardRoute {
            item_key: item.key.clone(),
            journal: journal.clone(),
            replicas: Vec::with_capacity(entries.len()),
            read_host: None,
        };

        if entries.is_empty() {
            warn!(item = %item.key, "no master for item");
            topology.shards.push(route);
            continue;
        }

        let item_prefix = format!("{}/", item.key.trim_end_matches('/'));
        for (i, entry) in entries.iter().enumerate() {
            let member_id = entry
                .key
                .strip_prefix(&item_prefix)
                .unwrap_or_else(|| entry.base_name())
                .to_string();
            let state = ReplicaState::parse(entry.value_str());

            let info = topology.members.entry(member_id.clone()).or_default();
            info.states.insert(journal.clone(), state.clone());

            let role = if i == 0 {
                info.masters += 1;
                topology.owners.insert(journal.clone(), member_id.clone());
                match member_host(&member_id) {
                    Ok(host) => route.read_host = Some(host.to_string()),
                    Err(e) => {
                        error!(master = %member_id, error = %e, "route replica name is not a host/port pair");
                    }
                }
                ReplicaRole::Primary
            } else {
                info.replicas += 1;
                ReplicaRole::Standby
            };

            route.replicas.push(Replica {
                member: member_id,
                role,
                state,
            });
        }

        topology.shards.push(route);
    }

    topology
}

/// Load and resolve the topology of `consumer`.
///
/// Failure to list `<consumer>/items` is fatal for the pass.
pub async fn load_topology(
    keys: &dyn KeysApi,
    consumer: &str,
    journal_root: &str,
) -> Result<ConsumerTopology> {
    let key = join_key(consumer, "items");
    let items = keys.get(&key, GetOptions::recursive_sorted()).await?;
    Ok(resolve_topology(consumer, &items, journal_root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, entries: &[(&str, &str, u64)]) -> Node {
        Node::directory(
            key,
            entries
                .iter()
                .map(|(member, state, idx)| Node::leaf(format!("{}/{}", key, member), *state, *idx))
                .collect(),
        )
    }

    #[test]
    fn test_derive_journal_name_keeps_partition_verbatim() {
        assert_eq!(
            derive_journal_name("/c/items/0000000003-mytopic-00000002", "").as_deref(),
            Some("mytopic/part-00000002")
        );
        assert_eq!(
            derive_journal_name("/c/items/0000000003-mytopic-00000002", "pippio-journals").as_deref(),
            Some("pippio-journals/mytopic/part-00000002")
        );
    }

    #[test]
    fn test_derive_journal_name_dashed_topic() {
        assert_eq!(
            derive_journal_name("0000000001-word-count-deltas-007", "/root/").as_deref(),
            Some("root/word-count-deltas/part-007")
        );
    }

    #[test]
    fn test_derive_journal_name_malformed() {
        assert_eq!(derive_journal_name("/c/items/0000000001-007", ""), None);
        assert_eq!(derive_journal_name("/c/items/orphan", ""), None);
        assert_eq!(derive_journal_name("/c/items/1--007", ""), None);
    }

    #[test]
    fn test_member_host() {
        assert_eq!(member_host("10.0.0.1:8080"), Ok("10.0.0.1"));
        assert_eq!(member_host("worker-3.svc:8080"), Ok("worker-3.svc"));
        assert_eq!(member_host("[::1]:8080"), Ok("::1"));
        assert!(member_host("10.0.0.1").is_err());
        assert!(member_host("::1:8080").is_err());
        assert!(member_host(":8080").is_err());
        assert!(member_host("host:port").is_err());
    }

    #[test]
    fn test_resolve_primary_and_standbys() {
        let items = Node::directory(
            "/c/items",
            vec![item(
                "/c/items/0000000000-events-000",
                &[("10.0.0.2:8080", "recovering", 20), ("10.0.0.1:8080", "ready", 10)],
            )],
        );

        let topology = resolve_topology("/c", &items, "");
        assert_eq!(topology.shards.len(), 1);

        let shard = &topology.shards[0];
        assert_eq!(shard.journal, "events/part-000");
        assert_eq!(shard.primary().unwrap().member, "10.0.0.1:8080");
        assert_eq!(shard.replicas[1].role, ReplicaRole::Standby);
        assert_eq!(shard.read_host.as_deref(), Some("10.0.0.1"));

        assert_eq!(topology.owner("events/part-000"), Some("10.0.0.1:8080"));
        assert_eq!(topology.members["10.0.0.1:8080"].masters, 1);
        assert_eq!(topology.members["10.0.0.2:8080"].replicas, 1);
        assert_eq!(
            topology.member_state("10.0.0.2:8080", "events/part-000"),
            Some(&ReplicaState::Recovering)
        );
    }

    #[test]
    fn test_resolve_item_without_entries() {
        let items = Node::directory(
            "/c/items",
            vec![
                item("/c/items/0000000000-events-000", &[]),
                item("/c/items/0000000001-events-001", &[("10.0.0.1:8080", "ready", 1)]),
            ],
        );

        let topology = resolve_topology("/c", &items, "");
        let journals: Vec<&str> = topology.journals().collect();
        assert_eq!(journals, vec!["events/part-000", "events/part-001"]);
        assert_eq!(topology.owner("events/part-000"), None);
        assert!(topology.shards[0].replicas.is_empty());
        assert_eq!(topology.read_targets().count(), 1);
    }

    #[test]
    fn test_resolve_unparseable_member_still_counted() {
        let items = Node::directory(
            "/c/items",
            vec![item("/c/items/0000000000-events-000", &[("member-a", "ready", 1)])],
        );

        let topology = resolve_topology("/c", &items, "");
        assert_eq!(topology.members["member-a"].masters, 1);
        assert_eq!(topology.owner("events/part-000"), Some("member-a"));
        assert_eq!(topology.shards[0].read_host, None);
        assert_eq!(topology.read_targets().count(), 0);
    }

    #[test]
    fn test_resolve_skips_malformed_item() {
        let items = Node::directory(
            "/c/items",
            vec![item("/c/items/garbage", &[("10.0.0.1:8080", "ready", 1)])],
        );
        let topology = resolve_topology("/c", &items, "");
        assert!(topology.shards.is_empty());
        assert!(topology.members.is_empty());
    }

    #[test]
    fn test_replica_state_parse() {
        assert_eq!(ReplicaState::parse("ready"), ReplicaState::Ready);
        assert_eq!(ReplicaState::parse("recovering"), ReplicaState::Recovering);
        assert_eq!(
            ReplicaState::parse("primary"),
            ReplicaState::Other("primary".to_string())
        );
        assert_eq!(ReplicaState::parse("primary").to_string(), "primary");
    }
}
