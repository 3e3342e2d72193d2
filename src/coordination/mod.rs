//! Coordination store access
//!
//! The consumer topology and persisted checkpoints live in a tree-structured
//! key/value store with etcd v2 semantics: every node has an absolute key,
//! directories carry child nodes, leaves carry a string value. [`KeysApi`] is
//! the read-only seam the rest of the crate depends on; [`EtcdKeysClient`] is
//! the HTTP implementation.

pub mod etcd;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use etcd::EtcdKeysClient;

/// Listing options for a `get`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Return the whole subtree rather than one level
    pub recursive: bool,
    /// Sort children lexically by key
    pub sorted: bool,
}

impl GetOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            sorted: false,
        }
    }

    pub fn recursive_sorted() -> Self {
        Self {
            recursive: true,
            sorted: true,
        }
    }
}

/// A node of the coordination store tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Absolute key, always starting with `/`
    pub key: String,
    #[serde(default)]
    pub dir: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub created_index: u64,
    #[serde(default)]
    pub modified_index: u64,
}

impl Node {
    /// Build a leaf node
    pub fn leaf(key: impl Into<String>, value: impl Into<String>, created_index: u64) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            created_index,
            modified_index: created_index,
            ..Default::default()
        }
    }

    /// Build a directory node
    pub fn directory(key: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            key: key.into(),
            dir: true,
            nodes,
            ..Default::default()
        }
    }

    /// Last path segment of the key
    pub fn base_name(&self) -> &str {
        base_name(&self.key)
    }

    /// Leaf value, or the empty string for directories
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Read-only access to the coordination store
#[async_trait]
pub trait KeysApi: Send + Sync {
    /// Fetch the node at `key`; `StoreError::KeyNotFound` if absent
    async fn get(&self, key: &str, options: GetOptions) -> Result<Node, StoreError>;
}

/// Normalize a key to the store's absolute form (`/a/b`, no trailing slash)
pub fn normalize_key(key: &str) -> String {
    let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Join a child segment onto a key
pub fn join_key(parent: &str, child: &str) -> String {
    let parent = normalize_key(parent);
    let child = child.trim_matches('/');
    if parent == "/" {
        format!("/{}", child)
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Last path segment of a key
pub fn base_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("consumers/foo/"), "/consumers/foo");
        assert_eq!(normalize_key("//consumers//foo"), "/consumers/foo");
        assert_eq!(normalize_key("/"), "/");
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("/consumers/foo", "items"), "/consumers/foo/items");
        assert_eq!(join_key("consumers/foo/", "/offsets"), "/consumers/foo/offsets");
        assert_eq!(join_key("/", "items"), "/items");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/consumers/foo/items"), "items");
        assert_eq!(base_name("/consumers/foo/"), "foo");
        assert_eq!(base_name("plain"), "plain");
    }

    #[test]
    fn test_node_deserialize_etcd_shape() {
        let json = r#"{
            "key": "/c/items",
            "dir": true,
            "nodes": [
                {"key": "/c/items/0-t-0", "dir": true, "nodes": [
                    {"key": "/c/items/0-t-0/10.0.0.1:8080", "value": "ready", "createdIndex": 7, "modifiedIndex": 9}
                ], "createdIndex": 3}
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(node.dir);
        assert_eq!(node.nodes.len(), 1);
        let entry = &node.nodes[0].nodes[0];
        assert_eq!(entry.value_str(), "ready");
        assert_eq!(entry.created_index, 7);
        assert_eq!(entry.base_name(), "10.0.0.1:8080");
    }
}
