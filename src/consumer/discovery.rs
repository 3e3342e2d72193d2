//! Consumer root discovery
//!
//! A configured prefix is either a consumer root (it has an `items` or
//! `members` child) or a directory of further prefixes. Non-root prefixes are
//! expanded one level and their children scanned in turn.

use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::coordination::{normalize_key, GetOptions, KeysApi};
use crate::error::Result;

/// Child names that mark a consumer root
const CONSUMER_MARKERS: &[&str] = &["items", "members"];

/// Expand `prefixes` into the consumer roots beneath them.
///
/// A prefix that cannot be listed is fatal.
pub async fn expand_prefixes(keys: &dyn KeysApi, prefixes: &[String]) -> Result<Vec<String>> {
    let mut consumers = Vec::new();
    let mut seen = HashSet::new();
    let mut pending: VecDeque<String> = prefixes.iter().map(|p| normalize_key(p)).collect();

    while let Some(prefix) = pending.pop_front() {
        if !seen.insert(prefix.clone()) {
            continue;
        }

        let node = keys.get(&prefix, GetOptions::default()).await?;
        let is_consumer = node
            .nodes
            .iter()
            .any(|child| CONSUMER_MARKERS.contains(&child.base_name()));

        if is_consumer {
            debug!(consumer = %prefix, "Found consumer root");
            consumers.push(prefix);
        } else {
            pending.extend(
                node.nodes
                    .iter()
                    .filter(|child| child.dir)
                    .map(|child| normalize_key(&child.key)),
            );
        }
    }

    Ok(consumers)
}
