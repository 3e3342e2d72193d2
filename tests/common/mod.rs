//! Shared test fixtures for shardlag integration tests
//!
//! Spins up in-process fakes of the three services a lag pass talks to:
//!
//! - an etcd v2 keys API (`GET /v2/keys/{key}`)
//! - a broker answering `HEAD /{journal}` with `X-Write-Head`
//! - a member debug endpoint (`GET /debug/vars`)
//!
//! All three bind `127.0.0.1:0`. Members registered in the fake store must use
//! host `127.0.0.1` so their read heads resolve to the fake debug endpoint.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use shardlag::client::{build_http_client, BrokerClient, DebugVarsClient};
use shardlag::coordination::{EtcdKeysClient, Node};
use shardlag::consumer::{LagPass, PassConfig};

// ============================================================================
// Fake etcd v2 keys tree
// ============================================================================

/// Flat key space; directories are implied by leaf paths or created explicitly
#[derive(Debug, Default)]
pub struct EtcdTree {
    leaves: BTreeMap<String, (String, u64)>,
    dirs: BTreeSet<String>,
    next_index: u64,
}

impl EtcdTree {
    /// Set a leaf; every set gets the next created index
    pub fn set(&mut self, key: &str, value: &str) {
        self.next_index += 1;
        self.leaves
            .insert(key.to_string(), (value.to_string(), self.next_index));
    }

    /// Create an empty directory
    pub fn mkdir(&mut self, key: &str) {
        self.dirs.insert(key.to_string());
    }

    fn children(&self, key: &str) -> BTreeSet<String> {
        let prefix = format!("{}/", key.trim_end_matches('/'));
        self.leaves
            .keys()
            .chain(self.dirs.iter())
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|segment| !segment.is_empty())
            .map(|segment| format!("{}{}", prefix, segment))
            .collect()
    }

    /// The node at `key`, listing one level or the whole subtree
    pub fn node(&self, key: &str, recursive: bool) -> Option<Node> {
        if let Some((value, index)) = self.leaves.get(key) {
            return Some(Node::leaf(key, value.as_str(), *index));
        }

        let children = self.children(key);
        if children.is_empty() && !self.dirs.contains(key) {
            return None;
        }

        let nodes = children
            .iter()
            .filter_map(|child| {
                if self.leaves.contains_key(child) || recursive {
                    self.node(child, recursive)
                } else {
                    Some(Node::directory(child.as_str(), vec![]))
                }
            })
            .collect();
        Some(Node::directory(key, nodes))
    }
}

async fn etcd_get(
    State(tree): State<Arc<Mutex<EtcdTree>>>,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let key = format!("/{}", key.trim_end_matches('/'));
    let recursive = params.get("recursive").map(|v| v == "true").unwrap_or(false);

    let node = tree.lock().unwrap().node(&key, recursive);
    match node {
        Some(node) => Json(serde_json::json!({ "action": "get", "node": node })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "errorCode": 100,
                "message": "Key not found",
                "cause": key,
                "index": 1
            })),
        )
            .into_response(),
    }
}

// ============================================================================
// Fake broker and member debug endpoint
// ============================================================================

async fn broker_head(
    State(heads): State<Arc<Mutex<HashMap<String, i64>>>>,
    Path(journal): Path<String>,
) -> Response {
    match heads.lock().unwrap().get(&journal) {
        Some(head) => (StatusCode::OK, [("X-Write-Head", head.to_string())]).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Clone, Default)]
struct DebugState {
    readers: Arc<Mutex<HashMap<String, i64>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

async fn debug_vars(State(state): State<DebugState>) -> Response {
    let delay = *state.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let readers: serde_json::Map<String, serde_json::Value> = state
        .readers
        .lock()
        .unwrap()
        .iter()
        .map(|(journal, head)| {
            (
                journal.clone(),
                serde_json::json!({ "bytes": head, "head": head }),
            )
        })
        .collect();
    Json(serde_json::json!({
        "cmdline": ["consumer"],
        "gazette": { "readers": readers }
    }))
    .into_response()
}

async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

// ============================================================================
// Fake cluster
// ============================================================================

/// The three fake services plus handles to mutate their state
pub struct FakeCluster {
    pub etcd_addr: SocketAddr,
    pub broker_addr: SocketAddr,
    pub debug_addr: SocketAddr,
    pub etcd: Arc<Mutex<EtcdTree>>,
    pub write_heads: Arc<Mutex<HashMap<String, i64>>>,
    debug: DebugState,
}

impl FakeCluster {
    pub async fn start() -> Self {
        let etcd = Arc::new(Mutex::new(EtcdTree::default()));
        let write_heads = Arc::new(Mutex::new(HashMap::new()));
        let debug = DebugState::default();

        let etcd_addr = spawn_router(
            Router::new()
                .route("/v2/keys/{*key}", get(etcd_get))
                .with_state(Arc::clone(&etcd)),
        )
        .await;
        let broker_addr = spawn_router(
            Router::new()
                .route("/{*journal}", get(broker_head))
                .with_state(Arc::clone(&write_heads)),
        )
        .await;
        let debug_addr = spawn_router(
            Router::new()
                .route("/debug/vars", get(debug_vars))
                .with_state(debug.clone()),
        )
        .await;

        Self {
            etcd_addr,
            broker_addr,
            debug_addr,
            etcd,
            write_heads,
            debug,
        }
    }

    pub fn etcd_endpoint(&self) -> String {
        format!("http://{}", self.etcd_addr)
    }

    pub fn broker_endpoint(&self) -> String {
        format!("http://{}", self.broker_addr)
    }

    pub fn debug_port(&self) -> u16 {
        self.debug_addr.port()
    }

    pub fn set_key(&self, key: &str, value: &str) {
        self.etcd.lock().unwrap().set(key, value);
    }

    pub fn mkdir(&self, key: &str) {
        self.etcd.lock().unwrap().mkdir(key);
    }

    pub fn set_write_head(&self, journal: &str, head: i64) {
        self.write_heads
            .lock()
            .unwrap()
            .insert(journal.to_string(), head);
    }

    pub fn set_reader(&self, journal: &str, head: i64) {
        self.debug
            .readers
            .lock()
            .unwrap()
            .insert(journal.to_string(), head);
    }

    /// Delay every debug vars answer
    pub fn set_debug_delay(&self, delay: Duration) {
        *self.debug.delay.lock().unwrap() = Some(delay);
    }

    /// A pass wired to the fakes over real HTTP
    pub fn lag_pass(&self, journal_root: &str, pass_timeout: Duration) -> LagPass {
        let http = build_http_client(Duration::from_secs(5)).unwrap();
        LagPass::new(
            Arc::new(EtcdKeysClient::new(self.etcd_endpoint(), http.clone())),
            Arc::new(BrokerClient::new(self.broker_endpoint(), http.clone())),
            Arc::new(DebugVarsClient::new(self.debug_port(), http)),
            PassConfig {
                journal_root: journal_root.to_string(),
                pass_timeout,
            },
        )
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const CONSUMER: &str = "/gazette/consumers/indexer";
pub const JOURNAL_ROOT: &str = "pippio-journals";
/// Primary of most shards; sorts after `MEMBER_B` so only creation order
/// makes it the primary of shard 0
pub const MEMBER_A: &str = "127.0.0.1:7009";
pub const MEMBER_B: &str = "127.0.0.1:7002";
pub const BAD_MEMBER: &str = "not-a-host-port";

pub fn journal(partition: &str) -> String {
    format!("{}/events/part-{}", JOURNAL_ROOT, partition)
}

/// Populate one consumer covering every journal state:
///
/// | journal | primary    | write | reader | checkpoint | expected          |
/// |---------|------------|-------|--------|------------|-------------------|
/// | 000     | A (B stby) | 1000  | 400    | -          | OK, 600           |
/// | 001     | A          | 1000  | -      | 300        | NotReading, 700   |
/// | 002     | bad id     | 500   | -      | -          | Unavailable       |
/// | 003     | A recov.   | 1000  | 10     | 900        | Recovering, 100   |
/// | 004     | B          | 500   | 700    | 750        | EtcdAhead, 0      |
/// | 005     | none       | 100   | -      | -          | Unavailable       |
pub fn populate_indexer(cluster: &FakeCluster) {
    let items = format!("{}/items", CONSUMER);

    cluster.set_key(&format!("{}/0000000000-events-000/{}", items, MEMBER_A), "ready");
    cluster.set_key(&format!("{}/0000000000-events-000/{}", items, MEMBER_B), "ready");
    cluster.set_key(&format!("{}/0000000001-events-001/{}", items, MEMBER_A), "ready");
    cluster.set_key(&format!("{}/0000000002-events-002/{}", items, BAD_MEMBER), "ready");
    cluster.set_key(&format!("{}/0000000003-events-003/{}", items, MEMBER_A), "recovering");
    cluster.set_key(&format!("{}/0000000004-events-004/{}", items, MEMBER_B), "ready");
    cluster.mkdir(&format!("{}/0000000005-events-005", items));

    let offsets = format!("{}/offsets", CONSUMER);
    cluster.set_key(&format!("{}/{}", offsets, journal("001")), "12c");
    cluster.set_key(&format!("{}/{}", offsets, journal("003")), "384");
    cluster.set_key(&format!("{}/{}", offsets, journal("004")), "2ee");

    cluster.set_write_head(&journal("000"), 1000);
    cluster.set_write_head(&journal("001"), 1000);
    cluster.set_write_head(&journal("002"), 500);
    cluster.set_write_head(&journal("003"), 1000);
    cluster.set_write_head(&journal("004"), 500);
    cluster.set_write_head(&journal("005"), 100);

    cluster.set_reader(&journal("000"), 400);
    cluster.set_reader(&journal("003"), 10);
    cluster.set_reader(&journal("004"), 700);
}
