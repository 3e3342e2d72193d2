//! Lag reconciliation
//!
//! Combines write heads, live read heads, persisted checkpoint offsets and
//! replica lifecycle states into one classified lag value per journal, then
//! aggregates lag per primary member.
//!
//! Classification, first match wins:
//!
//! | Condition                                 | State        | Effective read head |
//! |-------------------------------------------|--------------|---------------------|
//! | write head or read head unknown           | `Unavailable`| none                |
//! | owner reports `recovering`                | `Recovering` | checkpoint          |
//! | owner answered but is not reading         | `NotReading` | checkpoint          |
//! | live read head below checkpoint           | `EtcdAhead`  | checkpoint          |
//! | otherwise                                 | `Ok`         | live read head      |
//!
//! Lag is `write_head - effective`, clamped at zero. Clamping never changes
//! the state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::client::ReadHead;
use crate::consumer::heads::HeadSnapshot;
use crate::consumer::offsets::CheckpointOffsets;
use crate::consumer::topology::{ConsumerTopology, ReplicaState};

/// Operational state of a journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JournalState {
    Ok,
    Recovering,
    NotReading,
    EtcdAhead,
    Unavailable,
}

impl JournalState {
    pub const ALL: [JournalState; 5] = [
        JournalState::Ok,
        JournalState::Recovering,
        JournalState::NotReading,
        JournalState::EtcdAhead,
        JournalState::Unavailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JournalState::Ok => "OK",
            JournalState::Recovering => "Recovering",
            JournalState::NotReading => "NotReading",
            JournalState::EtcdAhead => "EtcdAhead",
            JournalState::Unavailable => "Unavailable",
        }
    }
}

impl fmt::Display for JournalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified lag of one journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLag {
    pub journal: String,
    /// Primary member, if the shard has one
    pub owner: Option<String>,
    pub state: JournalState,
    /// Bytes behind the write head; `None` when unavailable
    pub lag: Option<u64>,
    pub write_head: Option<i64>,
    /// Read head the lag was computed against
    pub effective_read_head: Option<i64>,
}

/// Aggregated lag of one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLag {
    pub member: String,
    pub masters: usize,
    pub replicas: usize,
    /// Sum of numeric lags over journals this member is primary for
    pub total_lag: u64,
    /// At least one owned journal was unavailable, so `total_lag` is a lower bound
    pub incomplete: bool,
}

/// Lag report of one consumer group for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerLag {
    pub consumer: String,
    /// Sorted by journal name
    pub journals: Vec<JournalLag>,
    /// Sorted by member id
    pub members: Vec<MemberLag>,
}

impl ConsumerLag {
    /// Sum of all numeric journal lags
    pub fn total_lag(&self) -> u64 {
        self.journals.iter().filter_map(|j| j.lag).sum()
    }

    pub fn has_members(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn journal(&self, name: &str) -> Option<&JournalLag> {
        self.journals.iter().find(|j| j.journal == name)
    }

    pub fn member(&self, id: &str) -> Option<&MemberLag> {
        self.members.iter().find(|m| m.member == id)
    }

    pub fn stats(&self) -> LagStats {
        LagStats::from_journals(&self.journals)
    }
}

/// Lag statistics for aggregated reporting
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LagStats {
    /// Maximum lag across journals with a known lag
    pub max_lag: u64,
    /// Minimum lag across journals with a known lag
    pub min_lag: u64,
    /// Average lag across journals with a known lag
    pub avg_lag: f64,
    pub total_lag: u64,
    /// Journals with a known lag
    pub journal_count: usize,
    /// Journals with non-zero lag
    pub lagging_journals: usize,
    /// Journals whose lag is unavailable
    pub unavailable_journals: usize,
}

impl LagStats {
    pub fn from_journals(journals: &[JournalLag]) -> Self {
        let lags: Vec<u64> = journals.iter().filter_map(|j| j.lag).collect();
        let unavailable_journals = journals.len() - lags.len();
        if lags.is_empty() {
            return Self {
                unavailable_journals,
                ..Self::default()
            };
        }

        let total_lag: u64 = lags.iter().sum();
        Self {
            max_lag: lags.iter().copied().max().unwrap_or(0),
            min_lag: lags.iter().copied().min().unwrap_or(0),
            avg_lag: total_lag as f64 / lags.len() as f64,
            total_lag,
            journal_count: lags.len(),
            lagging_journals: lags.iter().filter(|l| **l > 0).count(),
            unavailable_journals,
        }
    }
}

/// Outcome of classifying one journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub state: JournalState,
    pub effective_read_head: Option<i64>,
    pub lag: Option<u64>,
}

/// Lag of `write_head` over `read_head`, clamped at zero
pub fn clamp_lag(write_head: i64, read_head: i64) -> u64 {
    let delta = i128::from(write_head) - i128::from(read_head);
    u64::try_from(delta.max(0)).unwrap_or(u64::MAX)
}

/// Classify one journal. A missing checkpoint counts as offset 0.
pub fn classify(
    write_head: Option<i64>,
    read_head: Option<ReadHead>,
    owner_state: Option<&ReplicaState>,
    checkpoint: Option<i64>,
) -> Classification {
    let unavailable = Classification {
        state: JournalState::Unavailable,
        effective_read_head: None,
        lag: None,
    };
    let (Some(write_head), Some(read_head)) = (write_head, read_head) else {
        return unavailable;
    };
    let checkpoint = checkpoint.unwrap_or(0);

    let (state, effective) = match (owner_state, read_head) {
        (Some(ReplicaState::Recovering), _) => (JournalState::Recovering, checkpoint),
        (_, ReadHead::NotReading) => (JournalState::NotReading, checkpoint),
        (_, ReadHead::Offset(live)) if live < checkpoint => (JournalState::EtcdAhead, checkpoint),
        (_, ReadHead::Offset(live)) => (JournalState::Ok, live),
    };

    Classification {
        state,
        effective_read_head: Some(effective),
        lag: Some(clamp_lag(write_head, effective)),
    }
}

/// Reconcile one pass into a [`ConsumerLag`].
///
/// Runs after every fetch task has finished; the fold is single-threaded.
pub fn reconcile(
    topology: &ConsumerTopology,
    heads: &HeadSnapshot,
    checkpoints: &CheckpointOffsets,
) -> ConsumerLag {
    let mut members: BTreeMap<&str, MemberLag> = topology
        .members
        .iter()
        .map(|(id, info)| {
            (
                id.as_str(),
                MemberLag {
                    member: id.clone(),
                    masters: info.masters,
                    replicas: info.replicas,
                    total_lag: 0,
                    incomplete: false,
                },
            )
        })
        .collect();

    let mut journals: Vec<JournalLag> = Vec::with_capacity(topology.shards.len());
    for journal in topology.journals() {
        let owner = topology.owner(journal);
        let owner_state = owner.and_then(|o| topology.member_state(o, journal));
        let outcome = classify(
            heads.write_heads.get(journal).copied(),
            heads.read_heads.get(journal).copied(),
            owner_state,
            checkpoints.get(journal).copied(),
        );

        if let Some(member) = owner.and_then(|o| members.get_mut(o)) {
            match outcome.lag {
                Some(lag) => member.total_lag = member.total_lag.saturating_add(lag),
                None => member.incomplete = true,
            }
        }

        journals.push(JournalLag {
            journal: journal.to_string(),
            owner: owner.map(str::to_string),
            state: outcome.state,
            lag: outcome.lag,
            write_head: heads.write_heads.get(journal).copied(),
            effective_read_head: outcome.effective_read_head,
        });
    }
    journals.sort_by(|a, b| a.journal.cmp(&b.journal));

    ConsumerLag {
        consumer: topology.consumer.clone(),
        journals,
        members: members.into_values().collect(),
    }
}
