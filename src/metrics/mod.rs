//! Prometheus metrics for lag reporting
//!
//! When the `metrics` feature is disabled, all recording functions become
//! no-ops with the same signatures.

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
#[cfg(feature = "metrics")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "metrics")]
use metrics_util::MetricKindMask;
#[cfg(feature = "metrics")]
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::consumer::ConsumerLag;
#[cfg(feature = "metrics")]
use crate::consumer::JournalState;

#[cfg(feature = "metrics")]
static METRICS_INITIALIZED: OnceLock<Arc<PrometheusHandle>> = OnceLock::new();

// ============================================================================
// Prometheus Handle (feature-gated)
// ============================================================================

/// How long a gauge may go without an update before it is dropped from the
/// exposition. Covers one full tick plus a pass running up to its deadline,
/// with a tick of slack.
pub fn gauge_idle_timeout(interval: Duration, pass_timeout: Duration) -> Duration {
    interval * 2 + pass_timeout
}

/// Recorder builder shared by the installed recorder and local ones.
///
/// Gauges not refreshed within `gauge_idle` disappear, so a journal whose lag
/// turned unknown or a consumer that lost its members stops exporting its last
/// value. Counters and histograms never expire.
#[cfg(feature = "metrics")]
pub fn prometheus_builder(gauge_idle: Option<Duration>) -> PrometheusBuilder {
    PrometheusBuilder::new().idle_timeout(MetricKindMask::GAUGE, gauge_idle)
}

/// Initialize metrics and return Prometheus handle
///
/// Note: This function can only be called once per process due to the global
/// nature of the metrics recorder. In tests, the first call wins.
#[cfg(feature = "metrics")]
pub fn init_metrics(gauge_idle: Option<Duration>) -> PrometheusHandle {
    if let Some(handle) = METRICS_INITIALIZED.get() {
        return (**handle).clone();
    }

    match prometheus_builder(gauge_idle).install_recorder() {
        Ok(handle) => {
            register_metrics();
            let _ = METRICS_INITIALIZED.set(Arc::new(handle.clone()));
            handle
        }
        Err(_) => {
            if let Some(handle) = METRICS_INITIALIZED.get() {
                return (**handle).clone();
            }
            // A recorder was installed elsewhere; this handle renders nothing
            // but keeps the endpoint serving.
            PrometheusBuilder::new().build_recorder().handle()
        }
    }
}

#[cfg(feature = "metrics")]
fn register_metrics() {
    describe_gauge!(
        "shardlag_consumer_lag",
        "Total lag of a consumer across journals with a known lag"
    );
    describe_gauge!(
        "shardlag_journal_lag",
        "Lag of one journal; absent while the lag is unknown"
    );
    describe_gauge!(
        "shardlag_journal_state",
        "1 for the classified state of a journal, 0 for every other state"
    );
    describe_gauge!(
        "shardlag_member_lag",
        "Total lag of the journals a member owns as primary"
    );
    describe_gauge!(
        "shardlag_member_lag_incomplete",
        "1 when the member total is a lower bound because an owned journal was unavailable"
    );
    describe_gauge!(
        "shardlag_consumer_members",
        "Number of members resolved for a consumer"
    );
    describe_counter!(
        "shardlag_fetch_errors_total",
        "Head fetches that failed or did not answer before the pass deadline"
    );
    describe_histogram!(
        "shardlag_pass_duration_seconds",
        "Duration of one lag pass in seconds"
    );
}

/// Count one failed head fetch of `kind` (`write_head` / `read_head`)
#[cfg(feature = "metrics")]
pub fn record_fetch_error(kind: &str) {
    counter!("shardlag_fetch_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Record how long a pass took
#[cfg(feature = "metrics")]
pub fn record_pass_duration(duration: Duration) {
    histogram!("shardlag_pass_duration_seconds").record(duration.as_secs_f64());
}

/// Publish the gauges of one consumer.
///
/// A consumer without resolvable members publishes nothing. Journals with an
/// unknown lag publish only their state. Series left out here expire through
/// the gauge idle timeout.
#[cfg(feature = "metrics")]
pub fn record_consumer_lag(lag: &ConsumerLag) {
    if !lag.has_members() {
        tracing::debug!(consumer = %lag.consumer, "No members resolved, skipping gauges");
        return;
    }

    gauge!("shardlag_consumer_lag", "consumer" => lag.consumer.clone())
        .set(lag.total_lag() as f64);
    gauge!("shardlag_consumer_members", "consumer" => lag.consumer.clone())
        .set(lag.members.len() as f64);

    for journal in &lag.journals {
        if let Some(value) = journal.lag {
            gauge!(
                "shardlag_journal_lag",
                "consumer" => lag.consumer.clone(),
                "journal" => journal.journal.clone()
            )
            .set(value as f64);
        }
        for state in JournalState::ALL {
            gauge!(
                "shardlag_journal_state",
                "consumer" => lag.consumer.clone(),
                "journal" => journal.journal.clone(),
                "state" => state.as_str()
            )
            .set(if state == journal.state { 1.0 } else { 0.0 });
        }
    }

    for member in &lag.members {
        gauge!(
            "shardlag_member_lag",
            "consumer" => lag.consumer.clone(),
            "member" => member.member.clone()
        )
        .set(member.total_lag as f64);
        gauge!(
            "shardlag_member_lag_incomplete",
            "consumer" => lag.consumer.clone(),
            "member" => member.member.clone()
        )
        .set(if member.incomplete { 1.0 } else { 0.0 });
    }
}

// ============================================================================
// No-op implementations when metrics feature is disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fetch_error(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_pass_duration(_duration: Duration) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_consumer_lag(_lag: &ConsumerLag) {}

// ============================================================================
// Tests (only with metrics feature)
// ============================================================================

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use crate::consumer::{JournalLag, MemberLag};
    use metrics_exporter_prometheus::PrometheusRecorder;

    const CONSUMER: &str = "/metrics-test/consumer";

    fn journal(name: &str, state: JournalState, lag: Option<u64>) -> JournalLag {
        JournalLag {
            journal: name.to_string(),
            owner: Some("10.0.0.1:80".to_string()),
            state,
            lag,
            write_head: lag.map(|_| 1000),
            effective_read_head: lag.map(|l| 1000 - l as i64),
        }
    }

    fn sample() -> ConsumerLag {
        ConsumerLag {
            consumer: CONSUMER.to_string(),
            journals: vec![
                journal("events/part-000", JournalState::Ok, Some(600)),
                journal("events/part-001", JournalState::Unavailable, None),
            ],
            members: vec![MemberLag {
                member: "10.0.0.1:80".to_string(),
                masters: 2,
                replicas: 0,
                total_lag: 600,
                incomplete: true,
            }],
        }
    }

    fn record_locally(recorder: &PrometheusRecorder, lag: &ConsumerLag) -> String {
        metrics::with_local_recorder(recorder, || record_consumer_lag(lag));
        recorder.handle().render()
    }

    fn series_lines<'a>(rendered: &'a str, name: &str) -> Vec<&'a str> {
        let prefix = format!("{}{{", name);
        rendered
            .lines()
            .filter(|line| line.starts_with(&prefix))
            .collect()
    }

    #[test]
    fn test_gauge_idle_timeout() {
        assert_eq!(
            gauge_idle_timeout(Duration::from_secs(60), Duration::from_secs(30)),
            Duration::from_secs(150)
        );
    }

    #[tokio::test]
    async fn test_init_metrics() {
        let handle = init_metrics(None);
        let _ = handle.render();
    }

    #[tokio::test]
    async fn test_record_fetch_error() {
        let _handle = init_metrics(None);
        record_fetch_error("write_head");
        record_fetch_error("read_head");
    }

    #[tokio::test]
    async fn test_record_pass_duration() {
        let _handle = init_metrics(None);
        record_pass_duration(Duration::from_millis(250));
    }

    #[test]
    fn test_record_consumer_lag() {
        let recorder = prometheus_builder(None).build_recorder();
        let rendered = record_locally(&recorder, &sample());

        assert!(rendered.contains(&format!("shardlag_consumer_lag{{consumer=\"{}\"}} 600", CONSUMER)));
        assert!(rendered.contains(&format!("shardlag_consumer_members{{consumer=\"{}\"}} 1", CONSUMER)));

        let lags = series_lines(&rendered, "shardlag_journal_lag");
        assert_eq!(lags.len(), 1);
        assert!(lags[0].contains("journal=\"events/part-000\""));
        assert!(lags[0].ends_with(" 600"));
        assert!(!lags[0].contains("state="));

        let states = series_lines(&rendered, "shardlag_journal_state");
        assert_eq!(states.len(), 2 * JournalState::ALL.len());
        let active: Vec<_> = states.iter().filter(|l| l.ends_with(" 1")).collect();
        assert_eq!(active.len(), 2);
        assert!(active
            .iter()
            .any(|l| l.contains("events/part-001") && l.contains("state=\"Unavailable\"")));

        let members = series_lines(&rendered, "shardlag_member_lag");
        assert_eq!(members.len(), 1);
        assert!(members[0].ends_with(" 600"));
        let incomplete = series_lines(&rendered, "shardlag_member_lag_incomplete");
        assert_eq!(incomplete.len(), 1);
        assert!(incomplete[0].ends_with(" 1"));
    }

    #[test]
    fn test_record_consumer_without_members() {
        let recorder = prometheus_builder(None).build_recorder();
        let mut lag = sample();
        lag.members.clear();
        let rendered = record_locally(&recorder, &lag);

        assert!(!rendered.contains(CONSUMER));
        assert!(series_lines(&rendered, "shardlag_consumer_lag").is_empty());
        assert!(series_lines(&rendered, "shardlag_journal_lag").is_empty());
    }

    #[test]
    fn test_state_change_keeps_one_series_per_journal() {
        let recorder = prometheus_builder(None).build_recorder();
        let mut lag = sample();
        record_locally(&recorder, &lag);

        lag.journals[0] = journal("events/part-000", JournalState::NotReading, Some(50));
        let rendered = record_locally(&recorder, &lag);

        let lags = series_lines(&rendered, "shardlag_journal_lag");
        assert_eq!(lags.len(), 1);
        assert!(lags[0].ends_with(" 50"));

        let active: Vec<_> = series_lines(&rendered, "shardlag_journal_state")
            .into_iter()
            .filter(|l| l.contains("events/part-000") && l.ends_with(" 1"))
            .collect();
        assert_eq!(active.len(), 1);
        assert!(active[0].contains("state=\"NotReading\""));
    }

    #[test]
    fn test_stale_gauges_expire() {
        let recorder = prometheus_builder(Some(Duration::from_millis(50))).build_recorder();
        let mut lag = sample();
        let rendered = record_locally(&recorder, &lag);
        assert_eq!(series_lines(&rendered, "shardlag_journal_lag").len(), 1);

        std::thread::sleep(Duration::from_millis(150));

        lag.journals[0] = journal("events/part-000", JournalState::Unavailable, None);
        lag.members[0].total_lag = 0;
        let rendered = record_locally(&recorder, &lag);

        assert!(series_lines(&rendered, "shardlag_journal_lag").is_empty());
        assert!(series_lines(&rendered, "shardlag_journal_state")
            .iter()
            .any(|l| l.contains("events/part-000")
                && l.contains("state=\"Unavailable\"")
                && l.ends_with(" 1")));
        let members = series_lines(&rendered, "shardlag_member_lag");
        assert_eq!(members.len(), 1);
        assert!(members[0].ends_with(" 0"));

        std::thread::sleep(Duration::from_millis(150));
        lag.members.clear();
        let rendered = record_locally(&recorder, &lag);
        assert!(series_lines(&rendered, "shardlag_consumer_lag").is_empty());
        assert!(series_lines(&rendered, "shardlag_member_lag").is_empty());
        assert!(series_lines(&rendered, "shardlag_journal_state").is_empty());
    }
}
