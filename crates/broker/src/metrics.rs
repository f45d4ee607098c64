//! Prometheus metrics for the topic registry and its fan-out tasks.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

const LABEL_OUTCOME: &str = "outcome";

static TOPICS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("sportcast_topics_active", "Topics currently active in the registry")
        .expect("Failed to register topics_active metric")
});

static PUBLISH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sportcast_publish_total",
        "Publish requests processed by the registry",
        &[LABEL_OUTCOME]
    )
    .expect("Failed to register publish_total metric")
});

static DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sportcast_deliveries_total",
        "Per-subscriber writes attempted by fan-out tasks",
        &[LABEL_OUTCOME]
    )
    .expect("Failed to register deliveries_total metric")
});

static SUBSCRIBERS_PRUNED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "sportcast_subscribers_pruned_total",
        "Subscribers removed after a failed write"
    )
    .expect("Failed to register subscribers_pruned metric")
});

pub(crate) fn topic_created() {
    TOPICS_ACTIVE.inc();
}

pub(crate) fn topic_destroyed() {
    TOPICS_ACTIVE.dec();
}

pub(crate) fn publish_queued() {
    PUBLISH_TOTAL.with_label_values(&["queued"]).inc();
}

pub(crate) fn publish_dropped() {
    PUBLISH_TOTAL.with_label_values(&["dropped"]).inc();
}

pub(crate) fn delivery(ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    DELIVERIES_TOTAL.with_label_values(&[outcome]).inc();
}

pub(crate) fn subscribers_pruned(count: usize) {
    SUBSCRIBERS_PRUNED.inc_by(count as u64);
}
