//! Prometheus metrics for connections and event watchers.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge, TextEncoder,
};

use sportcast_sports::LifecycleState;

static CLIENTS_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("sportcast_clients_connected", "Currently connected real-time clients")
        .expect("Failed to register clients_connected metric")
});

static INBOUND_FRAMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sportcast_inbound_frames_total",
        "Frames read from clients by outcome",
        &["kind"]
    )
    .expect("Failed to register inbound_frames metric")
});

static POLLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sportcast_polls_total",
        "Play-by-play polls by sport and outcome",
        &["sport", "outcome"]
    )
    .expect("Failed to register polls_total metric")
});

static WATCHERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("sportcast_watchers_active", "Event watchers currently running")
        .expect("Failed to register watchers_active metric")
});

static LIFECYCLE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sportcast_lifecycle_transitions_total",
        "Lifecycle transitions by sport and target state",
        &["sport", "to"]
    )
    .expect("Failed to register lifecycle_transitions metric")
});

pub fn client_connected() {
    CLIENTS_CONNECTED.inc();
}

pub fn client_disconnected() {
    CLIENTS_CONNECTED.dec();
}

pub fn inbound_frame(kind: &str) {
    INBOUND_FRAMES.with_label_values(&[kind]).inc();
}

pub fn poll(sport: &str, outcome: &str) {
    POLLS_TOTAL.with_label_values(&[sport, outcome]).inc();
}

pub fn watcher_started() {
    WATCHERS_ACTIVE.inc();
}

pub fn watcher_finished() {
    WATCHERS_ACTIVE.dec();
}

pub fn lifecycle_transition(sport: &str, to: LifecycleState) {
    LIFECYCLE_TRANSITIONS
        .with_label_values(&[sport, &to.to_string()])
        .inc();
}

/// Render the default registry in the text exposition format.
pub fn encode() -> Result<String, prometheus::Error> {
    TextEncoder::new().encode_to_string(&prometheus::gather())
}
