//! Metrics collection for Burrow
//!
//! TigerStyle: Explicit metric names with units, type-safe recording.
//!
//! Counters are recorded through the OpenTelemetry global meter when the
//! `otel` feature is enabled; otherwise every function is a no-op.

#[cfg(feature = "otel")]
use crate::constants::*;
#[cfg(feature = "otel")]
use once_cell::sync::Lazy;
#[cfg(feature = "otel")]
use opentelemetry::metrics::Counter;
#[cfg(feature = "otel")]
use opentelemetry::{global, KeyValue};

// Cached instruments (created once, reused for all recordings)
#[cfg(feature = "otel")]
static ENTITIES_REGISTERED_COUNTER: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("burrow")
        .u64_counter(METRIC_NAME_ENTITIES_REGISTERED_TOTAL)
        .with_description("Total number of registered entities")
        .init()
});

#[cfg(feature = "otel")]
static ACTORS_INSTALLED_COUNTER: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("burrow")
        .u64_counter(METRIC_NAME_ACTORS_INSTALLED_TOTAL)
        .with_description("Total number of actor installs")
        .init()
});

#[cfg(feature = "otel")]
static ACTORS_STARTED_COUNTER: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("burrow")
        .u64_counter(METRIC_NAME_ACTORS_STARTED_TOTAL)
        .with_description("Total number of actor starts")
        .init()
});

#[cfg(feature = "otel")]
static TASKS_DISPATCHED_COUNTER: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("burrow")
        .u64_counter(METRIC_NAME_TASKS_DISPATCHED_TOTAL)
        .with_description("Total number of dispatched tasks")
        .init()
});

#[cfg(feature = "otel")]
static SCHEDULED_RUNS_COUNTER: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("burrow")
        .u64_counter(METRIC_NAME_SCHEDULED_RUNS_TOTAL)
        .with_description("Total number of scheduled runs fired")
        .init()
});

/// Record a newly registered entity
#[cfg(feature = "otel")]
pub fn record_entity_registered() {
    ENTITIES_REGISTERED_COUNTER.add(1, &[]);
}

/// Record an actor install
#[cfg(feature = "otel")]
pub fn record_actor_installed() {
    ACTORS_INSTALLED_COUNTER.add(1, &[]);
}

/// Record an actor start
#[cfg(feature = "otel")]
pub fn record_actor_started() {
    ACTORS_STARTED_COUNTER.add(1, &[]);
}

/// Record a dispatch attempt
///
/// # Arguments
/// * `status` - "accepted", "rejected" or "failed"
#[cfg(feature = "otel")]
pub fn record_task_dispatched(status: &str) {
    TASKS_DISPATCHED_COUNTER.add(1, &[KeyValue::new("status", status.to_string())]);
}

/// Record a scheduled run
///
/// # Arguments
/// * `status` - "success" or "error"
#[cfg(feature = "otel")]
pub fn record_scheduled_run(status: &str) {
    SCHEDULED_RUNS_COUNTER.add(1, &[KeyValue::new("status", status.to_string())]);
}

// No-op implementations when otel feature is disabled
#[cfg(not(feature = "otel"))]
pub fn record_entity_registered() {}

#[cfg(not(feature = "otel"))]
pub fn record_actor_installed() {}

#[cfg(not(feature = "otel"))]
pub fn record_actor_started() {}

#[cfg(not(feature = "otel"))]
pub fn record_task_dispatched(_status: &str) {}

#[cfg(not(feature = "otel"))]
pub fn record_scheduled_run(_status: &str) {}
