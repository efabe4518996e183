//! TigerStyle constants for Burrow
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Entity Limits
// =============================================================================

/// Largest entity id in use when a registry starts from scratch
pub const ENTITY_ID_LARGEST_USED_DEFAULT: u64 = 0;

/// Initial capacity of the identity registry maps
pub const ENTITY_REGISTRY_CAPACITY_INITIAL: usize = 1024;

/// Maximum number of ancestors walked when deciding a type's identity policy
pub const TYPE_ANCESTRY_DEPTH_MAX: usize = 256;

// =============================================================================
// Actor Limits
// =============================================================================

/// Maximum length of an actor name in bytes
pub const ACTOR_NAME_LENGTH_BYTES_MAX: usize = 256;

/// Maximum number of installed actors per hub
pub const ACTOR_INSTALLED_COUNT_MAX: usize = 100_000;

/// Maximum depth of an actor mailbox
pub const ACTOR_MAILBOX_DEPTH_MAX: usize = 10_000;

/// Default depth of an actor mailbox
pub const ACTOR_MAILBOX_DEPTH_DEFAULT: usize = 1024;

/// Maximum length of a task name in bytes
pub const TASK_NAME_LENGTH_BYTES_MAX: usize = 256;

// =============================================================================
// Scheduler Limits
// =============================================================================

/// Default scheduler polling interval in milliseconds
pub const SCHEDULER_TICK_MS_DEFAULT: u64 = 10;

/// Maximum scheduler polling interval in milliseconds (1 min)
pub const SCHEDULER_TICK_MS_MAX: u64 = 60 * 1000;

/// Maximum number of pending scheduled tasks
pub const SCHEDULER_PENDING_COUNT_MAX: usize = 1_000_000;

/// Maximum number of matured tasks fired in one scheduler pass
pub const SCHEDULER_BATCH_COUNT_MAX: usize = 10_000;

// =============================================================================
// Observability - Metric Names
// =============================================================================

/// Metric: Total number of registered entities (counter)
pub const METRIC_NAME_ENTITIES_REGISTERED_TOTAL: &str = "burrow_entities_registered_total";

/// Metric: Total number of actor installs (counter)
pub const METRIC_NAME_ACTORS_INSTALLED_TOTAL: &str = "burrow_actors_installed_total";

/// Metric: Total number of actor starts (counter)
pub const METRIC_NAME_ACTORS_STARTED_TOTAL: &str = "burrow_actors_started_total";

/// Metric: Total number of dispatched tasks (counter, labels: status)
pub const METRIC_NAME_TASKS_DISPATCHED_TOTAL: &str = "burrow_tasks_dispatched_total";

/// Metric: Total number of scheduled runs fired (counter, labels: status)
pub const METRIC_NAME_SCHEDULED_RUNS_TOTAL: &str = "burrow_scheduled_runs_total";

// Compile-time assertions for constant validity
const _: () = {
    assert!(ACTOR_NAME_LENGTH_BYTES_MAX >= 64);
    assert!(ACTOR_MAILBOX_DEPTH_DEFAULT <= ACTOR_MAILBOX_DEPTH_MAX);
    assert!(SCHEDULER_TICK_MS_DEFAULT <= SCHEDULER_TICK_MS_MAX);
    assert!(TYPE_ANCESTRY_DEPTH_MAX > 0);
};
