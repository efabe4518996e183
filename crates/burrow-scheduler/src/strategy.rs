//! Scheduling strategies
//!
//! TigerStyle: Pure computation over an injected clock.
//!
//! A strategy is an immutable timing descriptor. It knows when its task
//! fires and, for repeating tasks, produces the strategy of the next
//! occurrence. Times are milliseconds of the clock's monotonic timeline.

use crate::time_unit::TimeUnit;
use burrow_core::io::TimeProvider;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Timing of one occurrence of a task
pub trait SchedulingStrategy: Send + Sync + fmt::Debug {
    /// Absolute fire time on the monotonic timeline, in milliseconds
    fn scheduled_time(&self) -> u64;

    /// Time remaining until the fire time, in `unit`
    ///
    /// Negative when the task is overdue.
    fn delay(&self, unit: TimeUnit) -> i64;

    /// Strategy of the next occurrence, `None` for one-shot tasks
    fn next_repeated_run(&self) -> Option<Box<dyn SchedulingStrategy>>;

    /// Whether the fire time has been reached
    fn is_due(&self) -> bool {
        self.delay(TimeUnit::Milliseconds) <= 0
    }
}

fn delay_until(clock: &dyn TimeProvider, scheduled_time_ms: u64, unit: TimeUnit) -> i64 {
    let remaining_ms = i128::from(scheduled_time_ms) - i128::from(clock.monotonic_ms());
    let remaining_ms = remaining_ms.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
    unit.convert_from_ms(remaining_ms)
}

// =============================================================================
// One-shot
// =============================================================================

/// Fires once at a fixed time
#[derive(Clone)]
pub struct OneShot {
    scheduled_time_ms: u64,
    clock: Arc<dyn TimeProvider>,
}

impl OneShot {
    pub fn new(scheduled_time_ms: u64, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            scheduled_time_ms,
            clock,
        }
    }
}

impl SchedulingStrategy for OneShot {
    fn scheduled_time(&self) -> u64 {
        self.scheduled_time_ms
    }

    fn delay(&self, unit: TimeUnit) -> i64 {
        delay_until(self.clock.as_ref(), self.scheduled_time_ms, unit)
    }

    fn next_repeated_run(&self) -> Option<Box<dyn SchedulingStrategy>> {
        None
    }
}

impl fmt::Debug for OneShot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShot")
            .field("scheduled_time_ms", &self.scheduled_time_ms)
            .finish()
    }
}

// =============================================================================
// Fixed rate
// =============================================================================

/// Repeats on a fixed grid: next = previous scheduled time + period
///
/// Execution latency never shifts later occurrences.
#[derive(Clone)]
pub struct FixedRate {
    scheduled_time_ms: u64,
    period_ms: u64,
    clock: Arc<dyn TimeProvider>,
}

impl FixedRate {
    /// First occurrence at `scheduled_time_ms`, repeating every `period_ms`
    ///
    /// `Schedule::into_strategy` checks the period and returns
    /// `InvalidSchedule` instead.
    ///
    /// # Panics
    /// Panics if `period_ms` is zero.
    pub fn new(scheduled_time_ms: u64, period_ms: u64, clock: Arc<dyn TimeProvider>) -> Self {
        assert!(period_ms > 0, "period must be positive");
        Self {
            scheduled_time_ms,
            period_ms,
            clock,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}

impl SchedulingStrategy for FixedRate {
    fn scheduled_time(&self) -> u64 {
        self.scheduled_time_ms
    }

    fn delay(&self, unit: TimeUnit) -> i64 {
        delay_until(self.clock.as_ref(), self.scheduled_time_ms, unit)
    }

    fn next_repeated_run(&self) -> Option<Box<dyn SchedulingStrategy>> {
        let Some(next_ms) = self.scheduled_time_ms.checked_add(self.period_ms) else {
            warn!(scheduled_time_ms = self.scheduled_time_ms, "Fixed-rate schedule ran off the timeline");
            return None;
        };
        Some(Box::new(Self {
            scheduled_time_ms: next_ms,
            period_ms: self.period_ms,
            clock: Arc::clone(&self.clock),
        }))
    }
}

impl fmt::Debug for FixedRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedRate")
            .field("scheduled_time_ms", &self.scheduled_time_ms)
            .field("period_ms", &self.period_ms)
            .finish()
    }
}

// =============================================================================
// Fixed delay
// =============================================================================

/// Repeats a fixed time after each completion: next = completion + period
///
/// The completion time is the clock reading when `next_repeated_run` is
/// called, so callers ask for the next run once the task has finished.
#[derive(Clone)]
pub struct FixedDelay {
    scheduled_time_ms: u64,
    period_ms: u64,
    clock: Arc<dyn TimeProvider>,
}

impl FixedDelay {
    /// First occurrence at `scheduled_time_ms`, repeating every `period_ms`
    ///
    /// `Schedule::into_strategy` checks the period and returns
    /// `InvalidSchedule` instead.
    ///
    /// # Panics
    /// Panics if `period_ms` is zero.
    pub fn new(scheduled_time_ms: u64, period_ms: u64, clock: Arc<dyn TimeProvider>) -> Self {
        assert!(period_ms > 0, "period must be positive");
        Self {
            scheduled_time_ms,
            period_ms,
            clock,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}

impl SchedulingStrategy for FixedDelay {
    fn scheduled_time(&self) -> u64 {
        self.scheduled_time_ms
    }

    fn delay(&self, unit: TimeUnit) -> i64 {
        delay_until(self.clock.as_ref(), self.scheduled_time_ms, unit)
    }

    fn next_repeated_run(&self) -> Option<Box<dyn SchedulingStrategy>> {
        let completed_at_ms = self.clock.monotonic_ms();
        let Some(next_ms) = completed_at_ms.checked_add(self.period_ms) else {
            warn!(completed_at_ms, "Fixed-delay schedule ran off the timeline");
            return None;
        };
        Some(Box::new(Self {
            scheduled_time_ms: next_ms,
            period_ms: self.period_ms,
            clock: Arc::clone(&self.clock),
        }))
    }
}

impl fmt::Debug for FixedDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedDelay")
            .field("scheduled_time_ms", &self.scheduled_time_ms)
            .field("period_ms", &self.period_ms)
            .finish()
    }
}
