//! Submission-time schedule descriptors
//!
//! TigerStyle: Validate at submission, never at fire time.

use crate::strategy::{FixedDelay, FixedRate, OneShot, SchedulingStrategy};
use burrow_core::error::{Error, Result};
use burrow_core::io::TimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum repeat period in milliseconds (one year)
pub const SCHEDULE_PERIOD_MS_MAX: u64 = 365 * 24 * 60 * 60 * 1_000;

/// How a task is to be scheduled
///
/// Relative delays are measured from the clock reading at conversion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Fire once after a delay
    Once { delay_ms: u64 },
    /// Fire once at an absolute monotonic time
    At { time_ms: u64 },
    /// Repeat on a fixed grid
    FixedRate { initial_delay_ms: u64, period_ms: u64 },
    /// Repeat a fixed time after each completion
    FixedDelay { initial_delay_ms: u64, period_ms: u64 },
}

impl Schedule {
    pub fn once(delay_ms: u64) -> Self {
        Self::Once { delay_ms }
    }

    pub fn at(time_ms: u64) -> Self {
        Self::At { time_ms }
    }

    pub fn fixed_rate(initial_delay_ms: u64, period_ms: u64) -> Self {
        Self::FixedRate {
            initial_delay_ms,
            period_ms,
        }
    }

    pub fn fixed_delay(initial_delay_ms: u64, period_ms: u64) -> Self {
        Self::FixedDelay {
            initial_delay_ms,
            period_ms,
        }
    }

    /// Whether the schedule produces more than one occurrence
    pub fn is_repeating(&self) -> bool {
        matches!(self, Self::FixedRate { .. } | Self::FixedDelay { .. })
    }

    /// Check the schedule without converting it
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Once { .. } | Self::At { .. } => Ok(()),
            Self::FixedRate { period_ms, .. } | Self::FixedDelay { period_ms, .. } => {
                if period_ms == 0 {
                    return Err(Error::invalid_schedule("period must be positive"));
                }
                if period_ms > SCHEDULE_PERIOD_MS_MAX {
                    return Err(Error::invalid_schedule(format!(
                        "period {}ms exceeds maximum {}ms",
                        period_ms, SCHEDULE_PERIOD_MS_MAX
                    )));
                }
                Ok(())
            }
        }
    }

    /// Build the strategy of the first occurrence
    ///
    /// # Errors
    /// Returns `InvalidSchedule` for zero or oversized periods and for
    /// delays that overflow the timeline.
    pub fn into_strategy(self, clock: Arc<dyn TimeProvider>) -> Result<Box<dyn SchedulingStrategy>> {
        self.validate()?;
        let now_ms = clock.monotonic_ms();
        let after = |delay_ms: u64| {
            now_ms
                .checked_add(delay_ms)
                .ok_or_else(|| Error::invalid_schedule(format!("delay {}ms overflows", delay_ms)))
        };

        let strategy: Box<dyn SchedulingStrategy> = match self {
            Self::Once { delay_ms } => Box::new(OneShot::new(after(delay_ms)?, clock)),
            Self::At { time_ms } => Box::new(OneShot::new(time_ms, clock)),
            Self::FixedRate {
                initial_delay_ms,
                period_ms,
            } => Box::new(FixedRate::new(after(initial_delay_ms)?, period_ms, clock)),
            Self::FixedDelay {
                initial_delay_ms,
                period_ms,
            } => Box::new(FixedDelay::new(after(initial_delay_ms)?, period_ms, clock)),
        };
        Ok(strategy)
    }
}
