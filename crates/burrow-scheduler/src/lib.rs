//! Burrow Scheduler
//!
//! Timing of one-shot and repeating tasks. Strategies only compute fire
//! times; dispatching matured tasks belongs to the runtime.
//!
//! # Example
//!
//! ```
//! use burrow_core::io::{ManualClock, TimeProvider};
//! use burrow_scheduler::{Schedule, TimeUnit};
//! use std::sync::Arc;
//!
//! let clock: Arc<dyn TimeProvider> = Arc::new(ManualClock::new(0));
//! let strategy = Schedule::fixed_rate(1_000, 10_000).into_strategy(clock).unwrap();
//! assert_eq!(strategy.delay(TimeUnit::Seconds), 1);
//! assert_eq!(strategy.next_repeated_run().unwrap().scheduled_time(), 11_000);
//! ```

pub mod schedule;
pub mod strategy;
pub mod time_unit;

pub use schedule::{Schedule, SCHEDULE_PERIOD_MS_MAX};
pub use strategy::{FixedDelay, FixedRate, OneShot, SchedulingStrategy};
pub use time_unit::TimeUnit;
