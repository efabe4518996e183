//! Burrow Core
//!
//! Core types, errors, configuration and time abstraction for the Burrow
//! identity-and-scheduling runtime.
//!
//! # TigerStyle
//!
//! - Explicit limits with big-endian naming (e.g., `ACTOR_NAME_LENGTH_BYTES_MAX`)
//! - Explicit error variants, no silent defaults
//! - No recursion (bounded iteration only)

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod metrics;
pub mod telemetry;

pub use config::{ActorConfig, AncestryTieBreak, BurrowConfig, EntityConfig, SchedulerConfig};
pub use constants::*;
pub use error::{Error, Result};
pub use io::{IoContext, ManualClock, TimeProvider, WallClockTime};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
