//! Time units for delay queries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit in which a caller wants a delay expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

impl TimeUnit {
    /// Convert a millisecond duration into this unit
    ///
    /// Coarser units truncate toward zero; finer units saturate.
    pub fn convert_from_ms(self, ms: i64) -> i64 {
        match self {
            Self::Nanoseconds => ms.saturating_mul(1_000_000),
            Self::Microseconds => ms.saturating_mul(1_000),
            Self::Milliseconds => ms,
            Self::Seconds => ms / MS_PER_SECOND,
            Self::Minutes => ms / MS_PER_MINUTE,
            Self::Hours => ms / MS_PER_HOUR,
            Self::Days => ms / MS_PER_DAY,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
            Self::Days => "d",
        };
        f.write_str(name)
    }
}
