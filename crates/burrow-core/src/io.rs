//! Time abstraction for deterministic testing
//!
//! TigerStyle: All reads of the clock go through `TimeProvider`.
//!
//! Scheduling computations and the scheduler loop never read the system
//! clock directly. Production code runs on `WallClockTime`; tests drive a
//! `ManualClock` forward explicitly.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │   Strategies, scheduler, hub (SAME CODE) │
//! └────────────────────┬─────────────────────┘
//!                      │ TimeProvider
//!           ┌──────────┴──────────┐
//!     ┌─────▼─────┐         ┌─────▼─────┐
//!     │ WallClock │         │  Manual   │
//!     └───────────┘         └───────────┘
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

// ============================================================================
// Time Provider
// ============================================================================

/// Time provider abstraction
///
/// # Implementations
///
/// - `WallClockTime`: Production - uses system clock
/// - `ManualClock`: Tests - deterministic, manually advanced
#[async_trait]
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    /// Get current time in milliseconds since epoch
    fn now_ms(&self) -> u64;

    /// Sleep for the specified duration
    async fn sleep_ms(&self, ms: u64);

    /// Get monotonic timestamp (scheduled times are expressed in this clock)
    fn monotonic_ms(&self) -> u64 {
        self.now_ms()
    }
}

/// Production time provider using wall clock
#[derive(Debug, Clone)]
pub struct WallClockTime {
    origin: Instant,
}

impl Default for WallClockTime {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClockTime {
    /// Create a new wall clock time provider
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

#[async_trait]
impl TimeProvider for WallClockTime {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
    }

    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

// ============================================================================
// Manual Clock
// ============================================================================

/// Manually advanced clock
///
/// Time only moves when `advance_ms` or `set_ms` is called. Sleepers wake
/// once the clock reaches their deadline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_ms: Arc<AtomicU64>,
    notify: Arc<Notify>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            current_ms: Arc::new(AtomicU64::new(start_ms)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Advance time by `ms`
    pub fn advance_ms(&self, ms: u64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Move the clock to `ms`
    ///
    /// Monotonic: moving backwards is ignored.
    pub fn set_ms(&self, ms: u64) {
        self.current_ms.fetch_max(ms, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl TimeProvider for ManualClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    async fn sleep_ms(&self, ms: u64) {
        let target_ms = self.now_ms().saturating_add(ms);
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so an advance between the check and
            // the await is not lost.
            notified.as_mut().enable();
            if self.now_ms() >= target_ms {
                return;
            }
            notified.await;
        }
    }
}

// ============================================================================
// I/O Context
// ============================================================================

/// Bundle of I/O providers
///
/// Pass this through the runtime instead of individual providers.
#[derive(Clone, Debug)]
pub struct IoContext {
    /// Time provider
    pub time: Arc<dyn TimeProvider>,
}

impl Default for IoContext {
    fn default() -> Self {
        Self::production()
    }
}

impl IoContext {
    /// Create production I/O context with the real wall clock
    pub fn production() -> Self {
        Self {
            time: Arc::new(WallClockTime::new()),
        }
    }

    /// Create I/O context with a custom time provider
    pub fn new(time: Arc<dyn TimeProvider>) -> Self {
        Self { time }
    }

    /// Get current monotonic time in milliseconds
    pub fn monotonic_ms(&self) -> u64 {
        self.time.monotonic_ms()
    }

    /// Sleep for specified duration
    pub async fn sleep_ms(&self, ms: u64) {
        self.time.sleep_ms(ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_monotonic_never_decreases() {
        let clock = WallClockTime::new();
        let first = clock.monotonic_ms();
        let second = clock.monotonic_ms();
        assert!(second >= first);
        // Should be a reasonable timestamp (after 2020)
        assert!(clock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);

        clock.advance_ms(500);
        assert_eq!(clock.monotonic_ms(), 1_500);

        clock.set_ms(1_200);
        assert_eq!(clock.now_ms(), 1_500, "clock must not move backwards");

        clock.set_ms(4_000);
        assert_eq!(clock.now_ms(), 4_000);
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_wakes_on_advance() {
        let clock = ManualClock::new(0);
        let sleeper = clock.clone();

        let task = tokio::spawn(async move {
            sleeper.sleep_ms(100).await;
            sleeper.now_ms()
        });

        tokio::task::yield_now().await;
        clock.advance_ms(40);
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        clock.advance_ms(60);
        let woke_at = task.await.unwrap();
        assert_eq!(woke_at, 100);
    }

    #[tokio::test]
    async fn test_manual_clock_zero_sleep_returns() {
        let clock = ManualClock::new(7);
        clock.sleep_ms(0).await;
        assert_eq!(clock.now_ms(), 7);
    }

    #[test]
    fn test_io_context_production() {
        let ctx = IoContext::production();
        let _ = ctx.monotonic_ms();
    }
}
