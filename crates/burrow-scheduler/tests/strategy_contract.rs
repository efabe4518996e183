//! Behavior every strategy shares, whichever policy is active
//!
//! TigerStyle: Callers never assume which repeating policy they hold.

use burrow_core::io::{ManualClock, TimeProvider};
use burrow_scheduler::{Schedule, SchedulingStrategy, TimeUnit};
use std::sync::Arc;

const T_MS: u64 = 1_000_000;
const PERIOD_MS: u64 = 10_000;

fn setup() -> (ManualClock, Arc<dyn TimeProvider>) {
    let clock = ManualClock::new(T_MS - 5_000);
    let shared: Arc<dyn TimeProvider> = Arc::new(clock.clone());
    (clock, shared)
}

#[test]
fn test_one_shot_five_seconds_before_fire_time() {
    let (_clock, shared) = setup();
    let strategy = Schedule::at(T_MS).into_strategy(shared).unwrap();

    assert_eq!(strategy.delay(TimeUnit::Seconds), 5);
    assert!(strategy.next_repeated_run().is_none());
}

#[test]
fn test_fixed_rate_next_run_regardless_of_execution_time() {
    for execution_ms in [0, 1, 9_999, 25_000] {
        let (clock, shared) = setup();
        let strategy = Schedule::fixed_rate(5_000, PERIOD_MS)
            .into_strategy(shared)
            .unwrap();
        assert_eq!(strategy.scheduled_time(), T_MS);

        clock.set_ms(T_MS);
        clock.advance_ms(execution_ms);
        let next = strategy.next_repeated_run().unwrap();
        assert_eq!(next.scheduled_time(), T_MS + PERIOD_MS, "execution {}ms", execution_ms);
    }
}

#[test]
fn test_repeating_policies_are_interchangeable() {
    let (clock, shared) = setup();
    let strategies: Vec<Box<dyn SchedulingStrategy>> = vec![
        Schedule::fixed_rate(5_000, PERIOD_MS)
            .into_strategy(Arc::clone(&shared))
            .unwrap(),
        Schedule::fixed_delay(5_000, PERIOD_MS)
            .into_strategy(Arc::clone(&shared))
            .unwrap(),
    ];

    clock.set_ms(T_MS);
    for strategy in strategies {
        assert!(strategy.is_due());
        let next = strategy.next_repeated_run().unwrap();
        // Completion at the fire time makes both policies agree
        assert_eq!(next.scheduled_time(), T_MS + PERIOD_MS);
        assert_eq!(next.delay(TimeUnit::Seconds), 10);
        assert!(next.next_repeated_run().is_some());
    }
}
