//! Task scheduler service
//!
//! TigerStyle: Bounded pending set, explicit tick, no retries.
//!
//! Holds submitted tasks with their scheduling strategy and dispatches
//! them to the hub as they mature. Overdue tasks fire immediately.
//! Repeating tasks are rescheduled after the run completes, so fixed-delay
//! schedules count from the actual completion time.

use crate::actor::{validate_task_name, ActorId, Task, TaskId};
use crate::hub::{ControllerHub, DispatchReceipt};
use bytes::Bytes;
use burrow_core::config::SchedulerConfig;
use burrow_core::constants::SCHEDULER_BATCH_COUNT_MAX;
use burrow_core::error::{Error, Result};
use burrow_core::io::IoContext;
use burrow_core::metrics;
use burrow_scheduler::{Schedule, SchedulingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Identifier of a submitted schedule
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(u64);

impl ScheduleId {
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schedule-{}", self.0)
    }
}

/// Returned by `submit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleHandle {
    pub id: ScheduleId,
    /// First fire time on the monotonic timeline, in milliseconds
    pub first_fire_ms: u64,
}

/// Outcome of one `run_due` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks that matured and were handed to the hub
    pub fired: usize,
    pub succeeded: usize,
    /// Rejected by the hub or failed in the actor
    pub failed: usize,
    /// Repeating tasks put back with their next occurrence
    pub rescheduled: usize,
}

struct ScheduledTask {
    id: ScheduleId,
    actor_id: ActorId,
    name: String,
    payload: Bytes,
    strategy: Box<dyn SchedulingStrategy>,
}

#[derive(Default)]
struct SchedulerState {
    pending: HashMap<ScheduleId, ScheduledTask>,
    /// Taken out of `pending` by a running `run_due`
    in_flight: HashSet<ScheduleId>,
    /// Cancelled while in flight; not rescheduled
    cancelled_in_flight: HashSet<ScheduleId>,
}

/// Dispatches scheduled tasks to a `ControllerHub`
pub struct TaskScheduler {
    hub: Arc<ControllerHub>,
    io: IoContext,
    config: SchedulerConfig,
    next_schedule_id: AtomicU64,
    next_task_id: AtomicU64,
    state: Mutex<SchedulerState>,
}

impl TaskScheduler {
    pub fn new(hub: Arc<ControllerHub>, io: IoContext, config: SchedulerConfig) -> Self {
        Self {
            hub,
            io,
            config,
            next_schedule_id: AtomicU64::new(1),
            next_task_id: AtomicU64::new(1),
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Submit a task for scheduled dispatch
    ///
    /// The actor need not be installed yet; it must be started by the time
    /// the task fires.
    ///
    /// # Errors
    /// Returns `InvalidSchedule` for a malformed schedule or task name, or
    /// when the pending limit is reached.
    pub fn submit(
        &self,
        actor_id: ActorId,
        name: impl Into<String>,
        payload: Bytes,
        schedule: Schedule,
    ) -> Result<ScheduleHandle> {
        let name = name.into();
        validate_task_name(&name)?;
        let strategy = schedule.into_strategy(self.io.time.clone())?;

        let mut state = self.lock_state();
        let pending_count = state.pending.len() + state.in_flight.len();
        if pending_count >= self.config.pending_count_max {
            return Err(Error::invalid_schedule(format!(
                "{} tasks pending, limit {}",
                pending_count, self.config.pending_count_max
            )));
        }

        let id = ScheduleId(self.next_schedule_id.fetch_add(1, Ordering::SeqCst));
        let handle = ScheduleHandle {
            id,
            first_fire_ms: strategy.scheduled_time(),
        };
        debug!(
            schedule_id = %id,
            actor_id = %actor_id,
            task = %name,
            fire_ms = handle.first_fire_ms,
            repeating = schedule.is_repeating(),
            "Task scheduled"
        );
        state.pending.insert(
            id,
            ScheduledTask {
                id,
                actor_id,
                name,
                payload,
                strategy,
            },
        );
        Ok(handle)
    }

    /// Withdraw a scheduled task
    ///
    /// A task already handed to the hub still completes, but is not
    /// rescheduled.
    ///
    /// # Errors
    /// Returns `ScheduleNotFound` for unknown, finished or already
    /// cancelled schedules.
    pub fn cancel(&self, id: ScheduleId) -> Result<()> {
        let mut state = self.lock_state();
        if state.pending.remove(&id).is_some() {
            debug!(schedule_id = %id, "Schedule cancelled");
            return Ok(());
        }
        if state.in_flight.contains(&id) && state.cancelled_in_flight.insert(id) {
            debug!(schedule_id = %id, "Schedule cancelled while running");
            return Ok(());
        }
        Err(Error::ScheduleNotFound {
            schedule_id: id.as_u64(),
        })
    }

    /// Number of schedules that will fire again
    pub fn pending_count(&self) -> usize {
        let state = self.lock_state();
        state.pending.len() + state.in_flight.len() - state.cancelled_in_flight.len()
    }

    /// Earliest fire time among pending schedules
    pub fn next_fire_ms(&self) -> Option<u64> {
        self.lock_state()
            .pending
            .values()
            .map(|t| t.strategy.scheduled_time())
            .min()
    }

    /// Fire every matured task and wait for the runs to finish
    ///
    /// Tasks are dispatched in fire-time order, then awaited; runs on
    /// different actors overlap. Failures are logged and counted, never
    /// retried. Repeating tasks keep their next occurrence either way.
    pub async fn run_due(&self) -> Result<RunReport> {
        let due = self.take_due();
        let mut report = RunReport {
            fired: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        let mut running: Vec<(ScheduledTask, Option<DispatchReceipt>)> = Vec::with_capacity(due.len());
        for scheduled in due {
            let task = Task {
                id: TaskId::new(self.next_task_id.fetch_add(1, Ordering::SeqCst)),
                name: scheduled.name.clone(),
                payload: scheduled.payload.clone(),
            };
            match self.hub.dispatch(task, &scheduled.actor_id) {
                Ok(receipt) => running.push((scheduled, Some(receipt))),
                Err(e) => {
                    warn!(
                        schedule_id = %scheduled.id,
                        actor_id = %scheduled.actor_id,
                        error = %e,
                        "Scheduled dispatch rejected"
                    );
                    running.push((scheduled, None));
                }
            }
        }

        for (scheduled, receipt) in running {
            let succeeded = match receipt {
                Some(receipt) => match receipt.wait().await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(schedule_id = %scheduled.id, error = %e, "Scheduled run failed");
                        false
                    }
                },
                None => false,
            };

            if succeeded {
                report.succeeded += 1;
                metrics::record_scheduled_run("success");
            } else {
                report.failed += 1;
                metrics::record_scheduled_run("error");
            }

            if self.finish(scheduled) {
                report.rescheduled += 1;
            }
        }

        debug!(
            fired = report.fired,
            succeeded = report.succeeded,
            failed = report.failed,
            rescheduled = report.rescheduled,
            "Scheduler pass finished"
        );
        Ok(report)
    }

    /// Poll for matured tasks every tick until `shutdown` turns true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_ms = self.config.tick_ms, "Task scheduler starting");

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = self.io.sleep_ms(self.config.tick_ms) => {
                    if let Err(e) = self.run_due().await {
                        error!(error = %e, "Scheduler pass failed");
                    }
                }
            }
        }

        info!("Task scheduler stopped");
    }

    /// Remove matured tasks from the pending set, earliest first
    fn take_due(&self) -> Vec<ScheduledTask> {
        let mut state = self.lock_state();

        let mut due: Vec<(u64, ScheduleId)> = state
            .pending
            .values()
            .filter(|t| t.strategy.is_due())
            .map(|t| (t.strategy.scheduled_time(), t.id))
            .collect();
        due.sort_unstable();
        due.truncate(SCHEDULER_BATCH_COUNT_MAX);

        let mut taken = Vec::with_capacity(due.len());
        for (_, id) in due {
            if let Some(task) = state.pending.remove(&id) {
                state.in_flight.insert(id);
                taken.push(task);
            }
        }
        taken
    }

    /// Put a finished task back if it repeats and was not cancelled
    fn finish(&self, mut scheduled: ScheduledTask) -> bool {
        // Asked after completion so fixed-delay counts from now
        let next = scheduled.strategy.next_repeated_run();

        let mut state = self.lock_state();
        state.in_flight.remove(&scheduled.id);
        if state.cancelled_in_flight.remove(&scheduled.id) {
            return false;
        }

        match next {
            Some(strategy) => {
                debug!(
                    schedule_id = %scheduled.id,
                    fire_ms = strategy.scheduled_time(),
                    "Task rescheduled"
                );
                scheduled.strategy = strategy;
                state.pending.insert(scheduled.id, scheduled);
                true
            }
            None => false,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("pending", &self.pending_count())
            .field("tick_ms", &self.config.tick_ms)
            .finish_non_exhaustive()
    }
}
