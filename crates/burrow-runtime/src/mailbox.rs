//! Actor mailbox
//!
//! TigerStyle: Bounded queues with explicit limits, no silent drops.
//!
//! Each started actor owns one bounded channel and one loop task. The loop
//! takes envelopes in FIFO order and runs them to completion one at a time.

use crate::actor::{Actor, ActorContext, ActorId, Task, TaskId};
use bytes::Bytes;
use burrow_core::error::{Error, Result};
use burrow_core::io::TimeProvider;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// A task in the mailbox
#[derive(Debug)]
pub struct Envelope {
    /// The task to run
    pub task: Task,
    /// Channel to send the outcome
    pub reply_tx: oneshot::Sender<Result<Bytes>>,
    /// When the task was enqueued (monotonic timestamp in ms)
    pub enqueued_at_ms: u64,
}

impl Envelope {
    pub fn new(task: Task, reply_tx: oneshot::Sender<Result<Bytes>>, time: &dyn TimeProvider) -> Self {
        Self {
            task,
            reply_tx,
            enqueued_at_ms: time.monotonic_ms(),
        }
    }

    /// Time this task has been waiting in milliseconds
    pub fn wait_time_ms(&self, time: &dyn TimeProvider) -> u64 {
        time.monotonic_ms().saturating_sub(self.enqueued_at_ms)
    }
}

/// Sending side of a started actor's mailbox
#[derive(Debug, Clone)]
pub(crate) struct MailboxSender {
    tx: mpsc::Sender<Envelope>,
    depth: usize,
}

impl MailboxSender {
    /// Enqueue without waiting
    ///
    /// # Errors
    /// - `ActorMailboxFull` when `depth` tasks are already queued
    /// - `Internal` when the loop has stopped
    pub(crate) fn try_push(&self, actor_id: &ActorId, envelope: Envelope) -> Result<()> {
        self.tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::ActorMailboxFull {
                id: actor_id.to_string(),
                depth: self.depth,
            },
            mpsc::error::TrySendError::Closed(_) => {
                Error::internal(format!("mailbox of {} is closed", actor_id))
            }
        })
    }

    /// Number of queued tasks
    pub(crate) fn pending(&self) -> usize {
        self.depth.saturating_sub(self.tx.capacity())
    }
}

/// Create a mailbox of the given depth
pub(crate) fn channel(depth: usize) -> (MailboxSender, mpsc::Receiver<Envelope>) {
    assert!(depth > 0, "mailbox depth must be positive");
    let (tx, rx) = mpsc::channel(depth);
    (MailboxSender { tx, depth }, rx)
}

/// Run an actor's mailbox until every sender is dropped
pub(crate) async fn run(
    mut actor: Box<dyn Actor>,
    ctx: ActorContext,
    mut rx: mpsc::Receiver<Envelope>,
) {
    debug!(actor_id = %ctx.id, "Mailbox loop started");

    while let Some(envelope) = rx.recv().await {
        let task_id: TaskId = envelope.task.id;
        let task_name = envelope.task.name.clone();
        let waited_ms = envelope.wait_time_ms(ctx.io.time.as_ref());

        let result = actor
            .handle(&ctx, envelope.task)
            .await
            .map_err(|e| Error::ActorTaskFailed {
                id: ctx.id.to_string(),
                task: task_name.clone(),
                reason: e.to_string(),
            });

        match &result {
            Ok(_) => debug!(actor_id = %ctx.id, task_id = %task_id, task = %task_name, waited_ms, "Task completed"),
            Err(e) => warn!(actor_id = %ctx.id, task_id = %task_id, error = %e, "Task failed"),
        }

        // The dispatcher may have stopped waiting
        let _ = envelope.reply_tx.send(result);
    }

    debug!(actor_id = %ctx.id, "Mailbox loop stopped");
}
