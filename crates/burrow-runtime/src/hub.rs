//! Controller hub
//!
//! TigerStyle: Install once, start once, one instance per actor.
//!
//! The hub owns one slot per installed actor name. Slots are looked up
//! through a short-lived map lock; starting an actor is serialized per
//! slot so different actors start in parallel.
//!
//! ```text
//!   install ──► Installed ──start──► Started ──dispatch──► mailbox loop
//!                   ▲                    │
//!                   └── on_start error ──┘ (stays Installed)
//! ```

use crate::actor::{ActorContext, ActorDefinition, ActorId, ActorState, Task, TaskId};
use crate::mailbox::{self, Envelope, MailboxSender};
use bytes::Bytes;
use burrow_core::config::ActorConfig;
use burrow_core::error::{Error, Result};
use burrow_core::io::IoContext;
use burrow_core::metrics;
use burrow_entities::EntityContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

/// Per-actor slot
///
/// Built completely before it becomes visible in the hub.
struct Slot {
    definition: ActorDefinition,
    mailbox_depth: usize,
    /// Serializes `start` for this actor
    start_lock: tokio::sync::Mutex<()>,
    /// Set exactly once, after a successful start
    mailbox: OnceLock<MailboxSender>,
}

impl Slot {
    fn state(&self) -> ActorState {
        if self.mailbox.get().is_some() {
            ActorState::Started
        } else {
            ActorState::Installed
        }
    }
}

/// Awaitable completion of a dispatched task
#[derive(Debug)]
pub struct DispatchReceipt {
    task_id: TaskId,
    actor_id: ActorId,
    reply_rx: oneshot::Receiver<Result<Bytes>>,
}

impl DispatchReceipt {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// Wait for the task to finish
    ///
    /// # Errors
    /// Returns the task's failure as `ActorTaskFailed`, or `Internal` if
    /// the actor's loop stopped before answering.
    pub async fn wait(self) -> Result<Bytes> {
        self.reply_rx.await.map_err(|_| {
            Error::internal(format!(
                "{} dropped {} without replying",
                self.actor_id, self.task_id
            ))
        })?
    }
}

/// Controller hub: installs, starts and dispatches to actors
pub struct ControllerHub {
    config: ActorConfig,
    entities: EntityContext,
    io: IoContext,
    slots: Mutex<HashMap<ActorId, Arc<Slot>>>,
    started_count: AtomicUsize,
}

impl ControllerHub {
    pub fn new(config: ActorConfig, entities: EntityContext, io: IoContext) -> Self {
        Self {
            config,
            entities,
            io,
            slots: Mutex::new(HashMap::new()),
            started_count: AtomicUsize::new(0),
        }
    }

    /// Install an actor under a name
    ///
    /// Idempotent for an equivalent definition.
    ///
    /// # Errors
    /// - `ActorAlreadyInstalled` if a non-equivalent definition is installed
    /// - `ActorCapacityReached` if the hub is full
    /// - `InvalidConfiguration` / `InvalidActorId` for a malformed definition
    #[instrument(skip(self, definition), fields(actor_id = %actor_id, kind = definition.kind()), level = "debug")]
    pub fn install(&self, actor_id: ActorId, definition: ActorDefinition) -> Result<()> {
        definition.validate(&actor_id)?;

        let mut slots = self.lock_slots();

        if let Some(existing) = slots.get(&actor_id) {
            if existing.definition.is_equivalent(&definition) {
                debug!("Actor already installed");
                return Ok(());
            }
            return Err(Error::ActorAlreadyInstalled {
                id: actor_id.to_string(),
                existing: existing.definition.kind().to_string(),
                requested: definition.kind().to_string(),
            });
        }

        if slots.len() >= self.config.max_actors_count {
            return Err(Error::ActorCapacityReached {
                count: slots.len(),
                max: self.config.max_actors_count,
            });
        }

        let slot = Arc::new(Slot {
            mailbox_depth: definition.mailbox_depth().unwrap_or(self.config.mailbox_depth),
            definition,
            start_lock: tokio::sync::Mutex::new(()),
            mailbox: OnceLock::new(),
        });
        slots.insert(actor_id.clone(), slot);
        drop(slots);

        metrics::record_actor_installed();
        info!(actor_id = %actor_id, "Actor installed");
        Ok(())
    }

    /// Start an installed actor
    ///
    /// Creates exactly one instance, runs `on_start` and spawns the
    /// mailbox loop. Starting a started actor is a no-op.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    /// - `ActorNotInstalled` if nothing is installed under the name
    /// - `ActorStartFailed` if `on_start` fails; the actor stays installed
    #[instrument(skip(self), fields(actor_id = %actor_id), level = "debug")]
    pub async fn start(&self, actor_id: &ActorId) -> Result<()> {
        let slot = self
            .slot(actor_id)
            .ok_or_else(|| Error::actor_not_installed(actor_id.to_string()))?;

        let _guard = slot.start_lock.lock().await;
        if slot.mailbox.get().is_some() {
            debug!("Actor already started");
            return Ok(());
        }

        let ctx = ActorContext {
            id: actor_id.clone(),
            entities: self.entities.clone(),
            io: self.io.clone(),
        };
        let mut actor = slot.definition.factory().create(actor_id);

        if let Err(e) = actor.on_start(&ctx).await {
            warn!(actor_id = %actor_id, error = %e, "Actor start failed");
            return Err(Error::ActorStartFailed {
                id: actor_id.to_string(),
                reason: e.to_string(),
            });
        }

        let (sender, rx) = mailbox::channel(slot.mailbox_depth);
        tokio::spawn(mailbox::run(actor, ctx, rx));

        // Only this call can set it: the start lock is held and it was empty
        if slot.mailbox.set(sender).is_err() {
            return Err(Error::internal(format!("{} started twice", actor_id)));
        }
        self.started_count.fetch_add(1, Ordering::SeqCst);

        metrics::record_actor_started();
        info!(actor_id = %actor_id, kind = slot.definition.kind(), "Actor started");
        Ok(())
    }

    /// Hand a task to a started actor
    ///
    /// Tasks for one actor run one at a time, in dispatch order.
    ///
    /// # Errors
    /// - `ActorNotInstalled` if nothing is installed under the name
    /// - `ActorNotStarted` if the actor is installed but not started
    /// - `ActorMailboxFull` if the actor's mailbox is full
    #[instrument(skip(self, task), fields(actor_id = %actor_id, task_id = %task.id, task = %task.name), level = "debug")]
    pub fn dispatch(&self, task: Task, actor_id: &ActorId) -> Result<DispatchReceipt> {
        let slot = self.slot(actor_id).ok_or_else(|| {
            metrics::record_task_dispatched("rejected");
            Error::actor_not_installed(actor_id.to_string())
        })?;

        let Some(mailbox) = slot.mailbox.get() else {
            metrics::record_task_dispatched("rejected");
            return Err(Error::actor_not_started(actor_id.to_string()));
        };

        let task_id = task.id;
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope::new(task, reply_tx, self.io.time.as_ref());

        if let Err(e) = mailbox.try_push(actor_id, envelope) {
            metrics::record_task_dispatched("rejected");
            return Err(e);
        }

        metrics::record_task_dispatched("accepted");
        debug!("Task dispatched");
        Ok(DispatchReceipt {
            task_id,
            actor_id: actor_id.clone(),
            reply_rx,
        })
    }

    /// Lifecycle state of an actor name
    pub fn state(&self, actor_id: &ActorId) -> ActorState {
        self.slot(actor_id)
            .map(|slot| slot.state())
            .unwrap_or(ActorState::Unregistered)
    }

    /// Number of tasks queued for a started actor
    pub fn pending_tasks(&self, actor_id: &ActorId) -> Option<usize> {
        self.slot(actor_id)?.mailbox.get().map(MailboxSender::pending)
    }

    pub fn installed_count(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn started_count(&self) -> usize {
        self.started_count.load(Ordering::SeqCst)
    }

    pub fn entities(&self) -> &EntityContext {
        &self.entities
    }

    fn slot(&self, actor_id: &ActorId) -> Option<Arc<Slot>> {
        self.lock_slots().get(actor_id).cloned()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<ActorId, Arc<Slot>>> {
        // Slots are inserted whole, so a poisoned map is still consistent
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ControllerHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHub")
            .field("installed", &self.installed_count())
            .field("started", &self.started_count())
            .finish_non_exhaustive()
    }
}
