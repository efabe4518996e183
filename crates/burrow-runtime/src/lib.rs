//! Burrow Runtime
//!
//! Actor controller hub and task scheduler service.
//!
//! # Overview
//!
//! The runtime provides:
//! - Idempotent actor installation
//! - Exactly one instance per started actor
//! - Bounded per-actor mailboxes processed in dispatch order
//! - Scheduled dispatch of one-shot and repeating tasks
//!
//! # TigerStyle
//! - Explicit lifecycle states (unregistered, installed, started)
//! - Bounded mailboxes (no silent task drops)
//! - No retries: failures are reported, never replayed

pub mod actor;
pub mod context;
pub mod hub;
pub mod mailbox;
pub mod scheduler;

pub use actor::{
    Actor, ActorContext, ActorDefinition, ActorFactory, ActorId, ActorState, CloneFactory, Task,
    TaskId,
};
pub use context::{RuntimeContext, SchedulerTask};
pub use hub::{ControllerHub, DispatchReceipt};
pub use mailbox::Envelope;
pub use scheduler::{RunReport, ScheduleHandle, ScheduleId, TaskScheduler};
