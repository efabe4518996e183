//! Actor abstractions for Burrow
//!
//! TigerStyle: Explicit types, validated names, bounded sizes.

use async_trait::async_trait;
use bytes::Bytes;
use burrow_core::constants::{
    ACTOR_MAILBOX_DEPTH_MAX, ACTOR_NAME_LENGTH_BYTES_MAX, TASK_NAME_LENGTH_BYTES_MAX,
};
use burrow_core::error::{Error, Result};
use burrow_core::io::IoContext;
use burrow_entities::EntityContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

fn valid_name_chars(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == ':')
}

// =============================================================================
// ActorId
// =============================================================================

/// Name of an actor within a hub
///
/// # TigerStyle
/// - Explicit validation on construction
/// - Immutable after creation
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    /// Create a new ActorId with validation
    ///
    /// # Errors
    /// Returns `InvalidActorId` if the name is empty, too long, or contains
    /// characters other than alphanumerics, `-`, `_`, `.` and `:`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(Error::InvalidActorId {
                id: name,
                reason: "name must not be empty".into(),
            });
        }

        if name.len() > ACTOR_NAME_LENGTH_BYTES_MAX {
            return Err(Error::InvalidActorId {
                reason: format!(
                    "name length {} exceeds limit {}",
                    name.len(),
                    ACTOR_NAME_LENGTH_BYTES_MAX
                ),
                id: name,
            });
        }

        if !valid_name_chars(&name) {
            return Err(Error::InvalidActorId {
                id: name,
                reason: "name contains invalid characters".into(),
            });
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ActorId {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl From<ActorId> for String {
    fn from(id: ActorId) -> Self {
        id.0
    }
}

// =============================================================================
// Task
// =============================================================================

/// Identifier of a dispatched task
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Unit of work dispatched to an actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub payload: Bytes,
}

impl Task {
    /// Create a task with a validated name
    ///
    /// # Errors
    /// Returns `InvalidSchedule` if the name is empty or too long.
    pub fn new(id: TaskId, name: impl Into<String>, payload: Bytes) -> Result<Self> {
        let name = name.into();
        validate_task_name(&name)?;
        Ok(Self { id, name, payload })
    }
}

pub(crate) fn validate_task_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_schedule("task name must not be empty"));
    }
    if name.len() > TASK_NAME_LENGTH_BYTES_MAX {
        return Err(Error::invalid_schedule(format!(
            "task name length {} exceeds limit {}",
            name.len(),
            TASK_NAME_LENGTH_BYTES_MAX
        )));
    }
    Ok(())
}

// =============================================================================
// Actor Trait
// =============================================================================

/// Context handed to an actor instance
#[derive(Debug, Clone)]
pub struct ActorContext {
    /// The actor's name
    pub id: ActorId,
    /// Entity identity services shared across the runtime
    pub entities: EntityContext,
    /// Clock and other I/O providers
    pub io: IoContext,
}

/// Actor trait - implement to create actors
///
/// # TigerStyle
/// - One instance per installed actor
/// - Tasks are handled one at a time, in dispatch order
#[async_trait]
pub trait Actor: Send + 'static {
    /// Called once, before the first task is accepted
    ///
    /// An error aborts the start; the actor stays installed.
    async fn on_start(&mut self, _ctx: &ActorContext) -> Result<()> {
        Ok(())
    }

    /// Handle one task
    async fn handle(&mut self, ctx: &ActorContext, task: Task) -> Result<Bytes>;
}

// =============================================================================
// Factories and Definitions
// =============================================================================

/// Factory for creating actor instances
pub trait ActorFactory: Send + Sync + 'static {
    /// Create a new actor instance
    fn create(&self, id: &ActorId) -> Box<dyn Actor>;
}

impl<F> ActorFactory for F
where
    F: Fn(&ActorId) -> Box<dyn Actor> + Send + Sync + 'static,
{
    fn create(&self, id: &ActorId) -> Box<dyn Actor> {
        self(id)
    }
}

/// Simple factory that clones a prototype actor
pub struct CloneFactory<A: Actor + Clone + Sync> {
    prototype: A,
}

impl<A: Actor + Clone + Sync> CloneFactory<A> {
    /// Create a new clone factory
    pub fn new(prototype: A) -> Self {
        Self { prototype }
    }
}

impl<A: Actor + Clone + Sync> ActorFactory for CloneFactory<A> {
    fn create(&self, _id: &ActorId) -> Box<dyn Actor> {
        Box::new(self.prototype.clone())
    }
}

/// What to install under an actor name
///
/// Two definitions are equivalent iff their kinds are equal.
#[derive(Clone)]
pub struct ActorDefinition {
    kind: String,
    factory: Arc<dyn ActorFactory>,
    mailbox_depth: Option<usize>,
}

impl ActorDefinition {
    pub fn new(kind: impl Into<String>, factory: impl ActorFactory) -> Self {
        Self::from_shared(kind, Arc::new(factory))
    }

    pub fn from_shared(kind: impl Into<String>, factory: Arc<dyn ActorFactory>) -> Self {
        Self {
            kind: kind.into(),
            factory,
            mailbox_depth: None,
        }
    }

    /// Override the hub's default mailbox depth for this actor
    pub fn with_mailbox_depth(mut self, depth: usize) -> Self {
        self.mailbox_depth = Some(depth);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn mailbox_depth(&self) -> Option<usize> {
        self.mailbox_depth
    }

    pub fn factory(&self) -> &Arc<dyn ActorFactory> {
        &self.factory
    }

    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.kind == other.kind
    }

    pub(crate) fn validate(&self, id: &ActorId) -> Result<()> {
        if self.kind.is_empty() {
            return Err(Error::InvalidActorId {
                id: id.to_string(),
                reason: "definition kind must not be empty".into(),
            });
        }
        if let Some(depth) = self.mailbox_depth {
            if depth == 0 || depth > ACTOR_MAILBOX_DEPTH_MAX {
                return Err(Error::InvalidConfiguration {
                    field: format!("{}.mailbox_depth", id),
                    reason: format!("must be between 1 and {}", ACTOR_MAILBOX_DEPTH_MAX),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ActorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorDefinition")
            .field("kind", &self.kind)
            .field("mailbox_depth", &self.mailbox_depth)
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of an actor name within a hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorState {
    Unregistered,
    Installed,
    Started,
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "unregistered"),
            Self::Installed => write!(f, "installed"),
            Self::Started => write!(f, "started"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_valid() {
        let id = ActorId::new("billing.invoices:eu-1").unwrap();
        assert_eq!(id.as_str(), "billing.invoices:eu-1");
        assert_eq!(id.to_string(), "billing.invoices:eu-1");
    }

    #[test]
    fn test_actor_id_rejects_bad_names() {
        assert!(matches!(ActorId::new(""), Err(Error::InvalidActorId { .. })));
        assert!(matches!(ActorId::new("has space"), Err(Error::InvalidActorId { .. })));
        let long = "a".repeat(ACTOR_NAME_LENGTH_BYTES_MAX + 1);
        assert!(matches!(ActorId::new(long), Err(Error::InvalidActorId { .. })));
    }

    #[test]
    fn test_actor_id_serde_validates() {
        let id: ActorId = serde_json::from_str("\"ledger\"").unwrap();
        assert_eq!(id.as_str(), "ledger");
        assert!(serde_json::from_str::<ActorId>("\"bad name\"").is_err());
    }

    #[test]
    fn test_task_name_validation() {
        assert!(Task::new(TaskId::new(1), "tick", Bytes::new()).is_ok());
        assert!(matches!(
            Task::new(TaskId::new(1), "", Bytes::new()),
            Err(Error::InvalidSchedule { .. })
        ));
    }

    #[derive(Clone)]
    struct Noop;

    #[async_trait]
    impl Actor for Noop {
        async fn handle(&mut self, _ctx: &ActorContext, _task: Task) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    #[test]
    fn test_definition_equivalence_is_by_kind() {
        let a = ActorDefinition::new("worker", CloneFactory::new(Noop));
        let b = ActorDefinition::new("worker", |_: &ActorId| Box::new(Noop) as Box<dyn Actor>)
            .with_mailbox_depth(4);
        let c = ActorDefinition::new("auditor", CloneFactory::new(Noop));

        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_definition_mailbox_depth_bounds() {
        let id = ActorId::new("w").unwrap();
        let zero = ActorDefinition::new("worker", CloneFactory::new(Noop)).with_mailbox_depth(0);
        assert!(zero.validate(&id).is_err());
        let huge = ActorDefinition::new("worker", CloneFactory::new(Noop))
            .with_mailbox_depth(ACTOR_MAILBOX_DEPTH_MAX + 1);
        assert!(huge.validate(&id).is_err());
    }
}
