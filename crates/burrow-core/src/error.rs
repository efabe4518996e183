//! Error types for Burrow
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for Burrow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Burrow error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Entity Errors
    // =========================================================================
    #[error("Invalid entity: {reason}")]
    InvalidEntity { reason: String },

    #[error("Entity id space exhausted after {last_id}")]
    EntityIdsExhausted { last_id: u64 },

    // =========================================================================
    // Identity Policy Errors
    // =========================================================================
    #[error("Policy conflict on {type_name}.{operation}: {chosen} wins over {rejected}")]
    PolicyConflict {
        type_name: String,
        operation: String,
        chosen: String,
        rejected: String,
    },

    #[error("Interception unsupported for type {type_name}: {reason}")]
    InterceptionUnsupportedType { type_name: String, reason: String },

    #[error("Type not declared: {type_name}")]
    TypeNotDeclared { type_name: String },

    #[error("Type redeclared with a different descriptor: {type_name}")]
    TypeRedeclared { type_name: String },

    #[error("Invalid type hierarchy at {type_name}: {reason}")]
    InvalidTypeHierarchy { type_name: String, reason: String },

    // =========================================================================
    // Actor Errors
    // =========================================================================
    #[error("Actor not installed: {id}")]
    ActorNotInstalled { id: String },

    #[error("Actor not started: {id}")]
    ActorNotStarted { id: String },

    #[error("Actor already installed with a different definition: {id}, existing: {existing}, requested: {requested}")]
    ActorAlreadyInstalled {
        id: String,
        existing: String,
        requested: String,
    },

    #[error("Actor start failed: {id}, reason: {reason}")]
    ActorStartFailed { id: String, reason: String },

    #[error("Actor task failed: {id}, task: {task}, reason: {reason}")]
    ActorTaskFailed {
        id: String,
        task: String,
        reason: String,
    },

    #[error("Actor mailbox full: {id}, depth: {depth}")]
    ActorMailboxFull { id: String, depth: usize },

    #[error("Invalid actor ID: {id}, reason: {reason}")]
    InvalidActorId { id: String, reason: String },

    #[error("Actor capacity reached: {count} actors installed, max {max}")]
    ActorCapacityReached { count: usize, max: usize },

    // =========================================================================
    // Scheduling Errors
    // =========================================================================
    #[error("Invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("Scheduled task not found: {schedule_id}")]
    ScheduleNotFound { schedule_id: u64 },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Configuration load failed: {path}, reason: {reason}")]
    ConfigurationLoadFailed { path: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid entity error
    pub fn invalid_entity(reason: impl Into<String>) -> Self {
        Self::InvalidEntity {
            reason: reason.into(),
        }
    }

    /// Create an actor not installed error
    pub fn actor_not_installed(id: impl Into<String>) -> Self {
        Self::ActorNotInstalled { id: id.into() }
    }

    /// Create an actor not started error
    pub fn actor_not_started(id: impl Into<String>) -> Self {
        Self::ActorNotStarted { id: id.into() }
    }

    /// Create an invalid schedule error
    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is retriable
    ///
    /// Nothing in this core is retried automatically; callers in the
    /// task-submission layer may still retry a full mailbox.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ActorMailboxFull { .. })
    }

    /// Check if this error is a dispatch-layer precondition violation
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(
            self,
            Self::ActorNotInstalled { .. } | Self::ActorNotStarted { .. }
        )
    }
}
