//! Configuration for Burrow
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for Burrow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurrowConfig {
    /// Entity identity configuration
    #[serde(default)]
    pub entities: EntityConfig,

    /// Actor hub configuration
    #[serde(default)]
    pub actor: ActorConfig,

    /// Task scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl BurrowConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.entities.validate()?;
        self.actor.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::InvalidConfiguration {
            field: "<document>".into(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::ConfigurationLoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_toml_str(&content)
    }
}

/// How diamond-shaped ancestry with differing identity decisions is resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestryTieBreak {
    /// The first declared supertype with a decision wins; the conflict is logged
    #[default]
    FirstDeclared,
    /// Installation fails with a policy conflict
    Reject,
}

/// Entity identity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Largest entity id already in use; allocation continues after it
    #[serde(default = "default_id_largest_used")]
    pub id_largest_used: u64,

    /// Tie-break for conflicting decisions inherited from several supertypes
    #[serde(default)]
    pub ancestry_tie_break: AncestryTieBreak,
}

fn default_id_largest_used() -> u64 {
    ENTITY_ID_LARGEST_USED_DEFAULT
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            id_largest_used: default_id_largest_used(),
            ancestry_tie_break: AncestryTieBreak::default(),
        }
    }
}

impl EntityConfig {
    fn validate(&self) -> Result<()> {
        if self.id_largest_used == u64::MAX {
            return Err(Error::InvalidConfiguration {
                field: "entities.id_largest_used".into(),
                reason: "no ids left to allocate".into(),
            });
        }
        Ok(())
    }
}

/// Actor hub configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Maximum installed actors per hub
    #[serde(default = "default_max_actors")]
    pub max_actors_count: usize,

    /// Default mailbox depth for actors whose definition sets none
    #[serde(default = "default_mailbox_depth")]
    pub mailbox_depth: usize,
}

fn default_max_actors() -> usize {
    ACTOR_INSTALLED_COUNT_MAX
}

fn default_mailbox_depth() -> usize {
    ACTOR_MAILBOX_DEPTH_DEFAULT
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            max_actors_count: default_max_actors(),
            mailbox_depth: default_mailbox_depth(),
        }
    }
}

impl ActorConfig {
    fn validate(&self) -> Result<()> {
        if self.max_actors_count == 0 || self.max_actors_count > ACTOR_INSTALLED_COUNT_MAX {
            return Err(Error::InvalidConfiguration {
                field: "actor.max_actors_count".into(),
                reason: format!(
                    "{} must be in 1..={}",
                    self.max_actors_count, ACTOR_INSTALLED_COUNT_MAX
                ),
            });
        }

        if self.mailbox_depth == 0 || self.mailbox_depth > ACTOR_MAILBOX_DEPTH_MAX {
            return Err(Error::InvalidConfiguration {
                field: "actor.mailbox_depth".into(),
                reason: format!(
                    "{} must be in 1..={}",
                    self.mailbox_depth, ACTOR_MAILBOX_DEPTH_MAX
                ),
            });
        }

        Ok(())
    }
}

/// Task scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Polling interval of the background loop (milliseconds)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Maximum number of pending scheduled tasks
    #[serde(default = "default_pending_max")]
    pub pending_count_max: usize,
}

fn default_tick_ms() -> u64 {
    SCHEDULER_TICK_MS_DEFAULT
}

fn default_pending_max() -> usize {
    SCHEDULER_PENDING_COUNT_MAX
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            pending_count_max: default_pending_max(),
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 || self.tick_ms > SCHEDULER_TICK_MS_MAX {
            return Err(Error::InvalidConfiguration {
                field: "scheduler.tick_ms".into(),
                reason: format!("{} must be in 1..={}", self.tick_ms, SCHEDULER_TICK_MS_MAX),
            });
        }

        if self.pending_count_max == 0 {
            return Err(Error::InvalidConfiguration {
                field: "scheduler.pending_count_max".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(())
    }
}
