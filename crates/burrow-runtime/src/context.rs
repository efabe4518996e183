//! Runtime context
//!
//! TigerStyle: Single entry point, explicit configuration.
//!
//! Bundles every runtime service behind one value built from
//! `BurrowConfig`. Nothing is stored in ambient or thread-local state.

use crate::hub::ControllerHub;
use crate::scheduler::TaskScheduler;
use burrow_core::config::BurrowConfig;
use burrow_core::error::{Error, Result};
use burrow_core::io::IoContext;
use burrow_entities::EntityContext;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// All runtime services
#[derive(Clone, Debug)]
pub struct RuntimeContext {
    pub config: BurrowConfig,
    pub io: IoContext,
    pub entities: EntityContext,
    pub hub: Arc<ControllerHub>,
    pub scheduler: Arc<TaskScheduler>,
}

impl RuntimeContext {
    /// Build on the production wall clock
    pub fn from_config(config: BurrowConfig) -> Result<Self> {
        Self::with_io(config, IoContext::production())
    }

    /// Build on explicit I/O providers
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the configuration does not validate.
    pub fn with_io(config: BurrowConfig, io: IoContext) -> Result<Self> {
        config.validate()?;

        let entities = EntityContext::from_config(&config.entities);
        let hub = Arc::new(ControllerHub::new(
            config.actor.clone(),
            entities.clone(),
            io.clone(),
        ));
        let scheduler = Arc::new(TaskScheduler::new(
            Arc::clone(&hub),
            io.clone(),
            config.scheduler.clone(),
        ));

        info!(
            max_actors = config.actor.max_actors_count,
            mailbox_depth = config.actor.mailbox_depth,
            tick_ms = config.scheduler.tick_ms,
            "Runtime context created"
        );

        Ok(Self {
            config,
            io,
            entities,
            hub,
            scheduler,
        })
    }

    /// Run the task scheduler loop in the background
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn_scheduler(&self) -> SchedulerTask {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(&self.scheduler);
        let task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        SchedulerTask { shutdown_tx, task }
    }
}

/// Handle to a background scheduler loop
#[derive(Debug)]
pub struct SchedulerTask {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerTask {
    /// Stop the loop and wait for it to exit
    ///
    /// A pass already running completes first.
    pub async fn stop(self) -> Result<()> {
        // The loop also exits when the sender is dropped
        let _ = self.shutdown_tx.send(true);
        self.task
            .await
            .map_err(|e| Error::internal(format!("scheduler task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BurrowConfig::default();
        config.scheduler.tick_ms = 0;
        assert!(matches!(
            RuntimeContext::from_config(config),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_services_share_entity_context() {
        let ctx = RuntimeContext::from_config(BurrowConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&ctx.entities.registry, &ctx.hub.entities().registry));
        assert_eq!(ctx.hub.installed_count(), 0);
        assert_eq!(ctx.scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_scheduler_task_stops() {
        let ctx = RuntimeContext::from_config(BurrowConfig::default()).unwrap();
        let task = ctx.spawn_scheduler();
        task.stop().await.unwrap();
    }
}
