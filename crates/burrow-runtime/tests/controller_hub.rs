//! Controller hub lifecycle and dispatch
//!
//! TigerStyle: Exactly one instance per started actor, FIFO per actor.

use async_trait::async_trait;
use bytes::Bytes;
use burrow_core::config::ActorConfig;
use burrow_core::error::{Error, Result};
use burrow_core::io::IoContext;
use burrow_entities::EntityContext;
use burrow_runtime::{
    Actor, ActorContext, ActorDefinition, ActorId, ActorState, ControllerHub, Task, TaskId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

fn hub() -> Arc<ControllerHub> {
    Arc::new(ControllerHub::new(
        ActorConfig::default(),
        EntityContext::default(),
        IoContext::production(),
    ))
}

fn id(name: &str) -> ActorId {
    ActorId::new(name).unwrap()
}

fn task(n: u64) -> Task {
    Task::new(TaskId::new(n), format!("task-{}", n), Bytes::new()).unwrap()
}

/// Records the order tasks are handled in
struct Recorder {
    seen: Arc<Mutex<Vec<u64>>>,
}

#[async_trait]
impl Actor for Recorder {
    async fn handle(&mut self, _ctx: &ActorContext, task: Task) -> Result<Bytes> {
        self.seen.lock().unwrap().push(task.id.as_u64());
        Ok(Bytes::new())
    }
}

/// Definition whose factory counts created instances
fn counted_definition(created: Arc<AtomicUsize>) -> ActorDefinition {
    ActorDefinition::new("recorder", move |_: &ActorId| {
        created.fetch_add(1, Ordering::SeqCst);
        Box::new(Recorder {
            seen: Arc::new(Mutex::new(Vec::new())),
        }) as Box<dyn Actor>
    })
}

#[tokio::test]
async fn test_install_twice_then_start_creates_one_instance() {
    let hub = hub();
    let created = Arc::new(AtomicUsize::new(0));
    let actor = id("worker");

    hub.install(actor.clone(), counted_definition(created.clone())).unwrap();
    hub.install(actor.clone(), counted_definition(created.clone())).unwrap();
    assert_eq!(hub.installed_count(), 1);
    assert_eq!(created.load(Ordering::SeqCst), 0);

    hub.start(&actor).await.unwrap();
    hub.start(&actor).await.unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(hub.started_count(), 1);
    assert_eq!(hub.state(&actor), ActorState::Started);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_create_one_instance() {
    let hub = hub();
    let created = Arc::new(AtomicUsize::new(0));
    let actor = id("worker");
    hub.install(actor.clone(), counted_definition(created.clone())).unwrap();

    let starts: Vec<_> = (0..16)
        .map(|_| {
            let hub = Arc::clone(&hub);
            let actor = actor.clone();
            tokio::spawn(async move { hub.start(&actor).await })
        })
        .collect();
    for start in starts {
        start.await.unwrap().unwrap();
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(hub.started_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_installs_register_one_slot() {
    let hub = hub();
    let created = Arc::new(AtomicUsize::new(0));
    let actor = id("worker");

    let installs: Vec<_> = (0..16)
        .map(|_| {
            let hub = Arc::clone(&hub);
            let actor = actor.clone();
            let definition = counted_definition(Arc::clone(&created));
            tokio::spawn(async move { hub.install(actor, definition) })
        })
        .collect();
    for install in installs {
        install.await.unwrap().unwrap();
    }

    assert_eq!(hub.installed_count(), 1);
    assert_eq!(hub.state(&actor), ActorState::Installed);
    assert_eq!(created.load(Ordering::SeqCst), 0);

    hub.start(&actor).await.unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(hub.started_count(), 1);
}

#[tokio::test]
async fn test_start_before_install_fails() {
    let hub = hub();
    let err = hub.start(&id("ghost")).await.unwrap_err();
    assert!(matches!(err, Error::ActorNotInstalled { .. }));
}

#[tokio::test]
async fn test_dispatch_before_install_fails() {
    let hub = hub();
    let err = hub.dispatch(task(1), &id("ghost")).unwrap_err();
    assert!(matches!(err, Error::ActorNotInstalled { .. }));
    assert!(err.is_lifecycle_violation());
}

#[tokio::test]
async fn test_dispatch_before_start_fails() {
    let hub = hub();
    let actor = id("worker");
    hub.install(actor.clone(), counted_definition(Arc::new(AtomicUsize::new(0))))
        .unwrap();

    let err = hub.dispatch(task(1), &actor).unwrap_err();
    assert!(matches!(err, Error::ActorNotStarted { .. }));
}

#[tokio::test]
async fn test_tasks_run_in_dispatch_order() {
    let hub = hub();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let actor = id("ordered");
    let shared = Arc::clone(&seen);
    hub.install(
        actor.clone(),
        ActorDefinition::new("recorder", move |_: &ActorId| {
            Box::new(Recorder {
                seen: Arc::clone(&shared),
            }) as Box<dyn Actor>
        }),
    )
    .unwrap();
    hub.start(&actor).await.unwrap();

    let receipts: Vec<_> = (1..=50)
        .map(|n| hub.dispatch(task(n), &actor).unwrap())
        .collect();
    for receipt in receipts {
        receipt.wait().await.unwrap();
    }

    assert_eq!(*seen.lock().unwrap(), (1..=50).collect::<Vec<u64>>());
}

/// Fails its first start
struct FlakyStart {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Actor for FlakyStart {
    async fn on_start(&mut self, _ctx: &ActorContext) -> Result<()> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(Error::internal("warming up"));
        }
        Ok(())
    }

    async fn handle(&mut self, _ctx: &ActorContext, _task: Task) -> Result<Bytes> {
        Ok(Bytes::from_static(b"ok"))
    }
}

#[tokio::test]
async fn test_failed_start_leaves_actor_installed() {
    let hub = hub();
    let attempts = Arc::new(AtomicUsize::new(0));
    let actor = id("flaky");
    let shared = Arc::clone(&attempts);
    hub.install(
        actor.clone(),
        ActorDefinition::new("flaky", move |_: &ActorId| {
            Box::new(FlakyStart {
                attempts: Arc::clone(&shared),
            }) as Box<dyn Actor>
        }),
    )
    .unwrap();

    let err = hub.start(&actor).await.unwrap_err();
    assert!(matches!(err, Error::ActorStartFailed { .. }));
    assert_eq!(hub.state(&actor), ActorState::Installed);
    assert!(matches!(
        hub.dispatch(task(1), &actor),
        Err(Error::ActorNotStarted { .. })
    ));

    hub.start(&actor).await.unwrap();
    let reply = hub.dispatch(task(2), &actor).unwrap().wait().await.unwrap();
    assert_eq!(reply, Bytes::from_static(b"ok"));
}

/// Blocks each task until released
struct Gate {
    entered: mpsc::UnboundedSender<u64>,
    release: Arc<Notify>,
}

#[async_trait]
impl Actor for Gate {
    async fn handle(&mut self, _ctx: &ActorContext, task: Task) -> Result<Bytes> {
        let _ = self.entered.send(task.id.as_u64());
        self.release.notified().await;
        Ok(Bytes::new())
    }
}

#[tokio::test]
async fn test_full_mailbox_rejects_dispatch() {
    let hub = hub();
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let release = Arc::new(Notify::new());
    let actor = id("gated");
    let gate_release = Arc::clone(&release);
    hub.install(
        actor.clone(),
        ActorDefinition::new("gate", move |_: &ActorId| {
            Box::new(Gate {
                entered: entered_tx.clone(),
                release: Arc::clone(&gate_release),
            }) as Box<dyn Actor>
        })
        .with_mailbox_depth(1),
    )
    .unwrap();
    hub.start(&actor).await.unwrap();

    let first = hub.dispatch(task(1), &actor).unwrap();
    assert_eq!(entered_rx.recv().await, Some(1));

    // The loop holds task 1; task 2 fills the only slot
    let second = hub.dispatch(task(2), &actor).unwrap();
    assert_eq!(hub.pending_tasks(&actor), Some(1));
    let err = hub.dispatch(task(3), &actor).unwrap_err();
    assert!(matches!(err, Error::ActorMailboxFull { depth: 1, .. }));

    release.notify_one();
    first.wait().await.unwrap();
    assert_eq!(entered_rx.recv().await, Some(2));
    release.notify_one();
    second.wait().await.unwrap();
}

/// Fails every task
struct Failing;

#[async_trait]
impl Actor for Failing {
    async fn handle(&mut self, _ctx: &ActorContext, _task: Task) -> Result<Bytes> {
        Err(Error::internal("boom"))
    }
}

#[tokio::test]
async fn test_task_failure_is_reported_and_actor_keeps_running() {
    let hub = hub();
    let actor = id("failing");
    hub.install(
        actor.clone(),
        ActorDefinition::new("failing", |_: &ActorId| Box::new(Failing) as Box<dyn Actor>),
    )
    .unwrap();
    hub.start(&actor).await.unwrap();

    for n in 1..=3 {
        let err = hub.dispatch(task(n), &actor).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, Error::ActorTaskFailed { .. }));
    }
    assert_eq!(hub.state(&actor), ActorState::Started);
}
