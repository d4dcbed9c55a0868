//! Integration tests for FlowManager scheduling semantics.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use terrabatch_config::{ActionConfiguration, PropertySchema};
use terrabatch_flow::{
    Action, ActionError, ActionService, BaseAction, ConsumerStatus, Event, EventQueue, FlowConfig,
    FlowManager,
};

/// Test double: passes events through, optionally failing or blocking on a
/// release flag first.
struct StubAction {
    base: BaseAction,
    fail: bool,
    release: Option<Arc<AtomicBool>>,
}

impl Action for StubAction {
    fn base(&self) -> &BaseAction {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseAction {
        &mut self.base
    }

    fn execute(&mut self, events: EventQueue) -> Result<EventQueue, ActionError> {
        if let Some(release) = &self.release {
            while !release.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        if self.fail {
            return Err(ActionError::new(self.base.name(), "stub failure"));
        }
        Ok(events)
    }
}

struct StubService {
    fail: bool,
    release: Option<Arc<AtomicBool>>,
}

impl StubService {
    fn passthrough() -> Self {
        Self {
            fail: false,
            release: None,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            release: None,
        }
    }

    fn gated(release: Arc<AtomicBool>) -> Self {
        Self {
            fail: false,
            release: Some(release),
        }
    }
}

impl ActionService for StubService {
    fn schema(&self) -> PropertySchema {
        PropertySchema::new().scalar("suffix")
    }

    fn create_action(&self, config: ActionConfiguration) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(StubAction {
            base: BaseAction::new(&config),
            fail: self.fail,
            release: self.release.clone(),
        }))
    }
}

fn test_manager(dir: &Path, max_parallel: usize) -> FlowManager {
    let config = FlowConfig {
        working_dir: dir.join("work"),
        max_parallel,
        ..Default::default()
    };
    FlowManager::new(config).expect("manager init failed")
}

fn stub_config(fail_ignored: bool) -> ActionConfiguration {
    let mut config = ActionConfiguration::new("cfg", "stub", "stub action");
    config.set_fail_ignored(fail_ignored);
    config
}

async fn wait_terminal(manager: &FlowManager, id: uuid::Uuid) -> ConsumerStatus {
    for _ in 0..400 {
        match manager.get_status(id) {
            ConsumerStatus::Created | ConsumerStatus::Running => {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            terminal => return terminal,
        }
    }
    panic!("consumer {id} did not reach a terminal status");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_action_completes_and_forwards_events() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path(), 4);
    let service = StubService::passthrough();

    let id = manager
        .run_action(&service, stub_config(false), vec![Event::added("/data/in.tif")])
        .unwrap();

    assert_eq!(wait_terminal(&manager, id).await, ConsumerStatus::Completed);
    let consumer = manager.consumer(id).unwrap();
    assert_eq!(consumer.output_events(), vec![Event::added("/data/in.tif")]);
    assert!(consumer.pending_events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_action_yields_failed_status() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path(), 4);

    let id = manager
        .run_action(
            &StubService::failing(),
            stub_config(false),
            vec![Event::added("/data/in.tif")],
        )
        .unwrap();

    assert_eq!(wait_terminal(&manager, id).await, ConsumerStatus::Failed);
    assert!(manager
        .consumer(id)
        .unwrap()
        .failure()
        .unwrap()
        .contains("stub failure"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fail_ignored_action_yields_completed_with_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path(), 4);

    let id = manager
        .run_action(
            &StubService::failing(),
            stub_config(true),
            vec![Event::added("/data/in.tif")],
        )
        .unwrap();

    assert_eq!(wait_terminal(&manager, id).await, ConsumerStatus::Completed);
    assert_eq!(
        manager.consumer(id).unwrap().output_events(),
        vec![Event::added("/data/in.tif")]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_produce_distinct_visible_consumers() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(test_manager(dir.path(), 1));
    let release = Arc::new(AtomicBool::new(false));
    let service = Arc::new(StubService::gated(release.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = manager.clone();
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            manager
                .run_action(
                    service.as_ref(),
                    stub_config(false),
                    vec![Event::added(format!("/data/in-{i}.tif"))],
                )
                .unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 8);

    // Every consumer is visible; the ones the single-permit pool has not
    // started yet still hold their initiating event.
    for id in &ids {
        let consumer = manager.consumer(*id).unwrap();
        match consumer.status() {
            ConsumerStatus::Created => {
                assert_eq!(consumer.pending_events().len(), 1);
            }
            ConsumerStatus::Running | ConsumerStatus::Completed => {}
            other => panic!("unexpected status {other}"),
        }
    }

    release.store(true, Ordering::SeqCst);
    for id in ids {
        assert_eq!(wait_terminal(&manager, id).await, ConsumerStatus::Completed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn status_of_unknown_id_is_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path(), 4);
    assert_eq!(
        manager.get_status(uuid::Uuid::new_v4()),
        ConsumerStatus::Unknown
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dispose_is_idempotent_and_forgets_the_consumer() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path(), 4);

    let id = manager
        .run_action(
            &StubService::passthrough(),
            stub_config(false),
            vec![Event::added("/data/in.tif")],
        )
        .unwrap();
    wait_terminal(&manager, id).await;

    manager.dispose(id);
    assert_eq!(manager.get_status(id), ConsumerStatus::Unknown);

    // Second dispose is a no-op.
    manager.dispose(id);
    assert_eq!(manager.get_status(id), ConsumerStatus::Unknown);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_consumer_gets_its_own_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path(), 4);
    let service = StubService::passthrough();

    let a = manager
        .run_action(&service, stub_config(false), vec![Event::added("/a")])
        .unwrap();
    let b = manager
        .run_action(&service, stub_config(false), vec![Event::added("/b")])
        .unwrap();

    let dir_a = manager.consumer(a).unwrap().working_dir().to_path_buf();
    let dir_b = manager.consumer(b).unwrap().working_dir().to_path_buf();
    assert_ne!(dir_a, dir_b);
    assert!(dir_a.exists());
    assert!(dir_b.exists());
}
