//! End-to-end tests: key/value request -> bound configuration -> consumer
//! run -> status, through the management boundary.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use terrabatch_flow::{ConsumerStatus, Event, FlowConfig, FlowManager};
use terrabatch_script::ScriptActionService;
use terrabatch_service::{ActionManager, ServiceError, INPUT_KEY, SERVICE_ID_KEY};

fn manager_with_script_service(dir: &Path) -> ActionManager {
    let flow = FlowManager::new(FlowConfig {
        working_dir: dir.join("work"),
        ..Default::default()
    })
    .expect("flow manager init failed");
    let manager = ActionManager::new(Arc::new(flow));
    manager
        .registry()
        .register("scriptService", Arc::new(ScriptActionService::new()));
    manager
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn wait_terminal(manager: &ActionManager, id: &str) -> ConsumerStatus {
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

fn write_script(dir: &Path, body: &str) -> String {
    let script = dir.join("run.rhai");
    std::fs::write(&script, body).unwrap();
    script.display().to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn script_request_produces_one_added_output_event() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());
    let script_file = write_script(
        dir.path(),
        r#"
fn execute(config, input, progress) {
    progress.set_task("warping " + input);
    ["/data/out.tif"]
}
"#,
    );

    let id = manager
        .run_action(
            "scriptService",
            params(&[
                (INPUT_KEY, "/data/in.tif"),
                ("script_file", script_file.as_str()),
                ("language", "rhai"),
            ]),
        )
        .unwrap();

    assert_eq!(wait_terminal(&manager, &id).await, ConsumerStatus::Completed);

    let consumer = manager
        .flow()
        .consumer(id.parse().unwrap())
        .expect("consumer still registered");
    assert_eq!(consumer.output_events(), vec![Event::added("/data/out.tif")]);
    assert!(consumer.pending_events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn call_action_extracts_service_id_from_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());
    let script_file = write_script(dir.path(), "fn execute(config, input, progress) { [] }");

    let id = manager
        .call_action(params(&[
            (SERVICE_ID_KEY, "scriptService"),
            (INPUT_KEY, "/data/in.tif"),
            ("script_file", script_file.as_str()),
        ]))
        .unwrap();

    assert_eq!(wait_terminal(&manager, &id).await, ConsumerStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn absent_script_file_ends_failed_with_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());
    let absent = dir.path().join("absent.rhai").display().to_string();

    let id = manager
        .run_action(
            "scriptService",
            params(&[(INPUT_KEY, "/data/in.tif"), ("script_file", absent.as_str())]),
        )
        .unwrap();

    assert_eq!(wait_terminal(&manager, &id).await, ConsumerStatus::Failed);
    let consumer = manager.flow().consumer(id.parse().unwrap()).unwrap();
    assert!(consumer.output_events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fail_ignored_script_failure_completes_with_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());
    let absent = dir.path().join("absent.rhai").display().to_string();

    let id = manager
        .run_action(
            "scriptService",
            params(&[
                (INPUT_KEY, "/data/in.tif"),
                ("script_file", absent.as_str()),
                ("failIgnored", "true"),
            ]),
        )
        .unwrap();

    assert_eq!(wait_terminal(&manager, &id).await, ConsumerStatus::Completed);
    let consumer = manager.flow().consumer(id.parse().unwrap()).unwrap();
    assert_eq!(consumer.output_events(), vec![Event::added("/data/in.tif")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn missing_input_key_fails_before_any_consumer_exists() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());

    let err = manager
        .run_action("scriptService", params(&[("script_file", "x.rhai")]))
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingKey(INPUT_KEY)));
    assert!(manager.flow().consumer_ids().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_service_id_in_call_action_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());

    let err = manager
        .call_action(params(&[(SERVICE_ID_KEY, ""), (INPUT_KEY, "/data/in.tif")]))
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingKey(SERVICE_ID_KEY)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_service_id_is_rejected_without_a_consumer() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());

    let err = manager
        .run_action("noSuchService", params(&[(INPUT_KEY, "/data/in.tif")]))
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownService(id) if id == "noSuchService"));
    assert!(manager.flow().consumer_ids().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_and_malformed_ids_answer_unknown_status() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());

    assert_eq!(
        manager.get_status(&uuid::Uuid::new_v4().to_string()),
        ConsumerStatus::Unknown
    );
    assert_eq!(manager.get_status("not-a-uuid"), ConsumerStatus::Unknown);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dispose_twice_is_a_no_op_the_second_time() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with_script_service(dir.path());
    let script_file = write_script(dir.path(), "fn execute(config, input, progress) { [] }");

    let id = manager
        .run_action(
            "scriptService",
            params(&[(INPUT_KEY, "/data/in.tif"), ("script_file", script_file.as_str())]),
        )
        .unwrap();
    wait_terminal(&manager, &id).await;

    manager.dispose_action(&id);
    assert_eq!(manager.get_status(&id), ConsumerStatus::Unknown);
    manager.dispose_action(&id);
    manager.dispose_action("not-a-uuid");
    assert_eq!(manager.get_status(&id), ConsumerStatus::Unknown);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_yield_distinct_consumer_ids() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager_with_script_service(dir.path()));
    let script_file = write_script(dir.path(), "fn execute(config, input, progress) { [] }");

    let mut handles = Vec::new();
    for i in 0..6 {
        let manager = manager.clone();
        let script_file = script_file.clone();
        handles.push(tokio::spawn(async move {
            let input = format!("/data/in-{i}.tif");
            manager
                .run_action(
                    "scriptService",
                    params(&[
                        (INPUT_KEY, input.as_str()),
                        ("script_file", script_file.as_str()),
                    ]),
                )
                .unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 6);
    for id in ids {
        assert_eq!(wait_terminal(&manager, &id).await, ConsumerStatus::Completed);
    }
}
