use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use taskhub::config::QueueConfig;
use taskhub::db::Database;
use taskhub::errors::TaskhubError;
use taskhub::models::{Analysis, NewTask, TaskStats, TaskStatus};
use taskhub::notify::{BroadcastSink, Notifier};
use taskhub::queue::{TaskGenerator, TaskStore};
use tempfile::TempDir;

fn store(db: Database) -> TaskStore {
    TaskStore::new(db, Notifier::noop(), QueueConfig::default())
}

fn file_db(dir: &TempDir) -> String {
    dir.path().join("queue.db").to_string_lossy().to_string()
}

#[test]
fn test_claim_order_priority_then_fifo() {
    let store = store(Database::in_memory().unwrap());
    let low = store.enqueue(NewTask::new("a", "general", "low").priority(3)).unwrap();
    let first_high = store.enqueue(NewTask::new("a", "general", "high 1").priority(8)).unwrap();
    let second_high = store.enqueue(NewTask::new("a", "general", "high 2").priority(8)).unwrap();
    let default = store.enqueue(NewTask::new("a", "general", "default")).unwrap();

    let order: Vec<String> = std::iter::from_fn(|| store.claim_next("a", "s").unwrap())
        .map(|t| t.id)
        .collect();
    assert_eq!(order, vec![first_high, second_high, default, low]);
}

#[test]
fn test_queue_lifecycle_and_stats() {
    let store = store(Database::in_memory().unwrap());
    let t1 = store.enqueue(NewTask::new("a", "implement_todo", "t1").priority(8)).unwrap();
    let t2 = store.enqueue(NewTask::new("a", "implement_todo", "t2").priority(3)).unwrap();

    let claimed = store.claim_next("a", "s1").unwrap().unwrap();
    assert_eq!(claimed.id, t1);
    assert_eq!(claimed.status, TaskStatus::InProgress);
    assert_eq!(claimed.session_id.as_deref(), Some("s1"));
    assert!(claimed.started_at.is_some());

    let done = store.complete(&t1, json!({"ok": true})).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done.completed_at.is_some());

    assert_eq!(
        store.stats("a").unwrap(),
        TaskStats { total: 2, completed: 1, failed: 0, pending: 1, in_progress: 0 }
    );

    let next = store.claim_next("a", "s1").unwrap().unwrap();
    assert_eq!(next.id, t2);
    assert!(store.claim_next("a", "s1").unwrap().is_none());
}

#[test]
fn test_failures_accumulate_without_requeue() {
    let store = store(Database::in_memory().unwrap());
    let id = store.enqueue(NewTask::new("a", "general", "flaky")).unwrap();
    store.claim_next("a", "s1").unwrap();

    let first = store.fail(&id, "timeout").unwrap();
    let second = store.fail(&id, "timeout again").unwrap();
    assert_eq!(second.retry_count, 2);
    assert_eq!(second.status, TaskStatus::Failed);
    assert_eq!(second.error.as_deref(), Some("timeout again"));
    assert_eq!(second.completed_at, first.completed_at);
    assert!(store.claim_next("a", "s2").unwrap().is_none());

    let requeued = store.requeue(&id).unwrap();
    assert_eq!(requeued.status, TaskStatus::Pending);
    assert_eq!(requeued.retry_count, 2);
    assert_eq!(store.claim_next("a", "s2").unwrap().unwrap().id, id);
}

#[test]
fn test_terminal_tasks_stay_terminal() {
    let store = store(Database::in_memory().unwrap());
    let id = store.enqueue(NewTask::new("a", "general", "once")).unwrap();
    store.complete(&id, json!(null)).unwrap();

    assert!(matches!(store.fail(&id, "late"), Err(TaskhubError::Conflict(_))));
    assert!(matches!(store.start(&id, "s1"), Err(TaskhubError::Conflict(_))));
    assert!(matches!(store.complete(&id, json!(1)), Err(TaskhubError::Conflict(_))));
    assert!(matches!(store.requeue(&id), Err(TaskhubError::Conflict(_))));
}

#[test]
fn test_payloads_survive_storage() {
    let store = store(Database::in_memory().unwrap());
    let context = json!({"file": "src/a.rs", "line": 10, "nested": {"list": [1, 2.5, "x", null]}});
    let result = json!({"changed": ["src/a.rs"], "tests": {"passed": 4}});
    let id = store.enqueue(NewTask::new("a", "general", "payload").context(context.clone())).unwrap();
    store.complete(&id, result.clone()).unwrap();

    let task = store.get(&id).unwrap();
    assert_eq!(task.context, context);
    assert_eq!(task.result, Some(result));
}

#[test]
fn test_enqueue_validation() {
    let store = store(Database::in_memory().unwrap());
    assert!(matches!(store.enqueue(NewTask::new("", "general", "x")), Err(TaskhubError::Validation(_))));
    assert!(matches!(store.enqueue(NewTask::new("a", "general", "")), Err(TaskhubError::Validation(_))));
    assert!(matches!(store.enqueue(NewTask::new("a", "general", "x").priority(11)), Err(TaskhubError::Validation(_))));
    assert!(matches!(store.enqueue(NewTask::new("a", "general", "x").parent("nope")), Err(TaskhubError::NotFound(_))));
    assert!(matches!(store.get("nope"), Err(TaskhubError::NotFound(_))));
}

#[test]
fn test_history_and_active_views() {
    let store = store(Database::in_memory().unwrap());
    for i in 0..5 {
        store.enqueue(NewTask::new("a", "general", format!("task {}", i))).unwrap();
    }
    store.enqueue(NewTask::new("b", "general", "other")).unwrap();
    store.claim_next("a", "s1").unwrap();
    store.claim_next("b", "s2").unwrap();

    let history = store.history("a", Some(3)).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].title, "task 4");

    let active = store.active_across_agents().unwrap();
    let agents: HashSet<String> = active.into_iter().map(|t| t.agent_id).collect();
    assert_eq!(agents, HashSet::from(["a".to_string(), "b".to_string()]));
}

#[test]
fn test_concurrent_claims_from_separate_handles() {
    let dir = TempDir::new().unwrap();
    let path = file_db(&dir);
    let seed = store(Database::new(&path).unwrap());
    let id = seed.enqueue(NewTask::new("a", "general", "only one")).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let path = path.clone();
            thread::spawn(move || {
                let store = store(Database::new(&path).unwrap());
                store.claim_next("a", &format!("session-{}", i)).unwrap()
            })
        })
        .collect();

    let winners: Vec<_> = handles.into_iter().filter_map(|h| h.join().unwrap()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].id, id);

    let stored = seed.get(&id).unwrap();
    assert_eq!(stored.session_id, winners[0].session_id);
}

#[test]
fn test_concurrent_claims_share_one_handle() {
    let store = Arc::new(store(Database::in_memory().unwrap()));
    for i in 0..20 {
        store.enqueue(NewTask::new("a", "general", format!("job {}", i))).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut ids = Vec::new();
                while let Some(task) = store.claim_next("a", &format!("worker-{}", i)).unwrap() {
                    ids.push(task.id);
                }
                ids
            })
        })
        .collect();

    let claimed: Vec<String> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    let unique: HashSet<&String> = claimed.iter().collect();
    assert_eq!(claimed.len(), 20);
    assert_eq!(unique.len(), 20);
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = file_db(&dir);
    let id = store(Database::new(&path).unwrap())
        .enqueue(NewTask::new("a", "general", "durable").priority(9))
        .unwrap();

    let reopened = store(Database::new(&path).unwrap());
    let task = reopened.get(&id).unwrap();
    assert_eq!(task.priority, 9);
    assert_eq!(task.status, TaskStatus::Pending);
}

#[test]
fn test_generator_priority_policy() {
    let store = store(Database::in_memory().unwrap());
    let generator = TaskGenerator::new(store.clone(), false);
    let analysis: Analysis = serde_json::from_value(json!({
        "todos": [{"file": "src/lib.rs", "line": 3, "text": "handle errors"}],
        "coverage": {"lowCoverage": [{"file": "src/db.rs", "coverage": 41.5}]},
        "quality": {"issues": [
            {"file": "a.rs", "line": 1, "type": "complexity", "message": "too deep", "severity": "high"},
            {"file": "b.rs", "line": 2, "type": "style", "message": "long line", "severity": "low"}
        ]}
    }))
    .unwrap();

    let ids = generator.generate("coder", &analysis).unwrap();
    assert_eq!(ids.len(), 4);

    let priorities: Vec<(String, i64)> = ids
        .iter()
        .map(|id| store.get(id).unwrap())
        .map(|t| (t.task_type, t.priority))
        .collect();
    assert_eq!(priorities, vec![
        ("implement_todo".to_string(), 6),
        ("improve_coverage".to_string(), 7),
        ("fix_quality".to_string(), 8),
        ("fix_quality".to_string(), 5),
    ]);

    // Highest priority first when the agent starts pulling
    let first = store.claim_next("coder", "s").unwrap().unwrap();
    assert_eq!(first.context["severity"], "high");
}

#[test]
fn test_generator_dedup_skips_open_findings() {
    let store = store(Database::in_memory().unwrap());
    let generator = TaskGenerator::new(store.clone(), true);
    let analysis: Analysis = serde_json::from_value(json!({
        "todos": [{"file": "src/lib.rs", "line": 3, "text": "handle errors"}]
    }))
    .unwrap();

    assert_eq!(generator.generate("coder", &analysis).unwrap().len(), 1);
    assert!(generator.generate("coder", &analysis).unwrap().is_empty());
    assert_eq!(generator.generate("reviewer", &analysis).unwrap().len(), 1);
}

#[test]
fn test_concurrent_dedup_generation_inserts_once() {
    let store = store(Database::in_memory().unwrap());
    let analysis: Analysis = serde_json::from_value(json!({
        "todos": [{"file": "src/lib.rs", "line": 3, "text": "handle errors"}],
        "coverage": {"lowCoverage": [{"file": "src/db.rs", "coverage": 12.0}]}
    }))
    .unwrap();
    let analysis = Arc::new(analysis);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let generator = TaskGenerator::new(store.clone(), true);
            let analysis = Arc::clone(&analysis);
            thread::spawn(move || generator.generate("coder", &analysis).unwrap())
        })
        .collect();

    let created: usize = handles.into_iter().map(|h| h.join().unwrap().len()).sum();
    assert_eq!(created, 2);
    assert_eq!(store.stats("coder").unwrap().pending, 2);
}

#[test]
fn test_long_titles_are_cut() {
    let store = store(Database::in_memory().unwrap());
    let long = "x".repeat(300);
    let id = store.enqueue(NewTask::new("a", "general", format!("  {}  ", long))).unwrap();

    let title = store.get(&id).unwrap().title;
    assert_eq!(title, format!("{}...", "x".repeat(120)));
}

#[tokio::test]
async fn test_store_events_reach_subscribers() {
    let sink = BroadcastSink::new(16);
    let mut rx = sink.subscribe();
    let store = TaskStore::new(Database::in_memory().unwrap(), Notifier::new(Arc::new(sink)), QueueConfig::default());

    let id = store.enqueue(NewTask::new("a", "general", "observed")).unwrap();
    store.claim_next("a", "s1").unwrap();
    store.fail(&id, "boom").unwrap();

    let enqueued = rx.recv().await.unwrap().to_json().unwrap();
    assert_eq!(enqueued["event"], "task_enqueued");
    assert_eq!(enqueued["task_id"], id.as_str());
    assert!(enqueued["timestamp"].is_string());
    assert_eq!(rx.recv().await.unwrap().name(), "task_started");

    let failed = rx.recv().await.unwrap().to_json().unwrap();
    assert_eq!(failed["event"], "task_failed");
    assert_eq!(failed["retry_count"], 1);
}
