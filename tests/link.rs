use serde_json::json;
use taskhub::config::TaskhubConfig;
use taskhub::db::Database;
use taskhub::errors::TaskhubError;
use taskhub::hub::Hub;
use taskhub::models::{RequestStatus, TaskStatus};
use tempfile::TempDir;

fn hub() -> Hub {
    Hub::build(Database::in_memory().unwrap(), &TaskhubConfig::default()).unwrap()
}

#[test]
fn test_terminal_report_closes_task_without_set_status() {
    let hub = hub();
    let id = hub.link.assign("planner", "coder", "implement login", None).unwrap();
    hub.link.report("coder", &id, TaskStatus::Completed, "login implemented", Some(json!({"files": 2}))).unwrap();

    let task = hub.link.get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result.as_deref(), Some("login implemented"));
    assert!(task.completed_at.is_some());
    assert!(hub.link.active_agent_tasks().unwrap().is_empty());
}

#[test]
fn test_direct_and_reported_completion_agree() {
    let hub = hub();
    let direct = hub.link.assign("planner", "coder", "a", None).unwrap();
    let reported = hub.link.assign("planner", "coder", "b", None).unwrap();

    for id in [&direct, &reported] {
        hub.link.set_status(id, TaskStatus::InProgress, None).unwrap();
    }
    hub.link.set_status(&direct, TaskStatus::Completed, Some("shipped")).unwrap();
    hub.link.report("coder", &reported, TaskStatus::Completed, "shipped", None).unwrap();

    let a = hub.link.get(&direct).unwrap();
    let b = hub.link.get(&reported).unwrap();
    assert_eq!((a.status, a.result.clone()), (b.status, b.result.clone()));
    assert!(a.started_at.is_some() && b.started_at.is_some());
    assert!(a.completed_at.is_some() && b.completed_at.is_some());
}

#[test]
fn test_completed_delegation_is_final() {
    let hub = hub();
    let id = hub.link.assign("planner", "coder", "a", None).unwrap();
    let done = hub.link.set_status(&id, TaskStatus::Completed, Some("ok")).unwrap();

    assert!(matches!(hub.link.set_status(&id, TaskStatus::Failed, None), Err(TaskhubError::Conflict(_))));

    // A late report is still recorded but changes nothing
    hub.link.report("coder", &id, TaskStatus::Failed, "regressed", None).unwrap();
    let task = hub.link.get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.completed_at, done.completed_at);
    assert_eq!(hub.link.history("coder").unwrap().reports.len(), 1);
}

#[test]
fn test_unknown_delegation() {
    let hub = hub();
    assert!(matches!(hub.link.get("ghost"), Err(TaskhubError::NotFound(_))));
    assert!(matches!(hub.link.set_status("ghost", TaskStatus::Completed, None), Err(TaskhubError::NotFound(_))));
    assert!(hub.link.report("coder", "ghost", TaskStatus::Completed, "orphan", None).is_ok());
}

#[test]
fn test_agent_history_covers_all_roles() {
    let hub = hub();
    let received = hub.link.assign("planner", "coder", "build", None).unwrap();
    let sent = hub.link.assign("coder", "tester", "test", None).unwrap();
    hub.link.report("coder", &received, TaskStatus::InProgress, "halfway", None).unwrap();
    let request = hub.link.request_capability("coder", "security-auditor", &["owasp".to_string()]).unwrap();

    let history = hub.link.history("coder").unwrap();
    assert_eq!(history.received.iter().map(|t| &t.task_id).collect::<Vec<_>>(), vec![&received]);
    assert_eq!(history.sent.iter().map(|t| &t.task_id).collect::<Vec<_>>(), vec![&sent]);
    assert_eq!(history.reports[0].summary, "halfway");
    assert_eq!(history.requests[0].request_id, request);
    assert_eq!(history.requests[0].status, RequestStatus::Pending);
}

#[test]
fn test_request_resolution_is_one_shot() {
    let hub = hub();
    let id = hub.link.request_capability("coder", "dba", &[]).unwrap();
    assert_eq!(hub.link.pending_requests().unwrap().len(), 1);

    let rejected = hub.link.resolve_request(&id, false, json!({"reason": "no budget"})).unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert!(rejected.responded_at.is_some());
    assert!(matches!(hub.link.resolve_request(&id, true, json!({})), Err(TaskhubError::Conflict(_))));
}

#[test]
fn test_journal_is_visible_to_another_handle() {
    let dir = TempDir::new().unwrap();
    let mut config = TaskhubConfig::default();
    config.database.path = dir.path().join("hub.db").to_string_lossy().to_string();

    let writer = Hub::open(&config).unwrap();
    let id = writer.link.assign("planner", "coder", "observe me", None).unwrap();
    writer.link.report("coder", &id, TaskStatus::Failed, "could not", None).unwrap();

    let observer = Database::new(&config.database.path).unwrap();
    let events = observer.list_events(0, 10).unwrap();
    let names: Vec<&str> = events.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(names, vec!["agent_task_assigned", "report_submitted"]);
    assert_eq!(events[1].payload["task_status"], "failed");
    assert_eq!(events[1].payload["task_id"], id.as_str());

    let after_first = observer.list_events(events[0].id, 10).unwrap();
    assert_eq!(after_first.len(), 1);
}

#[tokio::test]
async fn test_link_events_in_order() {
    let hub = hub();
    let mut rx = hub.subscribe();

    let id = hub.link.assign("planner", "coder", "a", None).unwrap();
    hub.link.set_status(&id, TaskStatus::InProgress, None).unwrap();
    hub.link.set_status(&id, TaskStatus::InProgress, None).unwrap();
    hub.link.report("coder", &id, TaskStatus::Completed, "done", None).unwrap();
    let request = hub.link.request_capability("coder", "dba", &[]).unwrap();
    hub.link.resolve_request(&request, true, json!({})).unwrap();

    let mut names = Vec::new();
    while let Ok(n) = rx.try_recv() {
        names.push(n.name());
    }
    assert_eq!(names, vec![
        "agent_task_assigned",
        "agent_task_status_updated",
        "report_submitted",
        "agent_requested",
        "request_resolved",
    ]);
    hub.shutdown().await;
}
