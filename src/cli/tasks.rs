use serde_json::json;
use tracing::info;
use crate::cli::commands::{
    AgentArgs, ClaimArgs, CompleteArgs, EnqueueArgs, FailArgs, GenerateArgs, HistoryArgs, ShowArgs, StartArgs, TaskIdArgs,
};
use crate::errors::TaskhubError;
use crate::hub::Hub;
use crate::models::NewTask;
use crate::queue::{load_analysis, TaskGenerator};
use super::{parse_json_arg, parse_optional_json_arg, print_json};

pub fn handle_enqueue(hub: &Hub, args: EnqueueArgs) -> Result<(), TaskhubError> {
    let mut new = NewTask::new(&args.agent, &args.task_type, &args.title);
    new.priority = args.priority;
    new.description = args.description;
    new.context = parse_optional_json_arg("context", args.context.as_deref())?;
    new.parent_task_id = args.parent;

    let task_id = hub.store.enqueue(new)?;
    print_json(&json!({"task_id": task_id}))
}

pub fn handle_claim(hub: &Hub, args: ClaimArgs) -> Result<(), TaskhubError> {
    let session = args.session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    match hub.store.claim_next(&args.agent, &session)? {
        Some(task) => print_json(&task),
        None => {
            info!(agent_id = %args.agent, "Queue is empty");
            print_json(&serde_json::Value::Null)
        }
    }
}

pub fn handle_start(hub: &Hub, args: StartArgs) -> Result<(), TaskhubError> {
    print_json(&hub.store.start(&args.task_id, &args.session)?)
}

pub fn handle_complete(hub: &Hub, args: CompleteArgs) -> Result<(), TaskhubError> {
    let result = parse_json_arg("result", &args.result)?;
    print_json(&hub.store.complete(&args.task_id, result)?)
}

pub fn handle_fail(hub: &Hub, args: FailArgs) -> Result<(), TaskhubError> {
    print_json(&hub.store.fail(&args.task_id, &args.error)?)
}

pub fn handle_requeue(hub: &Hub, args: TaskIdArgs) -> Result<(), TaskhubError> {
    print_json(&hub.store.requeue(&args.task_id)?)
}

pub fn handle_show(hub: &Hub, args: ShowArgs) -> Result<(), TaskhubError> {
    let task = hub.store.get(&args.task_id)?;
    if args.subtasks {
        let subtasks = hub.store.subtasks(&args.task_id)?;
        print_json(&json!({"task": task, "subtasks": subtasks}))
    } else {
        print_json(&task)
    }
}

pub fn handle_history(hub: &Hub, args: HistoryArgs) -> Result<(), TaskhubError> {
    print_json(&hub.store.history(&args.agent, args.limit)?)
}

pub fn handle_active(hub: &Hub) -> Result<(), TaskhubError> {
    print_json(&hub.store.active_across_agents()?)
}

pub fn handle_stats(hub: &Hub, args: AgentArgs) -> Result<(), TaskhubError> {
    print_json(&hub.store.stats(&args.agent)?)
}

pub async fn handle_generate(hub: &Hub, args: GenerateArgs) -> Result<(), TaskhubError> {
    let analysis = load_analysis(std::path::Path::new(&args.analysis)).await?;
    let ids = if args.dedup {
        TaskGenerator::new(hub.store.clone(), true).generate(&args.agent, &analysis)?
    } else {
        hub.generator.generate(&args.agent, &analysis)?
    };
    info!(agent_id = %args.agent, created = ids.len(), "Tasks generated");
    print_json(&json!({"task_ids": ids}))
}
