use serde_json::json;
use crate::cli::commands::{
    AgentArgs, AssignArgs, DelegationsArgs, ReportArgs, RequestArgs, RequestsArgs, ResolveArgs, SetStatusArgs,
};
use crate::errors::TaskhubError;
use crate::hub::Hub;
use crate::models::TaskStatus;
use super::{parse_json_arg, parse_optional_json_arg, print_json};

pub fn handle_assign(hub: &Hub, args: AssignArgs) -> Result<(), TaskhubError> {
    let metadata = parse_optional_json_arg("metadata", args.metadata.as_deref())?;
    let task_id = hub.link.assign(&args.from, &args.to, &args.description, metadata)?;
    print_json(&json!({"task_id": task_id}))
}

pub fn handle_set_status(hub: &Hub, args: SetStatusArgs) -> Result<(), TaskhubError> {
    let status: TaskStatus = args.status.parse()?;
    print_json(&hub.link.set_status(&args.task_id, status, args.result.as_deref())?)
}

pub fn handle_report(hub: &Hub, args: ReportArgs) -> Result<(), TaskhubError> {
    let status: TaskStatus = args.status.parse()?;
    let details = parse_optional_json_arg("details", args.details.as_deref())?;
    let report_id = hub.link.report(&args.agent, &args.task_id, status, &args.summary, details)?;
    print_json(&json!({"report_id": report_id}))
}

pub fn handle_request(hub: &Hub, args: RequestArgs) -> Result<(), TaskhubError> {
    let capabilities: Vec<String> = args
        .capabilities
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    let request_id = hub.link.request_capability(&args.from, &args.agent_type, &capabilities)?;
    print_json(&json!({"request_id": request_id}))
}

pub fn handle_resolve(hub: &Hub, args: ResolveArgs) -> Result<(), TaskhubError> {
    let response = parse_json_arg("response", &args.response)?;
    print_json(&hub.link.resolve_request(&args.request_id, !args.reject, response)?)
}

pub fn handle_requests(hub: &Hub, args: RequestsArgs) -> Result<(), TaskhubError> {
    match args.agent {
        Some(agent) => print_json(&hub.db.list_requests_by_agent(&agent)?),
        None => print_json(&hub.link.pending_requests()?),
    }
}

pub fn handle_delegations(hub: &Hub, args: DelegationsArgs) -> Result<(), TaskhubError> {
    match args.task_id {
        Some(task_id) => {
            let task = hub.link.get(&task_id)?;
            let reports = hub.db.list_reports_for_task(&task_id)?;
            print_json(&json!({"task": task, "reports": reports}))
        }
        None => print_json(&hub.link.active_agent_tasks()?),
    }
}

pub fn handle_agent_history(hub: &Hub, args: AgentArgs) -> Result<(), TaskhubError> {
    print_json(&hub.link.history(&args.agent)?)
}
