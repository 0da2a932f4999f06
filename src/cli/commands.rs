use clap::{Parser, Subcommand, Args};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "taskhub", version, long_version = LONG_VERSION, about = "Priority task queue and agent handoff store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task to an agent's queue
    Enqueue(EnqueueArgs),
    /// Claim the most urgent pending task of an agent
    Claim(ClaimArgs),
    /// Mark a task as started by a session
    Start(StartArgs),
    /// Mark a task as completed
    Complete(CompleteArgs),
    /// Record a task failure
    Fail(FailArgs),
    /// Put a failed task back in the queue
    Requeue(TaskIdArgs),
    /// Show one task
    Show(ShowArgs),
    /// Recent tasks of an agent, newest first
    History(HistoryArgs),
    /// Tasks in progress across all agents
    Active,
    /// Task counts per status for an agent
    Stats(AgentArgs),
    /// Create tasks from an analysis result file
    Generate(GenerateArgs),
    /// Delegate work to another agent
    Assign(AssignArgs),
    /// Update the status of a delegated task
    SetStatus(SetStatusArgs),
    /// Submit a report on a delegated task
    Report(ReportArgs),
    /// Ask the orchestrator for a new agent
    Request(RequestArgs),
    /// Approve or reject a pending request
    Resolve(ResolveArgs),
    /// List requests (pending ones unless an agent is given)
    Requests(RequestsArgs),
    /// Show active delegations, or one delegation by id
    Delegations(DelegationsArgs),
    /// Everything an agent sent, received, reported and requested
    AgentHistory(AgentArgs),
    /// Print journaled notifications
    Events(EventsArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct EnqueueArgs {
    /// Agent that owns the task
    pub agent: String,

    /// Short task title
    pub title: String,

    /// Task type
    #[arg(short = 't', long, default_value = "general")]
    pub task_type: String,

    /// Priority 1-10, higher is more urgent
    #[arg(short, long)]
    pub priority: Option<i64>,

    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Context as a JSON object
    #[arg(long)]
    pub context: Option<String>,

    /// Parent task id
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args, Clone)]
pub struct ClaimArgs {
    /// Agent whose queue to claim from
    pub agent: String,

    /// Session id (a random one is generated if omitted)
    #[arg(short, long)]
    pub session: Option<String>,
}

#[derive(Args, Clone)]
pub struct StartArgs {
    pub task_id: String,

    #[arg(short, long)]
    pub session: String,
}

#[derive(Args, Clone)]
pub struct CompleteArgs {
    pub task_id: String,

    /// Result as JSON
    #[arg(short, long, default_value = "{}")]
    pub result: String,
}

#[derive(Args, Clone)]
pub struct FailArgs {
    pub task_id: String,

    /// Error message
    #[arg(short, long)]
    pub error: String,
}

#[derive(Args, Clone)]
pub struct TaskIdArgs {
    pub task_id: String,
}

#[derive(Args, Clone)]
pub struct ShowArgs {
    pub task_id: String,

    /// Include subtasks
    #[arg(long)]
    pub subtasks: bool,
}

#[derive(Args, Clone)]
pub struct HistoryArgs {
    pub agent: String,

    /// Maximum number of tasks
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Args, Clone)]
pub struct AgentArgs {
    pub agent: String,
}

#[derive(Args, Clone)]
pub struct GenerateArgs {
    /// Agent that receives the generated tasks
    pub agent: String,

    /// Analysis result JSON file
    #[arg(short, long)]
    pub analysis: String,

    /// Skip findings that already have an open task
    #[arg(long)]
    pub dedup: bool,
}

#[derive(Args, Clone)]
pub struct AssignArgs {
    /// Delegating agent
    #[arg(long)]
    pub from: String,

    /// Receiving agent
    #[arg(long)]
    pub to: String,

    /// What to do
    pub description: String,

    /// Metadata as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,
}

#[derive(Args, Clone)]
pub struct SetStatusArgs {
    pub task_id: String,

    /// pending, in_progress, completed or failed
    pub status: String,

    /// Result text
    #[arg(short, long)]
    pub result: Option<String>,
}

#[derive(Args, Clone)]
pub struct ReportArgs {
    /// Reporting agent
    #[arg(short, long)]
    pub agent: String,

    pub task_id: String,

    /// pending, in_progress, completed or failed
    pub status: String,

    pub summary: String,

    /// Details as JSON
    #[arg(long)]
    pub details: Option<String>,
}

#[derive(Args, Clone)]
pub struct RequestArgs {
    /// Requesting agent
    #[arg(long)]
    pub from: String,

    /// Kind of agent needed
    pub agent_type: String,

    /// Comma-separated capabilities
    #[arg(long, value_delimiter = ',')]
    pub capabilities: Vec<String>,
}

#[derive(Args, Clone)]
pub struct ResolveArgs {
    pub request_id: String,

    /// Reject instead of approve
    #[arg(long)]
    pub reject: bool,

    /// Response as JSON
    #[arg(long, default_value = "{}")]
    pub response: String,
}

#[derive(Args, Clone)]
pub struct RequestsArgs {
    /// Only requests from this agent, any status
    #[arg(long)]
    pub agent: Option<String>,
}

#[derive(Args, Clone)]
pub struct DelegationsArgs {
    pub task_id: Option<String>,
}

#[derive(Args, Clone)]
pub struct EventsArgs {
    /// Only events after this id
    #[arg(long, default_value = "0")]
    pub after: i64,

    /// Number of events per page
    #[arg(short, long, default_value = "100")]
    pub limit: usize,

    /// Keep polling for new events
    #[arg(short, long)]
    pub follow: bool,

    /// Poll interval in seconds
    #[arg(long, default_value = "1")]
    pub interval: u64,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Configuration file to validate
    pub config: String,
}
