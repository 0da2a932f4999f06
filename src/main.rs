use clap::Parser;
use tracing_subscriber::EnvFilter;
use taskhub::cli::{self, Cli, Commands};
use taskhub::config;
use taskhub::errors::TaskhubError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr; stdout carries the JSON output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(!cli.no_color).init();
    }

    if let Err(e) = run(cli).await {
        let class = e.classify();
        eprintln!("Error: {}", e);
        if class.retryable {
            eprintln!("({} is retryable)", class.error_type);
        }
        let exit_code = match &e {
            TaskhubError::Validation(_) => 2,
            TaskhubError::NotFound(_) => 3,
            TaskhubError::Conflict(_) => 4,
            TaskhubError::Config(_) | TaskhubError::Yaml(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<(), TaskhubError> {
    if let Commands::Validate(args) = &cli.command {
        return handle_validate(args).await;
    }

    let hub = cli::open_hub(&cli).await?;
    let result = match cli.command {
        Commands::Enqueue(args) => cli::tasks::handle_enqueue(&hub, args),
        Commands::Claim(args) => cli::tasks::handle_claim(&hub, args),
        Commands::Start(args) => cli::tasks::handle_start(&hub, args),
        Commands::Complete(args) => cli::tasks::handle_complete(&hub, args),
        Commands::Fail(args) => cli::tasks::handle_fail(&hub, args),
        Commands::Requeue(args) => cli::tasks::handle_requeue(&hub, args),
        Commands::Show(args) => cli::tasks::handle_show(&hub, args),
        Commands::History(args) => cli::tasks::handle_history(&hub, args),
        Commands::Active => cli::tasks::handle_active(&hub),
        Commands::Stats(args) => cli::tasks::handle_stats(&hub, args),
        Commands::Generate(args) => cli::tasks::handle_generate(&hub, args).await,
        Commands::Assign(args) => cli::link::handle_assign(&hub, args),
        Commands::SetStatus(args) => cli::link::handle_set_status(&hub, args),
        Commands::Report(args) => cli::link::handle_report(&hub, args),
        Commands::Request(args) => cli::link::handle_request(&hub, args),
        Commands::Resolve(args) => cli::link::handle_resolve(&hub, args),
        Commands::Requests(args) => cli::link::handle_requests(&hub, args),
        Commands::Delegations(args) => cli::link::handle_delegations(&hub, args),
        Commands::AgentHistory(args) => cli::link::handle_agent_history(&hub, args),
        Commands::Events(args) => cli::events::handle_events(&hub, args).await,
        Commands::Validate(_) => Ok(()),
    };

    hub.shutdown().await;
    result
}

async fn handle_validate(args: &cli::commands::ValidateArgs) -> Result<(), TaskhubError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
