use tokio::time::{sleep, Duration};
use tracing::info;
use crate::cli::commands::EventsArgs;
use crate::errors::TaskhubError;
use crate::hub::Hub;

/// Print journaled events as JSON lines, optionally tailing the journal.
pub async fn handle_events(hub: &Hub, args: EventsArgs) -> Result<(), TaskhubError> {
    let limit = args.limit.max(1);
    let mut cursor = args.after;
    if args.follow {
        info!(after = cursor, "Following events");
    }

    loop {
        let batch = hub.db.list_events(cursor, limit)?;
        for record in &batch {
            println!("{}", serde_json::to_string(record)?);
            cursor = record.id;
        }

        if batch.len() == limit {
            continue;
        }
        if !args.follow {
            break;
        }
        sleep(Duration::from_secs(args.interval.max(1))).await;
    }

    Ok(())
}
