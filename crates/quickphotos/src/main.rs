//! quickphotos CLI entry point.

use anyhow::Result;
use clap::Parser;
use quickphotos::cli::{execute, Cli};
use quickphotos::storage::{DynamoDbStore, Repository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickphotos=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config();
    tracing::debug!(table = %config.table_name, index = %config.index_name, "loaded configuration");

    let store = DynamoDbStore::from_config(&config).await;
    let repo = Repository::new(store);

    match execute(&repo, cli.command, cli.format).await {
        Ok(output) => println!("{}", output),
        Err(e) if e.is_precondition_failure() => {
            tracing::info!(error = %e, "nothing to do");
            println!("{}", e);
        }
        Err(e) => {
            if e.is_retryable() {
                tracing::warn!(error = %e, "transient failure, safe to retry");
            }
            return Err(e.into());
        }
    }

    Ok(())
}
