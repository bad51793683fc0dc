mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, port, database_url, config, bearer_token } => {
            commands::serve(bind, port, database_url, config, bearer_token).await
        }
        Command::Refresh { destination } => commands::refresh(cli.url, cli.token, destination).await,
        Command::CacheClear { cache_name } => commands::cache_clear(cli.url, cli.token, cache_name).await,
        Command::DriftStats => commands::drift_stats(cli.url, cli.token).await,
        Command::Heartbeat { service_name, instance_id, config_hash, environment, host, port, version, metadata } => {
            commands::heartbeat(cli.url, cli.token, service_name, instance_id, config_hash, environment, host, port, version, metadata).await
        }
    }
}
