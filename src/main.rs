//! Cricket ball-by-ball data pipeline.
//!
//! Crawls raw match documents from two upstream providers and flattens
//! them into one NDJSON record per delivery.

mod cli;
mod config;
mod crawler;
mod fetch;
mod pipeline;
mod provider;
mod storage;
mod transform;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::pipeline::PipelineStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cricket_bbb=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Crawl { provider } => cli::run_crawl(provider).await?,
        Commands::Transform { provider } => cli::run_transform(provider).await?,
        Commands::Pipeline { provider } => cli::run_pipeline(provider).await?,
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.status == PipelineStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}
