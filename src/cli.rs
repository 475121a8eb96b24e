//! CLI commands for the ball-by-ball pipeline.
//!
//! Two verbs, each parameterized by provider: crawl raw documents, or
//! transform what a previous crawl persisted.

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::pipeline::{self, PipelineOutcome};
use crate::provider::Provider;

#[derive(Parser)]
#[command(name = "cricket-bbb")]
#[command(version, about = "Cricket ball-by-ball crawler and transformer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl a provider's raw match documents into the store
    Crawl {
        /// Upstream provider
        #[arg(short, long, value_enum)]
        provider: Provider,
    },

    /// Flatten persisted raw matches into ball-by-ball NDJSON
    Transform {
        /// Upstream provider
        #[arg(short, long, value_enum)]
        provider: Provider,
    },

    /// Crawl then transform in one process
    Pipeline {
        /// Upstream provider
        #[arg(short, long, value_enum)]
        provider: Provider,
    },
}

/// Crawl one provider with the loaded configuration
pub async fn run_crawl(provider: Provider) -> anyhow::Result<PipelineOutcome> {
    let config = AppConfig::load()?;
    Ok(pipeline::run_crawl(provider, &config).await)
}

/// Transform one provider with the loaded configuration
pub async fn run_transform(provider: Provider) -> anyhow::Result<PipelineOutcome> {
    let config = AppConfig::load()?;
    Ok(pipeline::run_transform(provider, &config))
}

/// Crawl and transform one provider with the loaded configuration
pub async fn run_pipeline(provider: Provider) -> anyhow::Result<PipelineOutcome> {
    let config = AppConfig::load()?;
    Ok(pipeline::run_pipeline(provider, &config).await)
}
