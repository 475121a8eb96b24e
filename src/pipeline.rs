//! Entry points for the four pipeline operations.
//!
//! Each operation runs one provider's crawl or transform against the
//! local store and reports a coarse status. A successful crawl kicks the
//! matching transform endpoint when one is configured; a trigger failure
//! downgrades the outcome without voiding the crawl itself.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::crawler::{CrawlReport, Crawler};
use crate::fetch::HttpClient;
use crate::provider::Provider;
use crate::storage::LocalStore;
use crate::transform::{TransformReport, Transformer};

/// Coarse outcome of one pipeline operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    /// The core work succeeded but a follow-up step did not
    PartialSuccess,
    Error,
}

/// Status and human-readable summary of one operation
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub status: PipelineStatus,
    pub message: String,
}

/// Crawl one provider, then trigger its transform endpoint
pub async fn run_crawl(provider: Provider, config: &AppConfig) -> PipelineOutcome {
    let report = match crawl(provider, config).await {
        Ok(report) => report,
        Err(e) => {
            error!("{} crawl failed: {:#}", provider, e);
            return PipelineOutcome {
                status: PipelineStatus::Error,
                message: format!("{} crawl failed: {:#}", provider, e),
            };
        }
    };

    let message = crawl_summary(provider, &report);

    match trigger_transform(provider, config).await {
        Ok(()) => PipelineOutcome {
            status: PipelineStatus::Success,
            message,
        },
        Err(e) => {
            warn!("Transform trigger failed: {:#}", e);
            PipelineOutcome {
                status: PipelineStatus::PartialSuccess,
                message: format!("{}; transform trigger failed: {:#}", message, e),
            }
        }
    }
}

/// Crawl one provider, then transform its matches in the same process.
/// The remote trigger is bypassed; the transform runs locally instead.
pub async fn run_pipeline(provider: Provider, config: &AppConfig) -> PipelineOutcome {
    let report = match crawl(provider, config).await {
        Ok(report) => report,
        Err(e) => {
            error!("{} crawl failed: {:#}", provider, e);
            return PipelineOutcome {
                status: PipelineStatus::Error,
                message: format!("{} crawl failed: {:#}", provider, e),
            };
        }
    };

    let transform_outcome = run_transform(provider, config);
    PipelineOutcome {
        status: transform_outcome.status,
        message: format!(
            "{}; {}",
            crawl_summary(provider, &report),
            transform_outcome.message
        ),
    }
}

/// Transform one provider's persisted raw matches
pub fn run_transform(provider: Provider, config: &AppConfig) -> PipelineOutcome {
    let report = match transform(provider, config) {
        Ok(report) => report,
        Err(e) => {
            error!("{} transform failed: {:#}", provider, e);
            return PipelineOutcome {
                status: PipelineStatus::Error,
                message: format!("{} transform failed: {:#}", provider, e),
            };
        }
    };

    PipelineOutcome {
        status: transform_status(&report),
        message: format!(
            "{} transform: {} processed, {} succeeded, {} skipped, {} failed",
            provider, report.processed, report.succeeded, report.skipped, report.failed
        ),
    }
}

fn crawl_summary(provider: Provider, report: &CrawlReport) -> String {
    format!(
        "{} crawl: {} fixtures discovered, {} fetched, {} persisted",
        provider, report.discovered, report.fetched, report.persisted
    )
}

async fn crawl(provider: Provider, config: &AppConfig) -> Result<CrawlReport> {
    let store = LocalStore::new(".")?;
    let transport = HttpClient::new(&config.crawler)?;
    let crawler = Crawler::new(
        provider,
        &config.crawler,
        &config.storage.raw_root,
        &store,
        &transport,
    );
    crawler.crawl().await
}

fn transform(provider: Provider, config: &AppConfig) -> Result<TransformReport> {
    let store = LocalStore::new(".")?;
    let transformer = Transformer::new(
        provider,
        &config.transform,
        &config.storage.raw_root,
        &config.storage.output_root,
        &store,
    );
    transformer.run()
}

fn transform_status(report: &TransformReport) -> PipelineStatus {
    if !report.is_success() {
        PipelineStatus::Error
    } else if report.failed > 0 {
        PipelineStatus::PartialSuccess
    } else {
        PipelineStatus::Success
    }
}

/// POST the provider's transform endpoint, when one is configured.
/// The timeout is generous; the endpoint transforms synchronously.
async fn trigger_transform(provider: Provider, config: &AppConfig) -> Result<()> {
    let url = match provider {
        Provider::Aucb => &config.trigger.transform_aucb_url,
        Provider::Cricinfo => &config.trigger.transform_cricinfo_url,
    };
    let Some(url) = url else {
        info!("No transform trigger configured for {}", provider);
        return Ok(());
    };

    info!("Triggering {} transform at {}", provider, url);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.trigger.timeout_secs))
        .build()
        .context("Failed to build trigger client")?;

    let response = client
        .post(url)
        .json(&serde_json::json!({}))
        .send()
        .await
        .with_context(|| format!("Trigger request to {} failed", url))?;

    if !response.status().is_success() {
        anyhow::bail!("trigger returned status {}", response.status());
    }
    info!("Transform trigger accepted");
    Ok(())
}
