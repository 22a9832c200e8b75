mod cli;
mod config;
mod logging;
mod render;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use recs_core::{normalize_records, JobId, RecommendationOutcome};
use recs_engine::{export_outcome, RecommendationEngine};
use recs_logging::{recs_debug, recs_info, recs_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::logging::LogDestination;
use crate::render::TerminalProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = AppConfig::locate(cli.config.as_deref());
    let mut config = match &config_path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(base_url) = cli.base_url.clone() {
        config.base_url = Some(base_url);
    }
    if let Some(log_file) = cli.log_file.clone() {
        config.log_file = Some(log_file);
    }

    let destination = match config.log_file.clone() {
        Some(path) => LogDestination::TerminalAndFile(path),
        None => LogDestination::Terminal,
    };
    logging::initialize(destination, recs_logging::default_level(cli.verbose));
    match &config_path {
        Some(path) => recs_info!("Loaded configuration from {:?}", path),
        None => recs_debug!("No configuration file, using defaults"),
    }

    let engine = RecommendationEngine::connect(
        config.client_settings(),
        Arc::new(config.token_provider()),
        config.poll_policy(),
    )
    .context("Failed to create the API client")?;

    match cli.command {
        Command::Recommend {
            profile_id,
            basic,
            json,
            out,
        } => handle_recommend(&engine, &profile_id, !basic, json, out.as_deref()).await?,
        Command::Status { job_id } => handle_status(&engine, JobId::new(job_id)).await?,
        Command::Result { job_id, json } => {
            handle_result(&engine, JobId::new(job_id), json).await?
        }
        Command::Save { property_id } => {
            engine
                .api()
                .save_property(&property_id)
                .await
                .with_context(|| format!("Failed to save property {property_id}"))?;
            println!("Saved property {property_id}");
        }
        Command::Unsave { property_id } => {
            engine
                .api()
                .unsave_property(&property_id)
                .await
                .with_context(|| format!("Failed to unsave property {property_id}"))?;
            println!("Removed property {property_id}");
        }
    }

    Ok(())
}

async fn handle_recommend(
    engine: &RecommendationEngine,
    profile_id: &str,
    enriched: bool,
    json: bool,
    out: Option<&Path>,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            recs_warn!("Interrupted; cancelling the recommendation request");
            on_interrupt.cancel();
        }
    });

    let outcome = engine
        .get_recommendations(profile_id, enriched, &TerminalProgress, Some(&cancel))
        .await
        .with_context(|| format!("Failed to get recommendations for profile {profile_id}"))?;

    print_outcome(&outcome, json)?;

    if let Some(dir) = out {
        let generated_utc = chrono::Utc::now().to_rfc3339();
        let summary = export_outcome(dir, profile_id, &generated_utc, &outcome)
            .with_context(|| format!("Failed to export recommendations to {}", dir.display()))?;
        recs_info!(
            "Exported {} recommendations to {}",
            summary.record_count,
            summary.path.display()
        );
        eprintln!("Wrote {}", summary.path.display());
    }
    Ok(())
}

async fn handle_status(engine: &RecommendationEngine, job_id: JobId) -> Result<()> {
    let status = engine
        .api()
        .job_status(&job_id)
        .await
        .with_context(|| format!("Failed to read status of job {job_id}"))?;
    print!("{}", render::render_status(&status));
    Ok(())
}

async fn handle_result(engine: &RecommendationEngine, job_id: JobId, json: bool) -> Result<()> {
    let payload = engine
        .api()
        .job_result(&job_id)
        .await
        .with_context(|| format!("Failed to fetch result of job {job_id}"))?;
    let outcome = RecommendationOutcome::Recommendations {
        recommendations: normalize_records(&payload),
    };
    print_outcome(&outcome, json)
}

fn print_outcome(outcome: &RecommendationOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print!("{}", render::render_outcome(outcome));
    }
    Ok(())
}
