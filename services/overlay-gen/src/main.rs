//! Live weather overlay generator.
//!
//! Resolves a working upstream map service, picks the freshest snapshot
//! time it can serve, searches for an accepted image request shape, and
//! writes two KML artifacts: the overlay itself and a refreshing pointer
//! for viewers. Intended to be re-run from cron; every run re-resolves
//! everything from scratch.

mod config;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use map_services::HttpMapClient;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config::GeneratorConfig;

#[derive(Parser, Debug)]
#[command(name = "overlay-gen")]
#[command(about = "Generates live weather overlay KML documents")]
struct Args {
    /// Configuration file (YAML); built-in NDFD defaults when omitted
    #[arg(short, long, env = "OVERLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the artifacts are written to
    #[arg(short, long, env = "OVERLAY_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Assemble and validate but do not write files
    #[arg(long)]
    dry_run: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match generate(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The context chain names the failing stage.
            error!(error = format!("{e:#}"), "Overlay generation failed");
            ExitCode::FAILURE
        }
    }
}

async fn generate(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };

    info!(
        endpoints = config.endpoints.len(),
        parameter_sets = config.parameter_sets.len(),
        output_dir = %args.output_dir.display(),
        "Starting overlay generation"
    );

    if !args.dry_run {
        tokio::fs::create_dir_all(&args.output_dir).await?;
    }

    let client = HttpMapClient::new(config.client_config())?;
    let summary = pipeline::run(&config, &client, &args.output_dir, Utc::now(), args.dry_run)
        .await?;

    if !summary.verified {
        info!("Published image reference is unverified; viewer may still succeed");
    }
    if let Some(path) = &summary.overlay_path {
        info!(path = %path.display(), "Wrote overlay document");
    }
    if let Some(path) = &summary.pointer_path {
        info!(path = %path.display(), "Wrote pointer document");
    }

    Ok(())
}
