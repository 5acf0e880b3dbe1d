//! `epd-smoke` -- end-to-end smoke run against an EPD backend.
//!
//! Logs in, exercises the client, therapist, appointment and import
//! endpoints, deletes what it created and prints a report. Exits non-zero
//! when any check failed.
//!
//! # Environment variables
//!
//! See [`SmokeConfig::from_env`] for the full list. At minimum
//! `SMOKE_ADMIN_EMAIL` and `SMOKE_ADMIN_PASSWORD` must be set.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use epd_smoke::{run_with, RunOptions, SmokeConfig, TestRunContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "End-to-end smoke checks for the EPD backend", long_about = None)]
struct Cli {
    /// Backend base URL, overrides `EPD_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    /// Leave out the CSV import phase.
    #[arg(long)]
    skip_import: bool,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epd_smoke=info,epd_import=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = SmokeConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.client.base_url = url.trim_end_matches('/').to_string();
    }

    let mut ctx = TestRunContext::new(config)?;
    let report = run_with(
        &mut ctx,
        RunOptions {
            skip_import: cli.skip_import,
        },
    )
    .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render());
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
