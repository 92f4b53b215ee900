//! Score one flight trace against a task and print a JSON report.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use soar_cli::{input, init_tracing, Config, FlightReport};
use soar_core::ClassificationMethod;

/// Analyse a single glider flight
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Task definition (JSON)
    #[arg(long)]
    task: PathBuf,

    /// Trace: a list of fixes or a competitor record (JSON)
    #[arg(long)]
    trace: PathBuf,

    /// Thermal detector: pysoar or xcsoar (default from SOAR_CLASSIFICATION_METHOD)
    #[arg(long)]
    method: Option<ClassificationMethod>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    init_tracing(&config)?;

    let task = input::load_task(&args.task)?;
    let mut competitor = input::load_competitor(&args.trace)?;
    let method = args.method.unwrap_or(config.classification_method);

    tracing::info!(
        competition_id = %competitor.competition_id,
        fixes = competitor.trace.len(),
        %method,
        "analysing flight"
    );
    competitor
        .analyse(&task, method)
        .with_context(|| format!("failed to analyse {}", competitor.competition_id))?;

    let report = FlightReport::from_competitor(&competitor)
        .context("competitor has no trip after analysis")??;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(())
}
