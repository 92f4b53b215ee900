//! Score a directory of traces as one competition day.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use soar_cli::{input, init_tracing, Config, DayReport};
use soar_core::{ClassificationMethod, CompetitionDay};

/// Analyse every trace of a competition day
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Task definition (JSON)
    #[arg(long)]
    task: PathBuf,

    /// Directory holding one JSON trace per competitor
    #[arg(long)]
    traces: PathBuf,

    /// Day name
    #[arg(long, default_value = "Day 1")]
    name: String,

    /// Competition class
    #[arg(long, default_value = "club")]
    class: String,

    /// Day date (default: date of the first recorded fix, required when no trace has fixes)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Thermal detector: pysoar or xcsoar (default from SOAR_CLASSIFICATION_METHOD)
    #[arg(long)]
    method: Option<ClassificationMethod>,

    /// Log and skip failing competitors (also SOAR_SKIP_FAILED)
    #[arg(long)]
    skip_failed: bool,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    init_tracing(&config)?;

    let task = input::load_task(&args.task)?;
    let mut competitors = Vec::new();
    for path in input::trace_files(&args.traces)? {
        competitors.push(input::load_competitor(&path)?);
    }
    if competitors.is_empty() {
        tracing::warn!(dir = %args.traces.display(), "no traces found");
    }

    let date = input::day_date(args.date, &competitors)?;

    let method = args.method.unwrap_or(config.classification_method);
    let skip_failed = args.skip_failed || config.skip_failed;
    let mut day = CompetitionDay::new(args.name, date, args.class, competitors, Some(task));

    let mut progress = |analysed: usize, total: usize| {
        tracing::info!(analysed, total, "progress");
    };
    let skipped = day
        .analyse_flights(method, Some(&mut progress), skip_failed)
        .context("competition day analysis failed")?;

    let report = DayReport::new(&day, skipped)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(())
}
