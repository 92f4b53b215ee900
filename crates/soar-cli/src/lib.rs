//! Soar CLI - command line tools for scoring glider competition flights.
//!
//! This crate provides the binaries:
//! - analyse_flight: score one trace against a task
//! - analyse_day: score a directory of traces as one competition day

pub mod config;
pub mod input;
pub mod report;

pub use config::Config;
pub use report::{DayReport, FlightReport};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Logs go to stderr so reports on stdout stay parseable.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("soar_cli=info".parse()?)
        .add_directive("soar_core=info".parse()?);

    if config.json_logs {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
    Ok(())
}
