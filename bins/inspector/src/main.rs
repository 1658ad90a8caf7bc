//! Cible inspector
//!
//! Loads a reference snapshot with its theme and venue scopes and expense
//! lines, validates everything, runs the audience and budget reports and
//! prints them as one JSON document on stdout. Logs go to stderr.

mod fixture;
mod report;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cible_core::scope::{AudienceCache, ResolverOptions, ScopeResolver};
use cible_shared::AppConfig;
use cible_shared::config::LogConfig;
use cible_shared::types::PageRequest;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::fixture::Fixture;
use crate::report::Inspection;

#[derive(Parser)]
#[command(name = "cible-inspector")]
#[command(version)]
#[command(about = "Print audience and budget reports for a reference snapshot")]
struct Cli {
    /// Fixture file (defaults to `inspector.snapshot_path`)
    #[arg(long, short, env = "CIBLE_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Ignore inactive employees regardless of configuration
    #[arg(long)]
    active_only: bool,

    /// Participants listed per venue
    #[arg(long, default_value_t = 20)]
    per_page: u32,

    /// Single-line JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    let path = cli
        .fixture
        .unwrap_or_else(|| PathBuf::from(&config.inspector.snapshot_path));
    let fixture = Fixture::load(&path)?;

    let graph = fixture.reference_graph()?;
    info!(
        revision = graph.revision(),
        employees = graph.employee_count(),
        "Reference graph loaded"
    );
    let ledger = fixture.ledger()?;
    let scopes = fixture.scopes(&graph)?;

    let mut options = ResolverOptions::from(&config.engine);
    options.active_only |= cli.active_only;
    let cache = AudienceCache::from_config(&config.cache);

    let report = Inspection {
        fixture: &fixture,
        resolver: ScopeResolver::with_options(&graph, options),
        ledger: &ledger,
        scopes: &scopes,
        cache: &cache,
        page: PageRequest::new(1, cli.per_page),
    }
    .report();

    let output = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{output}");

    info!(
        themes = report.themes.len(),
        venues = report.venues.len(),
        "Inspection complete"
    );
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
