mod config;
mod logging;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, SourceSettings};
use quotecheck_core::{PhaseRegistry, QuoteThreshold};
use quotecheck_engine::{reconcile, DumpSelection, QuoteReport, DEFAULT_SAMPLE_LIMIT};
use quotecheck_source::{
    resolve_quote_phase_id, DealSource, PostgrestConfig, PostgrestSource, SnapshotSource,
};
use render::RangeSummary;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Re-derives the sales dashboard's quote-deal count for a date range and
/// cross-checks it against the phase history markers.
#[derive(Parser, Debug)]
#[command(name = "quotecheck")]
#[command(about = "Reconcile dashboard quote-deal counts against CRM phase data", long_about = None)]
pub struct Cli {
    /// Supabase project URL
    #[arg(long)]
    pub supabase_url: Option<String>,
    /// Supabase publishable/anon key (sent as apikey and bearer token)
    #[arg(long)]
    pub supabase_key: Option<String>,
    #[arg(long)]
    pub location_id: Option<String>,
    /// Start date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub start: String,
    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: String,
    /// Override the configured quote threshold phase id
    #[arg(long, default_value = "")]
    pub quote_phase_id: String,
    /// Deep-link template; `{id}` is replaced with the deal id
    #[arg(long)]
    pub deal_url_template: Option<String>,
    /// Business timezone for day boundaries, e.g. Europe/Brussels
    #[arg(long)]
    pub timezone: Option<String>,
    /// Print one deal id per line for: all, quote, non-quote, drift
    #[arg(long)]
    pub dump: Option<DumpSelection>,
    /// Number of drift rows to sample in the report
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LIMIT)]
    pub show: usize,
    /// Read phases, config and deals from a JSON snapshot instead of the API
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,
    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
    #[arg(long)]
    pub debug: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    range: &'a RangeSummary,
    report: &'a QuoteReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    dump: Option<JsonDump<'a>>,
}

#[derive(Serialize)]
struct JsonDump<'a> {
    selection: DumpSelection,
    ids: Vec<&'a str>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug || logging::env_true("QUOTECHECK_DEBUG"));

    let config = Config::from_cli(&cli, config::process_env)?;
    let source = open_source(&config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&config, source.as_ref(), &mut out)?;
    out.flush()?;
    Ok(())
}

fn open_source(config: &Config) -> Result<Box<dyn DealSource>> {
    Ok(match &config.source {
        SourceSettings::Rest {
            supabase_url,
            api_key,
        } => Box::new(
            PostgrestSource::new(PostgrestConfig::new(supabase_url.clone(), api_key.clone()))
                .context("failed to build HTTP client")?,
        ),
        SourceSettings::Snapshot { path } => Box::new(
            SnapshotSource::open(path)
                .with_context(|| format!("failed to open snapshot {}", path.display()))?,
        ),
    })
}

fn run<W: Write>(config: &Config, source: &dyn DealSource, out: &mut W) -> Result<()> {
    let location_id = config.location_id.as_str();
    let quote_phase_id = resolve_quote_phase_id(source, location_id, &config.quote_phase_id)
        .context("failed to resolve quote phase threshold")?;
    let raw_phases = source
        .phases(location_id)
        .context("failed to load deal phases")?;
    let registry = PhaseRegistry::from_records(&raw_phases);
    let threshold = QuoteThreshold::resolve(&quote_phase_id, &registry);
    if !threshold.is_unset() && !threshold.is_known_phase() {
        warn!(
            event = "threshold_phase_unknown",
            phase_id = %threshold.phase_id,
            phases = registry.len()
        );
    }

    let deals = source
        .deals(location_id, &config.range)
        .context("failed to load deals")?;
    let reconciliation = reconcile(&deals, &registry, &threshold);
    let report = QuoteReport::build(
        &reconciliation,
        &registry,
        &threshold,
        &config.report_config(),
    );
    info!(
        event = "reconciled",
        total = report.total,
        quote = report.quote,
        drift = report.coverage.drift
    );

    let range = RangeSummary {
        start: config.start,
        end: config.end,
        timezone: config.timezone.name().to_string(),
        utc: config.range,
    };

    if config.json {
        let output = JsonOutput {
            range: &range,
            report: &report,
            dump: config.dump.map(|selection| JsonDump {
                selection,
                ids: reconciliation.ids(selection),
            }),
        };
        serde_json::to_writer_pretty(&mut *out, &output).context("failed to encode report")?;
        writeln!(out)?;
        return Ok(());
    }

    render::render_report(out, &range, &report)?;
    if let Some(selection) = config.dump {
        writeln!(out)?;
        render::render_ids(out, &reconciliation.ids(selection))?;
    }
    Ok(())
}
