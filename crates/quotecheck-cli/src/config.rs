use crate::Cli;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use quotecheck_engine::{DealUrlTemplate, DumpSelection, ReportConfig, DEFAULT_DEAL_URL_TEMPLATE};
use quotecheck_source::{parse_timezone, CreatedRange};
use std::path::PathBuf;
use tracing::warn;

const URL_ENV: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
const KEY_ENV: [&str; 2] = ["SUPABASE_PUBLISHABLE_KEY", "VITE_SUPABASE_PUBLISHABLE_KEY"];
const LOCATION_ENV: [&str; 3] = ["LOCATION_ID", "GHL_LOCATION_ID", "VITE_GHL_LOCATION_ID"];
const DEAL_URL_ENV: [&str; 2] = [
    "TEAMLEADER_DEAL_URL_TEMPLATE",
    "VITE_TEAMLEADER_DEAL_URL_TEMPLATE",
];
const TIMEZONE_ENV: [&str; 2] = ["DASHBOARD_TIMEZONE", "VITE_DASHBOARD_TIMEZONE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSettings {
    Rest { supabase_url: String, api_key: String },
    Snapshot { path: PathBuf },
}

/// Fully resolved run settings. Nothing below this point reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceSettings,
    pub location_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub timezone: Tz,
    pub range: CreatedRange,
    pub quote_phase_id: String,
    pub deal_url_template: DealUrlTemplate,
    pub dump: Option<DumpSelection>,
    pub show: usize,
    pub json: bool,
}

impl Config {
    pub fn from_cli<F>(cli: &Cli, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match &cli.snapshot {
            Some(path) => SourceSettings::Snapshot { path: path.clone() },
            None => SourceSettings::Rest {
                supabase_url: require(
                    resolve(cli.supabase_url.as_deref(), &URL_ENV, &env),
                    "--supabase-url / SUPABASE_URL",
                )?,
                api_key: require(
                    resolve(cli.supabase_key.as_deref(), &KEY_ENV, &env),
                    "--supabase-key / SUPABASE_PUBLISHABLE_KEY",
                )?,
            },
        };

        let location_id = resolve(cli.location_id.as_deref(), &LOCATION_ENV, &env);
        let location_id = match source {
            SourceSettings::Snapshot { .. } => location_id,
            SourceSettings::Rest { .. } => require(location_id, "--location-id / LOCATION_ID")?,
        };

        let start = parse_date(&cli.start, "--start")?;
        let end = parse_date(&cli.end, "--end")?;
        if end < start {
            bail!("--end ({end}) is before --start ({start})");
        }

        let timezone_name = resolve(cli.timezone.as_deref(), &TIMEZONE_ENV, &env);
        let timezone = parse_timezone(&timezone_name).unwrap_or_else(|| {
            warn!(event = "unknown_timezone", timezone = %timezone_name, fallback = "UTC");
            Tz::UTC
        });
        let range = CreatedRange::from_local_dates(start, end, timezone)
            .context("failed to build created_at range")?;

        let template = resolve(cli.deal_url_template.as_deref(), &DEAL_URL_ENV, &env);
        let deal_url_template = if template.is_empty() {
            DealUrlTemplate::new(DEFAULT_DEAL_URL_TEMPLATE)
        } else {
            DealUrlTemplate::new(template)
        };

        Ok(Self {
            source,
            location_id,
            start,
            end,
            timezone,
            range,
            quote_phase_id: cli.quote_phase_id.trim().to_string(),
            deal_url_template,
            dump: cli.dump,
            show: cli.show,
            json: cli.json,
        })
    }

    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            sample_limit: self.show,
            deal_url_template: Some(self.deal_url_template.clone()),
        }
    }
}

pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Flag value when non-blank, else the first non-blank environment variable.
fn resolve<F>(flag: Option<&str>, names: &[&str], env: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = flag.map(str::trim).filter(|value| !value.is_empty()) {
        return value.to_string();
    }
    names
        .iter()
        .filter_map(|name| env(*name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn require(value: String, label: &str) -> Result<String> {
    if value.is_empty() {
        bail!("Missing {label}. Provide it via flag or environment.");
    }
    Ok(value)
}

fn parse_date(raw: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid {flag} date {raw:?}, expected YYYY-MM-DD"))
}
