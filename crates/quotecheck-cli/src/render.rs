use chrono::{NaiveDate, SecondsFormat};
use quotecheck_engine::{QuoteReport, StatusCount};
use quotecheck_source::CreatedRange;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Serialize)]
pub struct RangeSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub timezone: String,
    pub utc: CreatedRange,
}

pub fn render_report<W: Write>(
    out: &mut W,
    range: &RangeSummary,
    report: &QuoteReport,
) -> io::Result<()> {
    writeln!(
        out,
        "Range: {} -> {} ({}, UTC filter: {})",
        range.start, range.end, range.timezone, range.utc
    )?;
    writeln!(out, "Quote phase threshold: {}", report.threshold)?;
    writeln!(out, "Deals (total): {}", report.total)?;
    writeln!(out, "Deals (quote by current phase>=threshold): {}", report.quote)?;
    writeln!(out, "Deals (non-quote): {}", report.non_quote)?;
    writeln!(out)?;

    render_histogram(out, "Status breakdown (quote by phase):", &report.quote_statuses)?;
    writeln!(out)?;
    render_histogram(out, "Status breakdown (all deals):", &report.all_statuses)?;
    writeln!(out)?;

    writeln!(out, "Classification rules:")?;
    for rule in &report.rules {
        writeln!(
            out,
            "  - {}: quote={} non_quote={}",
            rule.rule, rule.quote, rule.non_quote
        )?;
    }
    writeln!(out)?;

    let coverage = &report.coverage;
    writeln!(out, "Phase-history coverage (quote phase markers):")?;
    writeln!(
        out,
        "  - checked (quote_phase_last_checked_at != null): {}",
        coverage.checked
    )?;
    writeln!(out, "  - unknown/unprocessed: {}", coverage.unknown)?;
    writeln!(
        out,
        "  - reached quote phase (quote_phase_first_started_at != null): {}",
        coverage.reached_quote_phase
    )?;
    writeln!(
        out,
        "  - phase>=threshold but never reached quote phase (checked): {}",
        coverage.drift
    )?;

    if report.drift_samples.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(
        out,
        "Sample phase>=threshold-but-not-history deals (first {}):",
        report.drift_samples.len()
    )?;
    for sample in &report.drift_samples {
        let sort_order = sample
            .phase_sort_order
            .map(|rank| rank.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        write!(
            out,
            "  - {} | {} | status={} | phase={}({}) | {}",
            sample.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            sample.deal_id,
            sample.status,
            sample.phase_name,
            sort_order,
            sample.title
        )?;
        match &sample.url {
            Some(url) => writeln!(out, " | {url}")?,
            None => writeln!(out)?,
        }
    }
    let omitted = report.drift_omitted();
    if omitted > 0 {
        writeln!(out, "  ... {omitted} more not shown")?;
    }
    Ok(())
}

pub fn render_ids<W: Write>(out: &mut W, ids: &[&str]) -> io::Result<()> {
    for id in ids {
        writeln!(out, "{id}")?;
    }
    Ok(())
}

fn render_histogram<W: Write>(
    out: &mut W,
    title: &str,
    histogram: &[StatusCount],
) -> io::Result<()> {
    writeln!(out, "{title}")?;
    for entry in histogram {
        writeln!(out, "  - {}: {}", entry.status, entry.count)?;
    }
    Ok(())
}
