//! Human-readable reports for the command line
//!
//! Each `format_*` function renders a report to a string and the matching
//! `print_*` writes it to stdout.

use crate::crawler::{CrawlerStatus, CycleReport};
use crate::dedup::ScanReport;
use crate::storage::{RunRecord, StoreStats};
use std::fmt::Write;

/// Share of `part` in `total` as a percentage, 0 when `total` is 0
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Renders store-wide statistics plus the latest run, if any
pub fn format_store_stats(stats: &StoreStats, latest_run: Option<&RunRecord>) -> String {
    let mut out = String::new();
    let total = stats.total_records;

    let _ = writeln!(out, "=== Store Statistics ===\n");
    let _ = writeln!(out, "Records:");
    let _ = writeln!(out, "  Total: {}", total);
    let _ = writeln!(
        out,
        "  Published: {} ({:.1}%)",
        stats.published,
        percentage(stats.published, total)
    );
    let _ = writeln!(
        out,
        "  Drafts: {} ({:.1}%)",
        stats.drafts,
        percentage(stats.drafts, total)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Extraction Quality:");
    for (label, count) in [
        ("Full", stats.full_quality),
        ("Partial", stats.partial_quality),
        ("Low", stats.low_quality),
    ] {
        let _ = writeln!(
            out,
            "  {}: {} ({:.1}%)",
            label,
            count,
            percentage(count, total)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Duplicate Groups:");
    let _ = writeln!(out, "  Pending: {}", stats.pending_groups);
    let _ = writeln!(out, "  Merged: {}", stats.merged_groups);
    let _ = writeln!(out, "  Ignored: {}", stats.ignored_groups);
    let _ = writeln!(out);

    let _ = writeln!(out, "Crawl Runs: {}", stats.total_runs);
    if let Some(run) = latest_run {
        let _ = writeln!(
            out,
            "  Latest: #{} ({}, {}) started {}",
            run.id,
            run.trigger.to_db_string(),
            run.status.to_db_string(),
            run.started_at.to_rfc3339()
        );
        let _ = writeln!(
            out,
            "  Processed: {}, success: {}, duplicates: {}, errors: {}",
            run.total_processed,
            run.success,
            run.duplicates,
            run.errors.len()
        );
    }

    out
}

/// Renders the outcome of one cycle
pub fn format_cycle_report(report: &CycleReport) -> String {
    let mut out = String::new();
    let stats = &report.stats;
    let duration = report.finished_at - report.started_at;

    let _ = writeln!(
        out,
        "=== Crawl Cycle #{} ({}) ===\n",
        report.run_id,
        report.trigger.to_db_string()
    );
    let _ = writeln!(out, "  Duration: {}s", duration.num_seconds());
    let _ = writeln!(out, "  Processed: {}", stats.total_processed);
    let _ = writeln!(out, "  Success: {}", stats.success);
    let _ = writeln!(out, "  Duplicates: {}", stats.duplicates);
    let _ = writeln!(out, "  Errors: {}", stats.error_count());

    if !stats.errors.is_empty() {
        let _ = writeln!(out, "\nErrors:");
        for entry in &stats.errors {
            let category = entry
                .category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let item = entry.external_id.as_deref().unwrap_or("-");
            let _ = writeln!(
                out,
                "  [category {}] [item {}] {}",
                category, item, entry.message
            );
        }
    }

    out
}

/// Renders the groups produced by a duplicate scan
pub fn format_scan_report(report: &ScanReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Duplicate Scan ===\n");
    let _ = writeln!(out, "  Records scanned: {}", report.scanned);
    let _ = writeln!(out, "  Pending groups: {}", report.groups.len());

    for group in &report.groups {
        let members: Vec<String> = group.members.iter().map(|m| m.to_string()).collect();
        let _ = writeln!(
            out,
            "  - group {} (similarity {}): records {}",
            group.id,
            group.similarity,
            members.join(", ")
        );
    }

    out
}

/// Renders a controller status snapshot
pub fn format_status(status: &CrawlerStatus) -> String {
    let mut out = String::new();
    let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
    };

    let _ = writeln!(out, "=== Crawler Status ===\n");
    let _ = writeln!(out, "  Enabled: {}", status.enabled);
    let _ = writeln!(out, "  Running: {}", status.running);
    let _ = writeln!(out, "  Interval: {} minutes", status.interval_minutes);
    let _ = writeln!(out, "  Last run: {}", time(status.last_run));
    let _ = writeln!(out, "  Next run: {}", time(status.next_run));
    let _ = writeln!(
        out,
        "  Totals: {} cycles, {} processed, {} success, {} duplicates, {} errors",
        status.totals.cycles,
        status.totals.total_processed,
        status.totals.success,
        status.totals.duplicates,
        status.totals.errors
    );

    if !status.recent_errors.is_empty() {
        let _ = writeln!(out, "\nRecent Errors ({}):", status.recent_errors.len());
        for entry in &status.recent_errors {
            let _ = writeln!(
                out,
                "  {} {}",
                entry.occurred_at.to_rfc3339(),
                entry.message
            );
        }
    }

    out
}

pub fn print_store_stats(stats: &StoreStats, latest_run: Option<&RunRecord>) {
    print!("{}", format_store_stats(stats, latest_run));
}

pub fn print_cycle_report(report: &CycleReport) {
    print!("{}", format_cycle_report(report));
}

pub fn print_scan_report(report: &ScanReport) {
    print!("{}", format_scan_report(report));
}

pub fn print_status(status: &CrawlerStatus) {
    print!("{}", format_status(status));
}
