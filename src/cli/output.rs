//! Output formatting helpers for CLI commands

use crate::alerts::{AlertCounts, AlertRecord, AlertStatus, MetricsSnapshot, Severity};
use crate::fetch::PollState;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// Severity label colored by urgency.
pub fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Critical => "critical".red().bold().to_string(),
        Severity::High => "high".red().to_string(),
        Severity::Medium => "medium".yellow().to_string(),
        Severity::Low => "low".cyan().to_string(),
    }
}

/// Get icon for alert status
pub fn status_icon(status: AlertStatus) -> &'static str {
    match status {
        AlertStatus::Active => "●",
        AlertStatus::Acknowledged => "◐",
        AlertStatus::Resolved => "✓",
    }
}

/// Format alerts as a table, in the order given (newest first from the store)
pub fn format_alerts_table(alerts: &[AlertRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Severity", "PoP", "Status", "Message"]);

    for alert in alerts {
        table.add_row(vec![
            Cell::new(alert.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(severity_label(alert.severity)),
            Cell::new(format!("{} ({})", alert.pop.label(), alert.pop.code)),
            Cell::new(format!(
                "{} {:?}",
                status_icon(alert.status),
                alert.status
            )),
            Cell::new(&alert.message),
        ]);
    }

    table.to_string()
}

/// One-line summary of store counts
pub fn format_counts(counts: AlertCounts) -> String {
    format!(
        "{} alerts stored, {} active, {} critical",
        counts.total,
        counts.active,
        if counts.critical > 0 {
            counts.critical.to_string().red().bold().to_string()
        } else {
            counts.critical.to_string()
        }
    )
}

/// Format the final watch state as JSON
pub fn format_watch_json(
    alerts: &[AlertRecord],
    counts: AlertCounts,
    metrics: &MetricsSnapshot,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "alerts": alerts,
        "counts": counts,
        "metrics": metrics,
    }))
}

/// Render one poll update; `None` while a fetch is still outstanding
pub fn format_poll_update(state: &PollState) -> Option<String> {
    if state.loading {
        return None;
    }
    if let Some(error) = &state.error {
        let stale = state
            .last_updated
            .map(|t| format!(" (showing data from {})", t.format("%H:%M:%S")))
            .unwrap_or_default();
        return Some(format!("{} {}{}", "✗".red(), error, stale));
    }
    let data = state.data.as_ref()?;
    Some(serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()))
}
