//! Plain-text analysis report

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::analytics::aggregator::{AggregateResult, DurationSummary, GroupCounts, Grouping};

const NO_DATA: &str = "no data";

/// Render visits per country, endpoint interest and the given duration summary
pub fn render_report(result: &AggregateResult, durations: &DurationSummary) -> String {
    let mut out = String::new();
    out.push_str("Report:\n---------\n");

    out.push_str("Number of Visits per Country:\n");
    push_counts(&mut out, result.grouping(Grouping::Country));

    out.push_str("\nMain Interests based on Viewed Endpoints:\n");
    push_counts(&mut out, result.grouping(Grouping::Endpoint));

    let _ = writeln!(out, "\nAverage Duration: {}", seconds(durations.mean));
    let _ = writeln!(
        out,
        "Standard Deviation of Duration: {}",
        seconds(durations.std_dev)
    );
    out
}

pub fn write_report(
    path: impl AsRef<Path>,
    result: &AggregateResult,
    durations: &DurationSummary,
) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render_report(result, durations))
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!(path = %path.display(), "Wrote analysis report");
    Ok(())
}

fn push_counts(out: &mut String, counts: Option<&GroupCounts>) {
    let entries = counts.map(|c| c.entries.as_slice()).unwrap_or_default();
    if entries.is_empty() {
        let _ = writeln!(out, "  ({NO_DATA})");
        return;
    }

    let width = entries.iter().map(|e| e.value.len()).max().unwrap_or(0);
    for entry in entries {
        let _ = writeln!(out, "  {:<width$}  {}", entry.value, entry.count);
    }
}

fn seconds(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2} seconds"),
        None => NO_DATA.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregator::aggregate;
    use crate::models::fixtures::record;
    use crate::models::LogTable;

    #[test]
    fn test_report_lists_counts_and_durations() {
        let table = LogTable::new(vec![
            record("2024-01-01 00:00:00", [1, 1, 1, 1], 0.0),
            record("2024-01-01 00:00:04", [1, 1, 1, 1], 4.0),
        ]);
        let result = aggregate(&table);
        let report = render_report(&result, &result.duration);

        assert!(report.contains("Kenya  2"));
        assert!(report.contains("/index.html  2"));
        assert!(report.contains("Average Duration: 2.00 seconds"));
        assert!(report.contains("Standard Deviation of Duration: 2.83 seconds"));
    }

    #[test]
    fn test_report_on_empty_table_says_no_data() {
        let result = aggregate(&LogTable::default());
        let report = render_report(&result, &result.duration);
        assert!(report.contains("Average Duration: no data"));
        assert!(report.contains("(no data)"));
    }
}
