//! Report output: JSON files and the terminal summary.

use dbrecode_core::engine::{SessionReport, TableOutcome};
use dbrecode_core::error::RecodeError;
use dbrecode_core::Result;
use std::path::Path;

/// Serializes `report` as pretty JSON.
///
/// # Errors
/// Returns a serialization error if the report cannot be encoded.
pub fn report_json(report: &SessionReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(|e| RecodeError::Serialization {
        context: "session report".to_string(),
        source: e,
    })
}

/// Saves `report` to `output_path` as JSON.
///
/// # Errors
/// Returns an I/O error if the file cannot be written.
pub async fn save_report(report: &SessionReport, output_path: &Path) -> Result<()> {
    let json_data = report_json(report)?;
    tokio::fs::write(output_path, json_data)
        .await
        .map_err(|e| RecodeError::Io {
            context: format!("Failed to write to {}", output_path.display()),
            source: e,
        })?;
    Ok(())
}

/// One summary line per table, as printed after a run.
pub fn summary_lines(report: &SessionReport) -> Vec<String> {
    report
        .tables
        .iter()
        .map(|table| {
            let outcome = match &table.outcome {
                TableOutcome::Completed => "completed".to_string(),
                TableOutcome::Skipped { reason } => format!("skipped: {}", reason),
                TableOutcome::Aborted { reason } => format!("aborted: {}", reason),
            };
            let changed = if report.dry_run {
                format!("{} planned", table.count(|s| s.is_planned()))
            } else {
                format!("{} updated", table.count(|s| s.is_updated()))
            };
            format!(
                "{}: {} text columns, {}, {} failed ({})",
                table.table,
                table.text_columns.len(),
                changed,
                table.count(|s| s.is_failed() || s.is_rejected()),
                outcome
            )
        })
        .collect()
}
