//! Report formatting and output files
//!
//! CSV output is deliberately naive: every data field is wrapped in double
//! quotes and nothing is escaped, so a value containing `"` or a newline
//! produces a malformed row. Consumers that need exact text should read the
//! JSON report instead, which also carries the full warning and error
//! messages (the CSV only has their counts).

use crate::error::Result;
use crate::extract::format_timestamp;
use crate::types::MigrationSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Column headers of the migration summary CSV.
pub const MIGRATION_SUMMARY_HEADERS: [&str; 10] = [
    "Migration ID",
    "Source Repository",
    "Target Repository",
    "Started By",
    "Start Time",
    "Completion Time",
    "Duration (seconds)",
    "Status",
    "Warning Count",
    "Error Count",
];

/// Header of single-column repository name reports.
pub const REPOSITORY_NAME_HEADER: &str = "Repository Name";

/// Render summaries as CSV, one row per summary in input order.
///
/// Empty input yields the header line alone.
pub fn migration_summaries_to_csv(summaries: &[MigrationSummary]) -> String {
    let mut lines = Vec::with_capacity(summaries.len() + 1);
    lines.push(MIGRATION_SUMMARY_HEADERS.join(","));

    for summary in summaries {
        let fields = [
            summary.migration_id.clone(),
            summary.source_repo.clone(),
            summary.target_repo.clone(),
            summary.started_by.clone(),
            summary.start_time.clone(),
            summary.completion_time.clone(),
            summary.duration.to_string(),
            summary.status.to_string(),
            summary.warnings.len().to_string(),
            summary.errors.len().to_string(),
        ];
        lines.push(
            fields
                .iter()
                .map(|value| format!("\"{}\"", value))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

/// Render repository names as a single-column CSV.
pub fn repository_names_to_csv<S: AsRef<str>>(names: &[S]) -> String {
    let rows: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
    format!("{}\n{}", REPOSITORY_NAME_HEADER, rows.join("\n"))
}

/// Pretty-printed JSON with two-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Timestamp safe to embed in a file name (`:` replaced by `-`).
pub fn file_timestamp(ts: DateTime<Utc>) -> String {
    format_timestamp(ts).replace(':', "-")
}

/// Writes report files into one output directory with a shared timestamp.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    timestamp: String,
}

impl ReportWriter {
    /// Create a writer stamping every file with `now`.
    pub fn new(output_dir: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timestamp: file_timestamp(now),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Write `{org}-migration-summary-{ts}.csv`.
    pub fn write_migration_summary_csv(
        &self,
        org: &str,
        summaries: &[MigrationSummary],
    ) -> Result<PathBuf> {
        let name = format!("{}-migration-summary-{}.csv", org, self.timestamp);
        self.write(&name, &migration_summaries_to_csv(summaries))
    }

    /// Write `{org}-migration-summary-{ts}.json`.
    pub fn write_migration_summary_json(
        &self,
        org: &str,
        summaries: &[MigrationSummary],
    ) -> Result<PathBuf> {
        let name = format!("{}-migration-summary-{}.json", org, self.timestamp);
        self.write(&name, &to_pretty_json(summaries)?)
    }

    /// Write the repositories that have no migration issue, as JSON and CSV.
    ///
    /// Returns `(json_path, csv_path)`.
    pub fn write_repos_without_issue(
        &self,
        org: &str,
        repos: &[String],
    ) -> Result<(PathBuf, PathBuf)> {
        let stem = format!("{}-repos-without-migration-issues-{}", org, self.timestamp);
        let json = self.write(&format!("{}.json", stem), &to_pretty_json(repos)?)?;
        let csv = self.write(&format!("{}.csv", stem), &repository_names_to_csv(repos))?;
        Ok((json, csv))
    }

    /// Write `missing-repos-{source}-to-{target}-{ts}.csv`.
    pub fn write_missing_repos_csv(
        &self,
        source_org: &str,
        target_org: &str,
        missing: &[String],
    ) -> Result<PathBuf> {
        let name = format!(
            "missing-repos-{}-to-{}-{}.csv",
            source_org, target_org, self.timestamp
        );
        self.write(&name, &repository_names_to_csv(missing))
    }

    fn write(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, contents)?;
        tracing::info!(path = %path.display(), bytes = contents.len(), "Report written");
        Ok(path)
    }
}
