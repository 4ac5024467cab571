//! Migration log extraction
//!
//! GitHub's importer posts migration logs as issue comments of the form:
//!
//! ````text
//! <details><summary>Log Chunk 1</summary>
//! ```
//! [2024-01-01T00:00:00.000Z] INFO -- Migration started by alice from https://github.com/org/src to org/dst
//! [2024-01-01T00:00:00.000Z] INFO -- Migration ID: 1234abcd-0000-0000-0000-000000000000
//! [2024-01-01T00:02:05.000Z] WARN -- slow clone
//! [2024-01-01T00:02:05.000Z] INFO -- Migration complete
//! ```
//! </details>
//! ````
//!
//! [`parse_migration_log`] gates on the `Log Chunk` marker, takes the first
//! fenced block, scans it into events and then runs four independent finders
//! over them. Only the gates produce [`Extraction::Absent`]; once a block is
//! found a summary is always returned, possibly with every field defaulted.
//!
//! Only the first fenced block of a comment is read. Logs split over several
//! chunks or comments yield one summary per comment, built from its first
//! chunk.

mod scanner;

pub use scanner::{format_timestamp, parse_line, parse_timestamp, scan_events};

use crate::types::{LogEvent, LogLevel, MigrationStatus, MigrationSummary};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Substring that marks a comment as carrying a log chunk.
pub const LOG_CHUNK_MARKER: &str = "<details><summary>Log Chunk";

static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\n(.*?)\n```").expect("valid code block regex"));

static START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Migration started by ([A-Za-z0-9_]+) from (https://github\.com/\S+) to (\S+)")
        .expect("valid start regex")
});

static MIGRATION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Migration ID: ([a-f0-9-]+)").expect("valid migration id regex"));

const START_NEEDLE: &str = "Migration started by";
const MIGRATION_ID_NEEDLE: &str = "Migration ID:";
const COMPLETE_MESSAGE: &str = "Migration complete";

/// Result of running the extractor over a comment body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// No log chunk marker, or no fenced block after it
    Absent,
    /// A log chunk was found; fields the log lacks keep their defaults
    Present(MigrationSummary),
}

impl Extraction {
    pub fn is_present(&self) -> bool {
        matches!(self, Extraction::Present(_))
    }

    pub fn into_summary(self) -> Option<MigrationSummary> {
        match self {
            Extraction::Present(summary) => Some(summary),
            Extraction::Absent => None,
        }
    }
}

/// Extract a [`MigrationSummary`] from an issue comment body.
///
/// Never fails: malformed lines are skipped and missing fields stay empty.
pub fn parse_migration_log(body: &str) -> Extraction {
    if !body.contains(LOG_CHUNK_MARKER) {
        return Extraction::Absent;
    }

    let Some(block) = first_code_block(body) else {
        tracing::debug!("log chunk marker without a fenced block");
        return Extraction::Absent;
    };

    let events: Vec<LogEvent<'_>> = scan_events(block).collect();
    let summary = summarize(&events);

    tracing::debug!(
        events = events.len(),
        migration_id = %summary.migration_id,
        status = %summary.status,
        warnings = summary.warnings.len(),
        errors = summary.errors.len(),
        "Extracted migration log chunk"
    );

    Extraction::Present(summary)
}

/// Content of the first fenced block, or `None` if there is none or it is empty.
fn first_code_block(body: &str) -> Option<&str> {
    CODE_BLOCK_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|block| !block.is_empty())
}

/// Build a summary from already scanned events.
pub fn summarize(events: &[LogEvent<'_>]) -> MigrationSummary {
    let mut summary = MigrationSummary::default();

    let start = apply_start(&mut summary, events);

    if let Some(id) = find_migration_id(events) {
        summary.migration_id = id.to_string();
    }

    if let Some(complete) = first_info(events, |msg| msg == COMPLETE_MESSAGE) {
        summary.status = MigrationStatus::Completed;
        if let Some(end) = complete.timestamp {
            summary.completion_time = format_timestamp(end);
            if let Some(start) = start {
                summary.duration = duration_seconds(start, end);
            }
        }
    }

    summary.warnings = messages_at(events, LogLevel::Warn);
    summary.errors = messages_at(events, LogLevel::Error);

    summary
}

/// Fill actor and repositories from the start line; returns the start time.
///
/// Only the first INFO event mentioning the start is examined. If it does not
/// match the full pattern, later events are not tried.
fn apply_start(summary: &mut MigrationSummary, events: &[LogEvent<'_>]) -> Option<DateTime<Utc>> {
    let event = first_info(events, |msg| msg.contains(START_NEEDLE))?;
    let caps = START_RE.captures(event.message)?;

    summary.started_by = caps[1].to_string();
    summary.source_repo = caps[2].to_string();
    summary.target_repo = caps[3].to_string();

    let start = event.timestamp?;
    summary.start_time = format_timestamp(start);
    Some(start)
}

fn find_migration_id<'a>(events: &[LogEvent<'a>]) -> Option<&'a str> {
    let event = first_info(events, |msg| msg.contains(MIGRATION_ID_NEEDLE))?;
    MIGRATION_ID_RE
        .captures(event.message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn first_info<'e, 'a>(
    events: &'e [LogEvent<'a>],
    pred: impl Fn(&str) -> bool,
) -> Option<&'e LogEvent<'a>> {
    events
        .iter()
        .find(|event| event.level == LogLevel::Info && pred(event.message))
}

fn messages_at(events: &[LogEvent<'_>], level: LogLevel) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.level == level)
        .map(|event| event.message.to_string())
        .collect()
}

/// Whole seconds between two instants, rounding halves up.
///
/// Computed from millisecond timestamps so it agrees with the rendered
/// `startTime`/`completionTime`. Not clamped: a completion logged before the
/// start gives a negative value.
fn duration_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = end.timestamp_millis() - start.timestamp_millis();
    (millis as f64 / 1000.0 + 0.5).floor() as i64
}
