//! Line scanner for log chunk blocks
//!
//! Turns the text of a fenced block into a lazy sequence of [`LogEvent`]s.
//! Lines that do not look like `[<timestamp>] <LEVEL> -- <message>`, or that
//! carry a level outside [`LogLevel`], are skipped without error.

use crate::types::{LogEvent, LogLevel};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Unanchored: a line may carry a prefix before the bracketed timestamp.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(.+?)\] ([A-Za-z0-9_]+) -- (.*)").expect("valid line regex")
});

/// Scan every line of `block`, yielding the events that parse.
pub fn scan_events(block: &str) -> impl Iterator<Item = LogEvent<'_>> {
    block.lines().filter_map(parse_line)
}

/// Parse one log line.
///
/// A malformed timestamp does not reject the line; the event is kept with
/// `timestamp: None`.
pub fn parse_line(line: &str) -> Option<LogEvent<'_>> {
    let caps = LINE_RE.captures(line)?;
    let level: LogLevel = caps.get(2)?.as_str().parse().ok()?;
    let timestamp = parse_timestamp(caps.get(1)?.as_str());
    let message = caps.get(3).map_or("", |m| m.as_str());

    Some(LogEvent {
        timestamp,
        level,
        message,
    })
}

/// Parse an ISO-8601 timestamp.
///
/// RFC 3339 with any offset is normalized to UTC. A date-time without an
/// offset is read as UTC so results never depend on the host timezone.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
