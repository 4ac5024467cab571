//! Core domain types for migration-audit
//!
//! | Term | Definition |
//! |------|------------|
//! | **Log chunk** | A fenced, line-oriented event log embedded in an issue comment |
//! | **LogEvent** | One parsed `[timestamp] LEVEL -- message` line of a log chunk |
//! | **MigrationSummary** | The record distilled from one log chunk |
//! | **Repository** | A repository in an organization, identified by name only |
//!
//! Repository identity is name-based: two repositories are the same when
//! their lowercase names are equal. Numeric IDs are never compared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Log events
// ============================================

/// Severity of a log chunk line.
///
/// Closed set: lines carrying any other level token are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

/// A single event from a log chunk.
///
/// Borrowed from the comment body; events only live for one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent<'a> {
    /// `None` when the bracketed text is not a valid timestamp
    pub timestamp: Option<DateTime<Utc>>,
    pub level: LogLevel,
    pub message: &'a str,
}

// ============================================
// Migration summaries
// ============================================

/// Outcome of a migration as far as its log shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// No completion marker was found
    #[default]
    Unknown,
    Completed,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Unknown => "unknown",
            MigrationStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record distilled from one log chunk.
///
/// String fields are empty when the log does not provide them. Timestamps are
/// kept as rendered ISO-8601 strings because that is the shape written to the
/// CSV and JSON reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub migration_id: String,
    pub source_repo: String,
    pub target_repo: String,
    pub started_by: String,
    pub start_time: String,
    pub completion_time: String,
    /// Seconds between start and completion; may be negative for reordered logs
    pub duration: i64,
    pub status: MigrationStatus,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

// ============================================
// GitHub entities
// ============================================

/// A repository as listed for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
}

/// An issue; only what is needed to locate its comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
}

/// An issue comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// GitHub sends `null` for empty bodies
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
