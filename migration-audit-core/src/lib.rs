//! # migration-audit-core
//!
//! Core library for migration-audit - reporting on GitHub organization
//! migrations.
//!
//! This library provides:
//! - Extraction of migration summaries from log chunks posted as issue comments
//! - CSV and JSON report formatting and output files
//! - Case-insensitive reconciliation of two organizations' repository names
//! - A paginated GitHub REST client and the pipelines that drive it
//! - Configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust
//! use migration_audit_core::{parse_migration_log, reconcile, MigrationStatus};
//!
//! let body = "<details><summary>Log Chunk 1</summary>\n```\n\
//!     [2024-01-01T00:00:00Z] INFO -- Migration complete\n```\n</details>";
//! let summary = parse_migration_log(body).into_summary().unwrap();
//! assert_eq!(summary.status, MigrationStatus::Completed);
//!
//! assert_eq!(reconcile(["Api", "web"], ["API"]), vec!["web"]);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use extract::{parse_migration_log, Extraction};
pub use github::{GitHubClient, Page, RepositorySource};
pub use pipeline::{
    collect_migration_report, find_missing_repositories, MigrationReport, RepositoryComparison,
};
pub use reconcile::{reconcile, RepositoryIndex};
pub use report::{migration_summaries_to_csv, repository_names_to_csv, ReportWriter};
pub use types::*;

// Public modules
pub mod config;
pub mod error;
pub mod extract;
pub mod github;
pub mod logging;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod types;
