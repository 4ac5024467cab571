//! migration-audit - reports on GitHub organization migrations
//!
//! Subcommands:
//! - `migration-issues`: read the migration log comments of every repository
//!   in an organization and write a CSV/JSON summary, plus the list of
//!   repositories that have no migration issue
//! - `missing-repos`: list repositories of a source organization that are
//!   absent (case-insensitively) from a target organization
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/migration-audit/config.toml
//! - Logs: $XDG_STATE_HOME/migration-audit/
//!
//! Reports go to `./output` unless `--output-dir` or `[output] dir` says otherwise.

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migration_audit_core::logging::LoggingGuard;
use migration_audit_core::{
    collect_migration_report, find_missing_repositories, Config, GitHubClient, ReportWriter,
};
use settings::ApiArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "migration-audit")]
#[command(about = "Migration log and repository reconciliation reports for GitHub organizations")]
#[command(version)]
struct Args {
    /// Also log to stderr
    #[arg(short, long, global = true, env = "VERBOSE")]
    verbose: bool,

    /// Config file (default: $XDG_CONFIG_HOME/migration-audit/config.toml)
    #[arg(long, global = true, env = "MIGRATION_AUDIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize migration logs posted on each repository's migration issue
    #[command(alias = "get-migration-issues")]
    MigrationIssues {
        /// Organization to scan
        #[arg(short = 'o', long, env = "ORG_NAME")]
        org_name: String,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// List source organization repositories missing from the target organization
    #[command(alias = "get-missing-repos")]
    MissingRepos {
        /// Organization the repositories come from
        #[arg(short = 's', long, env = "SOURCE_ORG_NAME")]
        source_org_name: String,

        /// Organization the repositories should exist in
        #[arg(short = 'o', long, env = "ORG_NAME")]
        org_name: String,

        /// Token for the source organization (default: the target token)
        #[arg(long, env = "SOURCE_ACCESS_TOKEN", hide_env_values = true)]
        source_access_token: Option<String>,

        #[command(flatten)]
        api: ApiArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, a malformed one is not
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("failed to load .env"),
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    match args.command {
        Command::MigrationIssues { org_name, api } => {
            let _log_guard = prepare(&mut config, &api, args.verbose)?;
            cmd_migration_issues(&config, &org_name).await
        }
        Command::MissingRepos {
            source_org_name,
            org_name,
            source_access_token,
            api,
        } => {
            let _log_guard = prepare(&mut config, &api, args.verbose)?;
            cmd_missing_repos(
                &config,
                &source_org_name,
                &org_name,
                source_access_token.as_deref(),
            )
            .await
        }
    }
}

/// Apply flag overrides, validate, then start logging.
fn prepare(config: &mut Config, api: &ApiArgs, verbose: bool) -> Result<LoggingGuard> {
    api.apply(config);
    config.validate().context("invalid configuration")?;

    migration_audit_core::logging::init(&config.logging, verbose)
        .context("failed to initialize logging")
}

async fn cmd_migration_issues(config: &Config, org: &str) -> Result<()> {
    tracing::info!(org, "Starting migration issue scan");

    let client = GitHubClient::new(&config.github, None, config.retry.clone())
        .context("failed to create GitHub client")?;

    let report = collect_migration_report(&client, org, config.github.page_size)
        .await
        .with_context(|| format!("failed to scan organization {}", org))?;

    println!("Repositories scanned:          {}", report.repos_scanned);
    println!("Migration logs found:          {}", report.summaries.len());
    println!(
        "Repos without migration issue: {}",
        report.repos_without_issue.len()
    );

    if report.is_empty() {
        return Ok(());
    }

    let writer = ReportWriter::new(&config.output.dir, chrono::Utc::now());

    if !report.summaries.is_empty() {
        let csv = writer
            .write_migration_summary_csv(org, &report.summaries)
            .context("failed to write migration summary CSV")?;
        let json = writer
            .write_migration_summary_json(org, &report.summaries)
            .context("failed to write migration summary JSON")?;
        println!("Migration summary saved to {}", csv.display());
        println!("Migration summary saved to {}", json.display());
    }

    if !report.repos_without_issue.is_empty() {
        let (json, csv) = writer
            .write_repos_without_issue(org, &report.repos_without_issue)
            .context("failed to write repos without migration issues")?;
        println!("Repos without migration issues saved to {}", json.display());
        println!("Repos without migration issues saved to {}", csv.display());
    }

    Ok(())
}

async fn cmd_missing_repos(
    config: &Config,
    source_org: &str,
    target_org: &str,
    source_token: Option<&str>,
) -> Result<()> {
    let source = GitHubClient::new(&config.github, source_token, config.retry.clone())
        .context("failed to create GitHub client for the source organization")?;
    let target = GitHubClient::new(&config.github, None, config.retry.clone())
        .context("failed to create GitHub client for the target organization")?;

    let comparison = find_missing_repositories(
        &source,
        source_org,
        &target,
        target_org,
        config.github.page_size,
    )
    .await
    .with_context(|| format!("failed to compare {} with {}", source_org, target_org))?;

    println!("Repositories in {}: {}", source_org, comparison.source_count);
    println!("Repositories in {}: {}", target_org, comparison.target_count);
    println!("Missing from {}: {}", target_org, comparison.missing.len());

    if comparison.missing.is_empty() {
        return Ok(());
    }

    let writer = ReportWriter::new(&config.output.dir, chrono::Utc::now());
    let path = writer
        .write_missing_repos_csv(source_org, target_org, &comparison.missing)
        .context("failed to write missing repositories CSV")?;
    println!("Missing repositories saved to {}", path.display());

    Ok(())
}
