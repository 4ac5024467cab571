//! Report pipelines
//!
//! Drive a [`RepositorySource`] page by page and feed the results through the
//! extractor and reconciler. Any source error aborts the organization's pass;
//! nothing is retried here, the client owns retries.

use crate::error::Result;
use crate::extract::parse_migration_log;
use crate::github::{Page, RepositorySource};
use crate::reconcile::RepositoryIndex;
use crate::types::MigrationSummary;

/// Outcome of scanning an organization for migration logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// One per log chunk comment, in repository then comment order
    pub summaries: Vec<MigrationSummary>,
    /// Repositories without a migration issue, in listing order
    pub repos_without_issue: Vec<String>,
    pub repos_scanned: usize,
    pub comments_scanned: usize,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.repos_without_issue.is_empty()
    }
}

/// Outcome of comparing two organizations' repository names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryComparison {
    /// Distinct (case-insensitive) names in the source organization
    pub source_count: usize,
    pub target_count: usize,
    /// Source names absent from the target, with source casing
    pub missing: Vec<String>,
}

/// Scan every repository of `org` for migration log comments.
pub async fn collect_migration_report(
    source: &dyn RepositorySource,
    org: &str,
    per_page: u32,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    let mut page = Page::first(per_page);

    loop {
        let repos = source.list_repositories(org, page).await?;

        for repo in &repos {
            report.repos_scanned += 1;
            tracing::info!(repo = %repo.name, "Processing repository");

            let Some(issue) = source.find_migration_issue(org, &repo.name).await? else {
                tracing::info!(repo = %repo.name, "No migration issue found");
                report.repos_without_issue.push(repo.name.clone());
                continue;
            };

            tracing::info!(
                repo = %repo.name,
                issue = issue.number,
                title = %issue.title,
                "Migration issue found"
            );

            let found =
                scan_issue_comments(source, org, &repo.name, issue.number, per_page, &mut report)
                    .await?;
            if found > 0 {
                tracing::info!(repo = %repo.name, logs = found, "Found migration logs");
            }
        }

        if page.is_last(repos.len()) {
            break;
        }
        page = page.next();
    }

    tracing::info!(
        org,
        repos = report.repos_scanned,
        summaries = report.summaries.len(),
        without_issue = report.repos_without_issue.len(),
        "Migration issue scan complete"
    );

    Ok(report)
}

/// Extract every log chunk comment of one issue into `report`.
///
/// Returns the number of summaries added.
async fn scan_issue_comments(
    source: &dyn RepositorySource,
    org: &str,
    repo: &str,
    issue_number: u64,
    per_page: u32,
    report: &mut MigrationReport,
) -> Result<usize> {
    let before = report.summaries.len();
    let mut page = Page::first(per_page);

    loop {
        let comments = source
            .list_issue_comments(org, repo, issue_number, page)
            .await?;

        report.comments_scanned += comments.len();
        report.summaries.extend(
            comments
                .iter()
                .filter_map(|comment| parse_migration_log(&comment.body).into_summary()),
        );

        if page.is_last(comments.len()) {
            break;
        }
        page = page.next();
    }

    Ok(report.summaries.len() - before)
}

/// Index every repository name of `org`.
pub async fn collect_repository_index(
    source: &dyn RepositorySource,
    org: &str,
    per_page: u32,
) -> Result<RepositoryIndex> {
    let mut index = RepositoryIndex::new();
    let mut page = Page::first(per_page);

    loop {
        let repos = source.list_repositories(org, page).await?;
        index.extend(repos.iter().map(|repo| repo.name.as_str()));

        if page.is_last(repos.len()) {
            break;
        }
        page = page.next();
    }

    tracing::info!(org, repos = index.len(), "Collected repositories");
    Ok(index)
}

/// Repositories of `source_org` that `target_org` lacks, compared by lowercase name.
///
/// Both listings are exhausted before comparing.
pub async fn find_missing_repositories(
    source: &dyn RepositorySource,
    source_org: &str,
    target: &dyn RepositorySource,
    target_org: &str,
    per_page: u32,
) -> Result<RepositoryComparison> {
    tracing::info!(source_org, target_org, "Comparing organizations");

    let source_index = collect_repository_index(source, source_org, per_page).await?;
    let target_index = collect_repository_index(target, target_org, per_page).await?;
    let missing = source_index.missing_from(&target_index);

    tracing::info!(
        source_org,
        target_org,
        missing = missing.len(),
        "Repository comparison complete"
    );

    Ok(RepositoryComparison {
        source_count: source_index.len(),
        target_count: target_index.len(),
        missing,
    })
}
