//! GitHub access
//!
//! Pipelines talk to GitHub through the [`RepositorySource`] trait so they can
//! run against [`GitHubClient`] in production and an in-memory source in
//! tests. Listings are paginated: callers request one [`Page`] at a time and
//! stop at the first short page.

mod client;

pub use client::GitHubClient;

use crate::error::Result;
use crate::types::{Comment, Issue, Repository};
use async_trait::async_trait;

/// GitHub's per-page ceiling for REST listings.
pub const MAX_PER_PAGE: u32 = 100;

/// One page of a paginated listing (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub per_page: u32,
}

impl Page {
    /// First page, with `per_page` clamped to `1..=100`.
    pub fn first(per_page: u32) -> Self {
        Self {
            number: 1,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn next(self) -> Self {
        Self {
            number: self.number + 1,
            ..self
        }
    }

    /// A page holding fewer items than requested is the last one.
    pub fn is_last(&self, len: usize) -> bool {
        len < self.per_page as usize
    }
}

/// Read access to the organization data the reports need.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// One page of an organization's repositories.
    async fn list_repositories(&self, org: &str, page: Page) -> Result<Vec<Repository>>;

    /// The issue carrying the repository's migration logs, if there is one.
    async fn find_migration_issue(&self, org: &str, repo: &str) -> Result<Option<Issue>>;

    /// One page of an issue's comments, oldest first.
    async fn list_issue_comments(
        &self,
        org: &str,
        repo: &str,
        issue_number: u64,
        page: Page,
    ) -> Result<Vec<Comment>>;
}
