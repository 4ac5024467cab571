//! HTTP client for the GitHub REST API
//!
//! Authenticates with a bearer token and retries transient failures with
//! exponential backoff. Rate-limit responses wait for the window reset
//! announced by GitHub without using up an attempt; the request is abandoned
//! once the accumulated wait would exceed `retry.rate_limit_max_wait_secs`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{GitHubConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::types::{Comment, Issue, Repository};

use super::{Page, RepositorySource, MAX_PER_PAGE};

const API_VERSION: &str = "2022-11-28";

/// Floor for rate-limit waits, so a reset time already in the past still
/// counts against the wait budget.
const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Issue as listed by `GET /repos/{owner}/{repo}/issues`, which also returns PRs.
#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

/// A failed attempt and whether it is worth repeating.
struct Failure {
    error: Error,
    retryable: bool,
    /// Server-requested wait, overriding the backoff schedule
    wait: Option<Duration>,
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self {
            retryable: error.is_transient(),
            error,
            wait: None,
        }
    }
}

/// GitHub REST client
pub struct GitHubClient {
    http_client: reqwest::Client,
    base_url: String,
    issue_title: String,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a client from configuration.
    ///
    /// `token` overrides `config.token`; this lets one process hold clients
    /// for two organizations with different credentials.
    pub fn new(config: &GitHubConfig, token: Option<&str>, retry: RetryConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("github.base_url is required".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("migration-audit/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(token) = token.or(config.token.as_deref()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Config(format!("invalid access token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else {
            tracing::warn!("No GitHub token configured; requests are unauthenticated");
        }

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers);

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| Error::Config(format!("invalid proxy_url: {}", e)))?;
            builder = builder.proxy(proxy);
        } else {
            // Only an explicitly configured proxy is used
            builder = builder.no_proxy();
        }

        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            issue_title: config.issue_title.to_lowercase(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET with retries.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, page: Page) -> Result<T> {
        let mut retry = 0;
        let mut rate_limited = Duration::ZERO;

        loop {
            let failure = match self.try_get(url, page).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if let Some(wait) = failure.wait {
                let wait = wait.max(MIN_RATE_LIMIT_WAIT);
                rate_limited += wait;
                if rate_limited > self.retry.rate_limit_max_wait() {
                    tracing::error!(
                        url,
                        wait_secs = wait.as_secs(),
                        max_wait_secs = self.retry.rate_limit_max_wait_secs,
                        "Rate limit wait exceeds the configured maximum"
                    );
                    return Err(failure.error);
                }

                tracing::warn!(
                    url,
                    wait_secs = wait.as_secs(),
                    error = %failure.error,
                    "Rate limited, waiting for reset"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            retry += 1;
            if !failure.retryable || retry >= self.retry.max_attempts {
                return Err(failure.error);
            }

            let delay = self.retry.delay_for(retry);

            tracing::warn!(
                url,
                attempt = retry + 1,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure.error,
                "Retrying GitHub request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn try_get<T: DeserializeOwned>(
        &self,
        url: &str,
        page: Page,
    ) -> std::result::Result<T, Failure> {
        tracing::debug!(url, page = page.number, per_page = page.per_page, "GET");

        let response = self
            .http_client
            .get(url)
            .query(&[("per_page", page.per_page), ("page", page.number)])
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;
            return Ok(serde_json::from_slice(&body).map_err(Error::from)?);
        }

        let wait = rate_limit_wait(status, response.headers(), unix_now());
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        let error = Error::Api {
            status: status.as_u16(),
            message,
        };

        Err(match wait {
            Some(wait) => Failure {
                error,
                retryable: true,
                wait: Some(wait),
            },
            None => Failure::from(error),
        })
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn list_repositories(&self, org: &str, page: Page) -> Result<Vec<Repository>> {
        let url = self.url(&format!("/orgs/{}/repos", urlencoding::encode(org)));
        self.get_json(&url, page).await
    }

    async fn find_migration_issue(&self, org: &str, repo: &str) -> Result<Option<Issue>> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues?state=all",
            urlencoding::encode(org),
            urlencoding::encode(repo)
        ));

        let mut page = Page::first(MAX_PER_PAGE);
        loop {
            let issues: Vec<RawIssue> = match self.get_json(&url, page).await {
                Ok(issues) => issues,
                // Repository gone, or issues disabled
                Err(Error::Api { status: 404, .. }) | Err(Error::Api { status: 410, .. }) => {
                    return Ok(None)
                }
                Err(e) => return Err(e),
            };

            let found = issues
                .iter()
                .find(|issue| {
                    issue.pull_request.is_none() && title_matches(&issue.title, &self.issue_title)
                })
                .map(|issue| Issue {
                    number: issue.number,
                    title: issue.title.clone(),
                });

            if found.is_some() || page.is_last(issues.len()) {
                return Ok(found);
            }
            page = page.next();
        }
    }

    async fn list_issue_comments(
        &self,
        org: &str,
        repo: &str,
        issue_number: u64,
        page: Page,
    ) -> Result<Vec<Comment>> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{}/comments",
            urlencoding::encode(org),
            urlencoding::encode(repo),
            issue_number
        ));
        self.get_json(&url, page).await
    }
}

/// `marker` must already be lowercase.
fn title_matches(title: &str, marker: &str) -> bool {
    title.to_lowercase().contains(marker)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// How long GitHub asks us to wait, if the response is a rate-limit rejection.
///
/// Secondary limits send `retry-after`; primary limits send
/// `x-ratelimit-remaining: 0` with the reset time as a Unix timestamp.
fn rate_limit_wait(status: StatusCode, headers: &HeaderMap, now: u64) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    if let Some(secs) = header(RETRY_AFTER.as_str()) {
        return Some(Duration::from_secs(secs));
    }

    if header("x-ratelimit-remaining") == Some(0) {
        let reset = header("x-ratelimit-reset").unwrap_or(now);
        return Some(Duration::from_secs(reset.saturating_sub(now)));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_client_with_default_config() {
        let client =
            GitHubClient::new(&GitHubConfig::default(), Some("ghp_test"), RetryConfig::default())
                .unwrap();
        assert_eq!(client.base_url(), "https://api.github.com");
        assert_eq!(
            client.url("/orgs/acme/repos"),
            "https://api.github.com/orgs/acme/repos"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = GitHubConfig {
            base_url: "https://ghe.example.com/api/v3/".to_string(),
            ..Default::default()
        };
        let client = GitHubClient::new(&config, None, RetryConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_client_rejects_bad_token() {
        let result = GitHubClient::new(
            &GitHubConfig::default(),
            Some("line\nbreak"),
            RetryConfig::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_client_rejects_empty_base_url() {
        let config = GitHubConfig {
            base_url: "/".to_string(),
            ..Default::default()
        };
        assert!(GitHubClient::new(&config, None, RetryConfig::default()).is_err());
    }

    #[test]
    fn test_title_matches() {
        assert!(title_matches("Migration Log", "migration"));
        assert!(title_matches("[GEI] MIGRATION", "migration"));
        assert!(!title_matches("Bug report", "migration"));
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let wait = rate_limit_wait(
            StatusCode::FORBIDDEN,
            &headers(&[("retry-after", "60")]),
            1_000,
        );
        assert_eq!(wait, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_rate_limit_reset() {
        let wait = rate_limit_wait(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1030")]),
            1_000,
        );
        assert_eq!(wait, Some(Duration::from_secs(30)));

        let wait = rate_limit_wait(
            StatusCode::TOO_MANY_REQUESTS,
            &headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "900")]),
            1_000,
        );
        assert_eq!(wait, Some(Duration::ZERO));
    }

    #[test]
    fn test_plain_forbidden_is_not_rate_limit() {
        let wait = rate_limit_wait(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "4999")]),
            1_000,
        );
        assert_eq!(wait, None);

        let wait = rate_limit_wait(
            StatusCode::INTERNAL_SERVER_ERROR,
            &headers(&[("retry-after", "5")]),
            1_000,
        );
        assert_eq!(wait, None);
    }

    // ============================================
    // Requests against a local HTTP server
    // ============================================

    struct Reply {
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: String,
    }

    fn reply(status: u16, body: serde_json::Value) -> Reply {
        Reply {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    impl Reply {
        fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
            self.headers.push((name, value));
            self
        }

        fn render(&self) -> String {
            let reason = StatusCode::from_u16(self.status)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or("Unknown");
            let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason);
            out.push_str("content-type: application/json\r\n");
            out.push_str(&format!("content-length: {}\r\n", self.body.len()));
            out.push_str("connection: close\r\n");
            for (name, value) in &self.headers {
                out.push_str(&format!("{}: {}\r\n", name, value));
            }
            out.push_str("\r\n");
            out.push_str(&self.body);
            out
        }
    }

    /// Serves `replies` in order, one connection each, recording request targets.
    struct StubServer {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(replies: Vec<Reply>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));

            let seen = Arc::clone(&requests);
            tokio::spawn(async move {
                for reply in replies {
                    let Ok((mut stream, _)) = listener.accept().await else {
                        return;
                    };
                    let target = read_request_target(&mut stream).await;
                    seen.lock().unwrap().push(target);
                    let _ = stream.write_all(reply.render().as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self { base_url, requests }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn client(&self, retry: RetryConfig) -> GitHubClient {
            let config = GitHubConfig {
                base_url: self.base_url.clone(),
                timeout_secs: 5,
                ..Default::default()
            };
            GitHubClient::new(&config, Some("ghp_test"), retry).unwrap()
        }
    }

    async fn read_request_target(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        String::from_utf8_lossy(&buf)
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string()
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_issue_listing_means_no_issue() {
        for status in [404, 410] {
            let server = StubServer::start(vec![reply(status, json!({"message": "Gone"}))]).await;
            let client = server.client(fast_retry(3));

            let issue = client.find_migration_issue("acme", "widgets").await.unwrap();
            assert!(issue.is_none(), "status {}", status);
            assert_eq!(server.requests().len(), 1, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_migration_issue_skips_pull_requests_across_pages() {
        let mut first_page: Vec<serde_json::Value> = (1..100)
            .map(|n| json!({"number": n, "title": format!("Bug {}", n)}))
            .collect();
        first_page.insert(
            0,
            json!({"number": 500, "title": "Migration Log", "pull_request": {"url": "x"}}),
        );
        assert_eq!(first_page.len(), 100);

        let server = StubServer::start(vec![
            reply(200, json!(first_page)),
            reply(200, json!([{"number": 142, "title": "GEI migration log"}])),
        ])
        .await;
        let client = server.client(fast_retry(3));

        let issue = client
            .find_migration_issue("acme", "widgets")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(issue.number, 142);
        assert_eq!(issue.title, "GEI migration log");
        assert_eq!(
            server.requests(),
            vec![
                "/repos/acme/widgets/issues?state=all&per_page=100&page=1",
                "/repos/acme/widgets/issues?state=all&per_page=100&page=2",
            ]
        );
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let server = StubServer::start(vec![
            reply(502, json!({"message": "Bad Gateway"})),
            reply(200, json!([{"name": "widgets"}])),
        ])
        .await;
        let client = server.client(fast_retry(3));

        let repos = client
            .list_repositories("acme", Page::first(10))
            .await
            .unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "widgets");
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        let server = StubServer::start(vec![
            reply(401, json!({"message": "Bad credentials"})),
            reply(200, json!([])),
        ])
        .await;
        let client = server.client(fast_retry(3));

        let err = client
            .list_repositories("acme", Page::first(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 401, .. }), "{:?}", err);
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_retries_stop_at_max_attempts() {
        let server = StubServer::start(vec![
            reply(500, json!({"message": "boom"})),
            reply(500, json!({"message": "boom"})),
            reply(200, json!([])),
        ])
        .await;
        let client = server.client(fast_retry(2));

        let err = client
            .list_repositories("acme", Page::first(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }), "{:?}", err);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_wait_does_not_use_an_attempt() {
        let server = StubServer::start(vec![
            reply(403, json!({"message": "API rate limit exceeded"}))
                .with_header("retry-after", "1")
                .with_header("x-ratelimit-remaining", "0"),
            reply(200, json!([{"name": "widgets"}])),
        ])
        .await;
        // A single attempt still survives the rate-limit wait
        let client = server.client(fast_retry(1));

        let repos = client
            .list_repositories("acme", Page::first(10))
            .await
            .unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_beyond_max_wait_fails() {
        let server = StubServer::start(vec![
            reply(429, json!({"message": "slow down"})).with_header("retry-after", "120"),
            reply(200, json!([])),
        ])
        .await;
        let client = server.client(RetryConfig {
            rate_limit_max_wait_secs: 60,
            ..fast_retry(3)
        });

        let err = client
            .list_repositories("acme", Page::first(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 429, .. }), "{:?}", err);
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_comments_request_encodes_path_and_page() {
        let server = StubServer::start(vec![reply(
            200,
            json!([{"body": "hello"}, {"body": null}]),
        )])
        .await;
        let client = server.client(fast_retry(3));

        let comments = client
            .list_issue_comments("acme", "my repo", 7, Page::first(10).next())
            .await
            .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].body, "hello");
        assert_eq!(comments[1].body, "");
        assert_eq!(
            server.requests(),
            vec!["/repos/acme/my%20repo/issues/7/comments?per_page=10&page=2"]
        );
    }
}
