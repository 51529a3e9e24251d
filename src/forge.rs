//! Forge backends (GitHub-like and GitLab-like)
//!
//! Handles:
//! - Repository listing by owner and search by language / star range
//! - Raw manifest file retrieval
//! - Repository tree listing filtered by path patterns
//! - Provider-specific rate-limit detection with bounded backoff

mod github;
mod gitlab;

pub use github::{DEFAULT_API_URL as GITHUB_API_URL, GitHubClient};
pub use gitlab::{DEFAULT_URL as GITLAB_URL, GitLabClient};

use crate::http::{self, Clock, RateLimitExhausted, RateLimitPolicy, Response, SystemClock};
use crate::model::RepositoryDescriptor;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Page size requested from list/search endpoints
pub(crate) const PER_PAGE: &str = "100";

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {details}")]
    Decode { url: String, details: String },

    #[error(transparent)]
    RateLimitExhausted(#[from] RateLimitExhausted),
}

impl ForgeError {
    pub(crate) fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        ForgeError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, err: impl std::fmt::Display) -> Self {
        ForgeError::Decode {
            url: url.to_string(),
            details: err.to_string(),
        }
    }
}

/// Language search with an inclusive star range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub language: String,
    pub min_stars: u64,
    pub max_stars: Option<u64>,
}

impl SearchQuery {
    pub fn new(language: &str, min_stars: u64, max_stars: Option<u64>) -> Self {
        Self {
            language: language.to_string(),
            min_stars,
            max_stars,
        }
    }

    pub fn stars_in_range(&self, stars: u64) -> bool {
        stars >= self.min_stars && self.max_stars.is_none_or(|max| stars <= max)
    }
}

/// Operations the analyzer and coordinator need from a forge
pub trait ForgeClient: Send + Sync {
    /// Provider name used in log lines
    fn name(&self) -> &'static str;

    /// Repositories owned by a user, organization or group, at most `limit`
    fn list_repositories(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError>;

    /// Repositories for a language within the query's star range, at most `limit`
    fn search_repositories(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError>;

    /// Raw text of one file.
    ///
    /// `Ok(None)` means the file does not exist or is not text, which is the
    /// routine outcome for manifest formats a project doesn't use.
    fn fetch_file(
        &self,
        repo: &RepositoryDescriptor,
        path: &str,
    ) -> Result<Option<String>, ForgeError>;

    /// Blob paths on the default branch matching at least one pattern
    fn list_files(
        &self,
        repo: &RepositoryDescriptor,
        patterns: &[Regex],
    ) -> Result<Vec<String>, ForgeError>;
}

/// Connection settings shared by both backends
#[derive(Clone)]
pub struct ClientOptions {
    pub api_url: String,
    pub timeout: Duration,
    pub rate_limit: RateLimitPolicy,
    pub clock: Arc<dyn Clock>,
}

impl ClientOptions {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: RateLimitPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Follow `rel="next"` links from `first` until `limit` items or `max_pages` pages.
///
/// `get` performs a request for a next-page URL; `parse` turns one page body
/// into items (and may filter them).
pub(crate) fn paginate<T>(
    first: Response,
    first_url: &str,
    limit: usize,
    max_pages: usize,
    mut get: impl FnMut(&str) -> Result<Response, ForgeError>,
    mut parse: impl FnMut(&str, &str) -> Result<Vec<T>, ForgeError>,
) -> Result<Vec<T>, ForgeError> {
    let mut items = Vec::new();
    let mut response = first;
    let mut url = first_url.to_string();
    let mut pages = 0;

    loop {
        let status = response.status();
        if !status.is_success() {
            return Err(ForgeError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let next = http::next_link(response.headers());
        let body = http::read_body(response).map_err(|e| ForgeError::transport(&url, e))?;
        items.extend(parse(&url, &body)?);
        pages += 1;

        match next {
            Some(next_url) if items.len() < limit && pages < max_pages => {
                response = get(&next_url)?;
                url = next_url;
            }
            _ => break,
        }
    }

    items.truncate(limit);
    Ok(items)
}

/// True when `path` matches any of `patterns`
pub(crate) fn matches_any(path: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|p| p.is_match(path))
}

/// Percent-encode a repository path segment by segment, keeping the slashes
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Branches to try for a repository, known default first
pub(crate) fn candidate_branches(repo: &RepositoryDescriptor) -> Vec<String> {
    let mut branches = Vec::new();
    if let Some(branch) = &repo.default_branch {
        branches.push(branch.clone());
    }
    for fallback in ["main", "master"] {
        if !branches.iter().any(|b| b == fallback) {
            branches.push(fallback.to_string());
        }
    }
    branches
}
