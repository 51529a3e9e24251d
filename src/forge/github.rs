//! GitHub REST API backend

use super::{
    ClientOptions, ForgeClient, ForgeError, PER_PAGE, SearchQuery, encode_path, matches_any,
    paginate,
};
use crate::http::{self, Attempt, Response, USER_AGENT};
use crate::model::RepositoryDescriptor;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use ureq::Agent;
use ureq::http::HeaderMap;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub struct GitHubClient {
    token: String,
    agent: Agent,
    options: ClientOptions,
}

#[derive(Deserialize)]
struct Repo {
    full_name: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    stargazers_count: u64,
    default_branch: Option<String>,
}

impl From<Repo> for RepositoryDescriptor {
    fn from(repo: Repo) -> Self {
        RepositoryDescriptor {
            id: repo.full_name,
            url: repo.html_url,
            stars: repo.stargazers_count,
            default_branch: repo.default_branch,
        }
    }
}

#[derive(Deserialize)]
struct SearchResults {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Deserialize)]
struct Contents {
    encoding: Option<String>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct Tree {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

impl GitHubClient {
    pub fn new(token: &str, options: ClientOptions) -> Self {
        Self {
            token: token.to_string(),
            agent: http::agent(options.timeout),
            options,
        }
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, ForgeError> {
        let clock = self.options.clock.as_ref();
        http::with_backoff(clock, self.options.rate_limit, url, || {
            let mut request = self
                .agent
                .get(url)
                .header("Authorization", format!("token {}", self.token))
                .header("Accept", "application/vnd.github.v3+json")
                .header("User-Agent", USER_AGENT);
            for (key, value) in query {
                request = request.query(*key, *value);
            }

            let response = request.call().map_err(|e| ForgeError::transport(url, e))?;
            let status = response.status().as_u16();
            match rate_limit_wait(status, response.headers(), clock.now()) {
                Some(wait) => Ok(Attempt::Throttled(wait)),
                None => Ok(Attempt::Done(response)),
            }
        })
    }

    fn list_pages(
        &self,
        url: &str,
        query: &[(&str, &str)],
        limit: usize,
        parse: impl FnMut(&str, &str) -> Result<Vec<RepositoryDescriptor>, ForgeError>,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        let first = self.get(url, query)?;
        paginate(first, url, limit, usize::MAX, |next| self.get(next, &[]), parse)
    }

    fn default_branch(&self, repo: &RepositoryDescriptor) -> Result<String, ForgeError> {
        if let Some(branch) = &repo.default_branch {
            return Ok(branch.clone());
        }

        let url = format!("{}/repos/{}", self.options.api_url, repo.id);
        let response = self.get(&url, &[])?;
        if !response.status().is_success() {
            return Err(ForgeError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        let body = http::read_body(response).map_err(|e| ForgeError::transport(&url, e))?;
        let info: Repo = serde_json::from_str(&body).map_err(|e| ForgeError::decode(&url, e))?;
        Ok(info.default_branch.unwrap_or_else(|| "main".to_string()))
    }

    /// Fetch the recursive tree for `branch`; `None` when the branch doesn't exist
    fn tree(&self, repo: &RepositoryDescriptor, branch: &str) -> Result<Option<Tree>, ForgeError> {
        let url = format!(
            "{}/repos/{}/git/trees/{}",
            self.options.api_url,
            repo.id,
            encode_path(branch)
        );
        let response = self.get(&url, &[("recursive", "1")])?;
        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ForgeError::Status { url, status });
        }
        let body = http::read_body(response).map_err(|e| ForgeError::transport(&url, e))?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ForgeError::decode(&url, e))
    }
}

impl ForgeClient for GitHubClient {
    fn name(&self) -> &'static str {
        "GitHub"
    }

    fn list_repositories(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        let url = format!("{}/users/{}/repos", self.options.api_url, owner);
        self.list_pages(&url, &[("per_page", PER_PAGE)], limit, |page_url, body| {
            let repos: Vec<Repo> =
                serde_json::from_str(body).map_err(|e| ForgeError::decode(page_url, e))?;
            Ok(repos.into_iter().map(RepositoryDescriptor::from).collect())
        })
    }

    fn search_repositories(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        let url = format!("{}/search/repositories", self.options.api_url);
        let q = search_expression(query);
        let params = [
            ("q", q.as_str()),
            ("sort", "stars"),
            ("order", "desc"),
            ("per_page", PER_PAGE),
        ];
        self.list_pages(&url, &params, limit, |page_url, body| {
            let results: SearchResults =
                serde_json::from_str(body).map_err(|e| ForgeError::decode(page_url, e))?;
            Ok(results
                .items
                .into_iter()
                .map(RepositoryDescriptor::from)
                .filter(|repo| query.stars_in_range(repo.stars))
                .collect())
        })
    }

    fn fetch_file(
        &self,
        repo: &RepositoryDescriptor,
        path: &str,
    ) -> Result<Option<String>, ForgeError> {
        let url = format!(
            "{}/repos/{}/contents/{}",
            self.options.api_url,
            repo.id,
            encode_path(path)
        );
        let response = self.get(&url, &[])?;
        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ForgeError::Status { url, status });
        }

        let body = http::read_body(response).map_err(|e| ForgeError::transport(&url, e))?;
        let contents: Contents = match serde_json::from_str(&body) {
            Ok(contents) => contents,
            Err(e) => {
                // A directory listing comes back as an array
                debug!("{} in {} is not a file: {}", path, repo.id, e);
                return Ok(None);
            }
        };

        if contents.encoding.as_deref() != Some("base64") {
            return Ok(None);
        }
        Ok(contents
            .content
            .as_deref()
            .and_then(|encoded| decode_content(encoded, path, &repo.id)))
    }

    fn list_files(
        &self,
        repo: &RepositoryDescriptor,
        patterns: &[Regex],
    ) -> Result<Vec<String>, ForgeError> {
        let branch = self.default_branch(repo)?;
        let tree = match self.tree(repo, &branch)? {
            Some(tree) => tree,
            None if branch != "master" => match self.tree(repo, "master")? {
                Some(tree) => tree,
                None => return Ok(Vec::new()),
            },
            None => return Ok(Vec::new()),
        };

        if tree.truncated {
            warn!(
                "Repository tree is truncated for {}. Some files might be missed.",
                repo.id
            );
        }

        Ok(tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob" && matches_any(&entry.path, patterns))
            .map(|entry| entry.path)
            .collect())
    }
}

/// Build the `q` parameter for a language search with a star range
fn search_expression(query: &SearchQuery) -> String {
    let mut q = format!("language:{} stars:>={}", query.language, query.min_stars);
    if let Some(max) = query.max_stars {
        q.push_str(&format!(" stars:<={}", max));
    }
    q
}

/// Decode a base64 `contents` payload; GitHub wraps it at 60 columns
fn decode_content(encoded: &str, path: &str, repo: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = match STANDARD.decode(compact) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Error decoding file {} from {}: {}", path, repo, e);
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(_) => {
            warn!("File {} from {} is not valid UTF-8", path, repo);
            None
        }
    }
}

/// How long to wait before retrying, if the response is a rate-limit signal.
///
/// Primary limit: 403 with `x-ratelimit-remaining: 0`, wait until
/// `x-ratelimit-reset` (at least one second). Secondary limit: 429 with
/// `retry-after`.
fn rate_limit_wait(status: u16, headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    if status == 403 && http::header(headers, "x-ratelimit-remaining") == Some("0") {
        let reset = http::header(headers, "x-ratelimit-reset")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let now = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        return Some(Duration::from_secs(reset.saturating_sub(now).max(1)));
    }

    if status == 429 {
        let wait = http::header(headers, "retry-after")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        return Some(Duration::from_secs(wait));
    }

    None
}
