//! GitLab REST API (v4) backend

use super::{
    ClientOptions, ForgeClient, ForgeError, PER_PAGE, SearchQuery, candidate_branches,
    matches_any, paginate,
};
use crate::http::{self, Attempt, Response, USER_AGENT};
use crate::model::RepositoryDescriptor;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Agent;
use ureq::http::HeaderMap;

pub const DEFAULT_URL: &str = "https://gitlab.com";

/// Wait applied to a 429 that carries no usable `retry-after`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// GitLab search has no language facet, so results are filtered client-side.
/// This caps how many pages of the global project list a search walks.
const MAX_SEARCH_PAGES: usize = 20;

pub struct GitLabClient {
    token: String,
    agent: Agent,
    options: ClientOptions,
}

#[derive(Deserialize)]
struct Project {
    path_with_namespace: String,
    #[serde(default)]
    web_url: String,
    #[serde(default)]
    star_count: u64,
    default_branch: Option<String>,
    #[serde(default)]
    tag_list: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    description: Option<String>,
}

impl Project {
    /// Stars in range AND (a tag/topic equals the language OR the description mentions it).
    ///
    /// `language` is the GitLab tag; the term from the query is accepted too.
    fn matches(&self, query: &SearchQuery, language: &str) -> bool {
        if !query.stars_in_range(self.star_count) {
            return false;
        }
        let requested = query.language.to_lowercase();
        let terms = [language, requested.as_str()];
        let tagged = self
            .tag_list
            .iter()
            .chain(self.topics.iter())
            .any(|tag| terms.iter().any(|term| tag.eq_ignore_ascii_case(term)));
        let described = self.description.as_deref().is_some_and(|d| {
            let d = d.to_lowercase();
            terms.iter().any(|term| d.contains(term))
        });
        tagged || described
    }
}

impl From<Project> for RepositoryDescriptor {
    fn from(project: Project) -> Self {
        RepositoryDescriptor {
            id: project.path_with_namespace,
            url: project.web_url,
            stars: project.star_count,
            default_branch: project.default_branch,
        }
    }
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

impl GitLabClient {
    /// `options.api_url` is the instance root, e.g. `https://gitlab.com`
    pub fn new(token: &str, options: ClientOptions) -> Self {
        let api_url = format!("{}/api/v4", options.api_url);
        Self {
            token: token.to_string(),
            agent: http::agent(options.timeout),
            options: ClientOptions { api_url, ..options },
        }
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, ForgeError> {
        http::with_backoff(
            self.options.clock.as_ref(),
            self.options.rate_limit,
            url,
            || {
                let mut request = self
                    .agent
                    .get(url)
                    .header("PRIVATE-TOKEN", self.token.as_str())
                    .header("User-Agent", USER_AGENT);
                for (key, value) in query {
                    request = request.query(*key, *value);
                }

                let response = request.call().map_err(|e| ForgeError::transport(url, e))?;
                match rate_limit_wait(response.status().as_u16(), response.headers()) {
                    Some(wait) => Ok(Attempt::Throttled(wait)),
                    None => Ok(Attempt::Done(response)),
                }
            },
        )
    }

    fn project_url(&self, repo: &RepositoryDescriptor) -> String {
        format!("{}/projects/{}", self.options.api_url, urlencoding::encode(&repo.id))
    }

    fn parse_projects(url: &str, body: &str) -> Result<Vec<Project>, ForgeError> {
        serde_json::from_str(body).map_err(|e| ForgeError::decode(url, e))
    }
}

impl ForgeClient for GitLabClient {
    fn name(&self) -> &'static str {
        "GitLab"
    }

    fn list_repositories(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        let params = [("per_page", PER_PAGE)];
        let owner = urlencoding::encode(owner);

        let mut url = format!("{}/users/{}/projects", self.options.api_url, owner);
        let mut first = self.get(&url, &params)?;
        if !first.status().is_success() {
            debug!(
                "User lookup for {} returned HTTP {}, trying group namespace",
                owner,
                first.status().as_u16()
            );
            url = format!("{}/groups/{}/projects", self.options.api_url, owner);
            first = self.get(&url, &params)?;
        }

        paginate(
            first,
            &url,
            limit,
            usize::MAX,
            |next| self.get(next, &[]),
            |page_url, body| {
                Ok(Self::parse_projects(page_url, body)?
                    .into_iter()
                    .map(RepositoryDescriptor::from)
                    .collect())
            },
        )
    }

    fn search_repositories(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        let url = format!("{}/projects", self.options.api_url);
        let language = language_tag(&query.language);
        let params = [
            ("visibility", "public"),
            ("order_by", "star_count"),
            ("sort", "desc"),
            ("per_page", PER_PAGE),
        ];

        let first = self.get(&url, &params)?;
        paginate(
            first,
            &url,
            limit,
            MAX_SEARCH_PAGES,
            |next| self.get(next, &[]),
            |page_url, body| {
                Ok(Self::parse_projects(page_url, body)?
                    .into_iter()
                    .filter(|project| project.matches(query, &language))
                    .map(RepositoryDescriptor::from)
                    .collect())
            },
        )
    }

    fn fetch_file(
        &self,
        repo: &RepositoryDescriptor,
        path: &str,
    ) -> Result<Option<String>, ForgeError> {
        let url = format!(
            "{}/repository/files/{}/raw",
            self.project_url(repo),
            urlencoding::encode(path)
        );

        // 404 on every branch means absent; any other failure is reported
        let mut failure = None;
        for branch in candidate_branches(repo) {
            let response = self.get(&url, &[("ref", branch.as_str())])?;
            match response.status().as_u16() {
                200 => {}
                404 => continue,
                status => {
                    debug!(
                        "File {} on {} in {} returned HTTP {}",
                        path, branch, repo.id, status
                    );
                    failure = Some(status);
                    continue;
                }
            }
            return match http::read_body(response) {
                Ok(text) => Ok(Some(text)),
                Err(e) => {
                    warn!("Error reading file {} from {}: {}", path, repo.id, e);
                    Ok(None)
                }
            };
        }

        match failure {
            Some(status) => Err(ForgeError::Status { url, status }),
            None => Ok(None),
        }
    }

    fn list_files(
        &self,
        repo: &RepositoryDescriptor,
        patterns: &[Regex],
    ) -> Result<Vec<String>, ForgeError> {
        let url = format!("{}/repository/tree", self.project_url(repo));

        for branch in candidate_branches(repo) {
            let params = [
                ("recursive", "true"),
                ("per_page", PER_PAGE),
                ("ref", branch.as_str()),
            ];
            let first = self.get(&url, &params)?;
            if !first.status().is_success() {
                continue;
            }

            let matching = paginate(
                first,
                &url,
                usize::MAX,
                usize::MAX,
                |next| self.get(next, &[]),
                |page_url, body| {
                    let entries: Vec<TreeEntry> = serde_json::from_str(body)
                        .map_err(|e| ForgeError::decode(page_url, e))?;
                    Ok(entries
                        .into_iter()
                        .filter(|e| e.kind == "blob" && matches_any(&e.path, patterns))
                        .map(|e| e.path)
                        .collect())
                },
            )?;

            if !matching.is_empty() {
                return Ok(matching);
            }
        }

        Ok(Vec::new())
    }
}

/// GitLab tags projects with the language family rather than the runtime name
fn language_tag(language: &str) -> String {
    match language.to_lowercase().as_str() {
        "node" | "nodejs" => "javascript".to_string(),
        other => other.to_string(),
    }
}

fn rate_limit_wait(status: u16, headers: &HeaderMap) -> Option<Duration> {
    if status != 429 {
        return None;
    }
    Some(
        http::header(headers, "retry-after")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER),
    )
}
