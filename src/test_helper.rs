//! In-memory forge and registry doubles for analyzer and coordinator tests

use crate::cli::Ecosystem;
use crate::forge::{ForgeClient, ForgeError, SearchQuery, matches_any};
use crate::http::RateLimitExhausted;
use crate::model::RepositoryDescriptor;
use crate::registry::{Existence, ExistenceChecker};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Default)]
pub struct FakeForge {
    repos: Vec<RepositoryDescriptor>,
    files: HashMap<(String, String), String>,
    failing: HashSet<(String, String)>,
    rate_limited: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    listing_fails: bool,
}

impl FakeForge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, repo: RepositoryDescriptor) -> Self {
        self.repos.push(repo);
        self
    }

    pub fn with_file(mut self, repo: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((repo.to_string(), path.to_string()), content.to_string());
        self
    }

    pub fn with_failing_file(mut self, repo: &str, path: &str) -> Self {
        self.failing.insert((repo.to_string(), path.to_string()));
        self
    }

    pub fn with_rate_limited_repo(mut self, repo: &str) -> Self {
        self.rate_limited.insert(repo.to_string());
        self
    }

    pub fn with_panicking_repo(mut self, repo: &str) -> Self {
        self.panicking.insert(repo.to_string());
        self
    }

    /// Every fetch from `repo` sleeps first
    pub fn with_delay(mut self, repo: &str, delay: Duration) -> Self {
        self.delays.insert(repo.to_string(), delay);
        self
    }

    pub fn with_failing_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    fn listing(&self, limit: usize) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        if self.listing_fails {
            return Err(ForgeError::Status {
                url: "fake://listing".to_string(),
                status: 500,
            });
        }
        Ok(self.repos.iter().take(limit).cloned().collect())
    }
}

impl ForgeClient for FakeForge {
    fn name(&self) -> &'static str {
        "Fake"
    }

    fn list_repositories(
        &self,
        _owner: &str,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        self.listing(limit)
    }

    fn search_repositories(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<RepositoryDescriptor>, ForgeError> {
        Ok(self
            .listing(usize::MAX)?
            .into_iter()
            .filter(|r| query.stars_in_range(r.stars))
            .take(limit)
            .collect())
    }

    fn fetch_file(
        &self,
        repo: &RepositoryDescriptor,
        path: &str,
    ) -> Result<Option<String>, ForgeError> {
        if let Some(delay) = self.delays.get(&repo.id) {
            thread::sleep(*delay);
        }
        if self.panicking.contains(&repo.id) {
            panic!("fake forge blew up on {}", repo.id);
        }
        if self.rate_limited.contains(&repo.id) {
            return Err(RateLimitExhausted {
                retries: 5,
                waited: Duration::from_secs(300),
            }
            .into());
        }

        let key = (repo.id.clone(), path.to_string());
        if self.failing.contains(&key) {
            return Err(ForgeError::Status {
                url: format!("fake://{}/{}", repo.id, path),
                status: 500,
            });
        }
        Ok(self.files.get(&key).cloned())
    }

    fn list_files(
        &self,
        repo: &RepositoryDescriptor,
        patterns: &[Regex],
    ) -> Result<Vec<String>, ForgeError> {
        Ok(self
            .files
            .keys()
            .filter(|(id, path)| *id == repo.id && matches_any(path, patterns))
            .map(|(_, path)| path.clone())
            .collect())
    }
}

/// Registry double: names in `known` exist, names in `unreachable` can't be checked
pub struct FakeChecker {
    ecosystem: Ecosystem,
    known: HashSet<String>,
    unreachable: HashSet<String>,
    calls: AtomicUsize,
    resets: AtomicUsize,
}

impl FakeChecker {
    pub fn python(known: &[&str]) -> Self {
        Self::new(Ecosystem::Python, known)
    }

    pub fn node(known: &[&str]) -> Self {
        Self::new(Ecosystem::Node, known)
    }

    fn new(ecosystem: Ecosystem, known: &[&str]) -> Self {
        Self {
            ecosystem,
            known: known.iter().map(|s| s.to_string()).collect(),
            unreachable: HashSet::new(),
            calls: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    pub fn with_unreachable(mut self, names: &[&str]) -> Self {
        self.unreachable = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ExistenceChecker for FakeChecker {
    fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    fn exists(&self, name: &str) -> Existence {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.contains(name) {
            Existence::Indeterminate
        } else if self.known.contains(name) {
            Existence::Present
        } else {
            Existence::Absent
        }
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}
