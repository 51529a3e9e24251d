//! Registry existence checks
//!
//! A checker answers one question: is this package name registered? Answers
//! are three-valued so that a registry outage never turns into a false
//! positive. Names confirmed present are remembered in an `ExistenceCache`
//! for the lifetime of the checker.

use crate::cli::Ecosystem;
use crate::http::{self, USER_AGENT};
use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Agent;

/// Timeout for a single registry lookup
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of an existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// Registry answered 200 (or the name was already confirmed)
    Present,
    /// Registry answered with any other status
    Absent,
    /// The registry could not be reached; nothing is known
    Indeterminate,
}

pub trait ExistenceChecker: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    fn exists(&self, name: &str) -> Existence;

    /// Forget every confirmed name, for reuse across logically separate runs
    fn reset(&self);
}

/// Names confirmed present in one registry.
///
/// Keyed by name only: once a name is present, later checks for any version
/// of it are answered from here.
#[derive(Debug, Default)]
pub struct ExistenceCache {
    names: RwLock<HashSet<String>>,
}

impl ExistenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names
            .read()
            .map(|names| names.contains(name))
            .unwrap_or(false)
    }

    pub fn insert(&self, name: &str) {
        if let Ok(mut names) = self.names.write() {
            names.insert(name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.names.read().map(|names| names.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut names) = self.names.write() {
            names.clear();
        }
    }
}

/// HTTP prober shared by the registry-specific checkers
pub(crate) struct RegistryProbe {
    registry: &'static str,
    agent: Agent,
    cache: ExistenceCache,
}

impl RegistryProbe {
    pub(crate) fn new(registry: &'static str, timeout: Duration) -> Self {
        Self {
            registry,
            agent: http::agent(timeout),
            cache: ExistenceCache::new(),
        }
    }

    /// Check `name` at `url`, consulting and updating the cache
    pub(crate) fn check(&self, name: &str, url: &str) -> Existence {
        if self.cache.contains(name) {
            return Existence::Present;
        }

        let response = match self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Error checking {} for {}: {}", self.registry, name, e);
                return Existence::Indeterminate;
            }
        };

        if response.status().as_u16() == 200 {
            self.cache.insert(name);
            Existence::Present
        } else {
            debug!(
                "{} answered HTTP {} for {}",
                self.registry,
                response.status().as_u16(),
                name
            );
            Existence::Absent
        }
    }

    pub(crate) fn cache(&self) -> &ExistenceCache {
        &self.cache
    }
}
