//! Records passed between the forge, the parsers, the checkers and the report
//!
//! Everything here is created once and never mutated after it is handed on.

use crate::cli::Ecosystem;
use serde::Serialize;
use std::fmt;

/// Version recorded when a manifest does not pin one
pub const LATEST: &str = "latest";

/// Risk narrative attached to packages missing from their registry
pub const NOT_FOUND_RISK: &str = "high: typosquatting / dependency-confusion target";

/// A repository as returned by a forge listing or search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryDescriptor {
    /// Forge-specific identifier (`owner/name` or `group/sub/name`)
    pub id: String,
    pub url: String,
    pub stars: u64,
    #[serde(skip)]
    pub default_branch: Option<String>,
}

impl RepositoryDescriptor {
    pub fn new(id: &str, url: &str, stars: u64) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            stars,
            default_branch: None,
        }
    }

    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.default_branch = Some(branch.to_string());
        self
    }
}

/// Which manifest section declared a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyClass {
    Runtime,
    Dev,
    Peer,
    Optional,
}

impl DependencyClass {
    fn is_runtime(&self) -> bool {
        matches!(self, DependencyClass::Runtime)
    }
}

impl fmt::Display for DependencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyClass::Runtime => write!(f, "runtime"),
            DependencyClass::Dev => write!(f, "dev"),
            DependencyClass::Peer => write!(f, "peer"),
            DependencyClass::Optional => write!(f, "optional"),
        }
    }
}

/// A dependency declared by one manifest file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", skip_serializing_if = "DependencyClass::is_runtime")]
    pub class: DependencyClass,
    #[serde(skip)]
    pub ecosystem: Ecosystem,
}

impl DependencyRecord {
    pub fn new(ecosystem: Ecosystem, name: &str, version: Option<&str>) -> Self {
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(LATEST);
        Self {
            name: name.to_string(),
            version: version.to_string(),
            class: DependencyClass::Runtime,
            ecosystem,
        }
    }

    pub fn with_class(mut self, class: DependencyClass) -> Self {
        self.class = class;
        self
    }
}

/// Why a dependency was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Issue {
    #[serde(rename = "not found in registry")]
    NotFoundInRegistry,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::NotFoundInRegistry => write!(f, "not found in registry"),
        }
    }
}

/// A dependency that failed its registry existence check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspiciousFinding {
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
    #[serde(rename = "type")]
    pub class: DependencyClass,
    pub issue: Issue,
    pub risk: String,
    pub repository: String,
}

impl SuspiciousFinding {
    /// Finding for a dependency its registry reported as absent
    pub fn not_found(dep: &DependencyRecord, repository: &str) -> Self {
        Self {
            name: dep.name.clone(),
            version: dep.version.clone(),
            ecosystem: dep.ecosystem,
            class: dep.class,
            issue: Issue::NotFoundInRegistry,
            risk: NOT_FOUND_RISK.to_string(),
            repository: repository.to_string(),
        }
    }
}

/// Everything learned about one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryResult {
    pub repository: String,
    pub url: String,
    pub stars: u64,
    pub python_dependencies: Vec<DependencyRecord>,
    pub node_dependencies: Vec<DependencyRecord>,
    pub suspicious_packages: Vec<SuspiciousFinding>,
}

impl RepositoryResult {
    pub fn empty(repo: &RepositoryDescriptor) -> Self {
        Self {
            repository: repo.id.clone(),
            url: repo.url.clone(),
            stars: repo.stars,
            python_dependencies: Vec::new(),
            node_dependencies: Vec::new(),
            suspicious_packages: Vec::new(),
        }
    }

    /// Dependency list for an ecosystem
    pub fn dependencies_mut(&mut self, ecosystem: Ecosystem) -> &mut Vec<DependencyRecord> {
        match ecosystem {
            Ecosystem::Python => &mut self.python_dependencies,
            Ecosystem::Node => &mut self.node_dependencies,
        }
    }
}
