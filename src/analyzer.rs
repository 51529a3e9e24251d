//! Per-repository analysis: fetch manifests, parse them, check every dependency

use crate::cli::Ecosystem;
use crate::forge::{ForgeClient, ForgeError};
use crate::http::RateLimitExhausted;
use crate::manifest::{ManifestParser, nested_pattern};
use crate::model::{RepositoryDescriptor, RepositoryResult, SuspiciousFinding};
use crate::registry::{Existence, ExistenceChecker};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Rate limit exhausted while analyzing {repository}: {source}")]
    RateLimited {
        repository: String,
        source: RateLimitExhausted,
    },
}

/// A manifest parser paired with the registry its dependencies are checked against
pub struct EcosystemScanner {
    parser: Box<dyn ManifestParser>,
    checker: Arc<dyn ExistenceChecker>,
}

impl EcosystemScanner {
    pub fn new(parser: Box<dyn ManifestParser>, checker: Arc<dyn ExistenceChecker>) -> Self {
        Self { parser, checker }
    }

    fn ecosystem(&self) -> Ecosystem {
        self.parser.ecosystem()
    }
}

pub struct RepositoryAnalyzer {
    forge: Arc<dyn ForgeClient>,
    scanners: Vec<EcosystemScanner>,
    recursive: bool,
}

impl RepositoryAnalyzer {
    pub fn new(forge: Arc<dyn ForgeClient>) -> Self {
        Self {
            forge,
            scanners: Vec::new(),
            recursive: false,
        }
    }

    /// Scanners run in the order they are added
    pub fn with_scanner(mut self, scanner: EcosystemScanner) -> Self {
        self.scanners.push(scanner);
        self
    }

    /// Also analyze manifests in nested directories
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Clear every checker's existence cache
    pub fn reset(&self) {
        for scanner in &self.scanners {
            scanner.checker.reset();
        }
    }

    pub fn analyze(&self, repo: &RepositoryDescriptor) -> Result<RepositoryResult, AnalysisError> {
        info!("Analyzing repository: {}", repo.id);
        let mut result = RepositoryResult::empty(repo);

        for scanner in &self.scanners {
            for path in scanner.parser.manifest_names() {
                self.scan_manifest(repo, scanner, path, &mut result)?;
            }
        }

        if self.recursive {
            for (scanner, path) in self.nested_manifests(repo)? {
                self.scan_manifest(repo, scanner, &path, &mut result)?;
            }
        }

        Ok(result)
    }

    fn scan_manifest(
        &self,
        repo: &RepositoryDescriptor,
        scanner: &EcosystemScanner,
        path: &str,
        result: &mut RepositoryResult,
    ) -> Result<(), AnalysisError> {
        let content = match self.forge.fetch_file(repo, path) {
            Ok(Some(content)) if !content.is_empty() => content,
            Ok(_) => return Ok(()),
            Err(e) => return skip_or_abort(repo, path, e),
        };

        let ecosystem = scanner.ecosystem();
        info!("Found {} dependency file: {} in {}", ecosystem, path, repo.id);
        let deps = scanner.parser.extract(&content, path);

        for dep in &deps {
            match scanner.checker.exists(&dep.name) {
                Existence::Present => {}
                Existence::Absent => {
                    warn!(
                        "Suspicious {} package found: {} in {}",
                        ecosystem, dep.name, repo.id
                    );
                    result
                        .suspicious_packages
                        .push(SuspiciousFinding::not_found(dep, &repo.id));
                }
                Existence::Indeterminate => {
                    debug!(
                        "Could not determine whether {} exists in {}",
                        dep.name,
                        ecosystem.registry_name()
                    );
                }
            }
        }

        result.dependencies_mut(ecosystem).extend(deps);
        Ok(())
    }

    /// Manifests below the repository root, grouped by scanner order then path
    fn nested_manifests(
        &self,
        repo: &RepositoryDescriptor,
    ) -> Result<Vec<(&EcosystemScanner, String)>, AnalysisError> {
        let patterns: Vec<_> = self
            .scanners
            .iter()
            .flat_map(|s| s.parser.manifest_names().iter())
            .map(|name| nested_pattern(name))
            .collect();

        let mut paths = match self.forge.list_files(repo, &patterns) {
            Ok(paths) => paths,
            Err(ForgeError::RateLimitExhausted(source)) => {
                return Err(AnalysisError::RateLimited {
                    repository: repo.id.clone(),
                    source,
                });
            }
            Err(e) => {
                warn!("Error listing files in {}: {}", repo.id, e);
                return Ok(Vec::new());
            }
        };
        paths.retain(|p| p.contains('/'));
        paths.sort();

        let mut nested = Vec::new();
        for scanner in &self.scanners {
            for path in &paths {
                let file_name = path.rsplit('/').next().unwrap_or(path);
                if scanner.parser.manifest_names().iter().any(|name| *name == file_name) {
                    nested.push((scanner, path.clone()));
                }
            }
        }
        Ok(nested)
    }
}

/// Routine fetch failures skip the manifest; an exhausted rate limit ends the analysis
fn skip_or_abort(
    repo: &RepositoryDescriptor,
    path: &str,
    err: ForgeError,
) -> Result<(), AnalysisError> {
    match err {
        ForgeError::RateLimitExhausted(source) => Err(AnalysisError::RateLimited {
            repository: repo.id.clone(),
            source,
        }),
        other => {
            warn!("Error fetching file {} from {}: {}", path, repo.id, other);
            Ok(())
        }
    }
}
