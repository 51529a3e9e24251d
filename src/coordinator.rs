//! Run-level orchestration
//!
//! Handles:
//! - Repository discovery by owner or by language search
//! - A bounded pool of workers pulling repositories from a shared cursor
//! - Per-repository failure isolation (errors and panics)
//! - Collecting results in completion order, plus the consolidated findings list

use crate::analyzer::{AnalysisError, RepositoryAnalyzer};
use crate::forge::{ForgeClient, SearchQuery};
use crate::model::{RepositoryDescriptor, RepositoryResult, SuspiciousFinding};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Everything one run produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Per-repository results in completion order
    pub results: Vec<RepositoryResult>,
    /// Every finding of the run; only filled when consolidation is on
    pub findings: Vec<SuspiciousFinding>,
}

impl RunReport {
    pub fn finding_count(&self) -> usize {
        self.results
            .iter()
            .map(|r| r.suspicious_packages.len())
            .sum()
    }
}

pub struct AnalysisCoordinator {
    forge: Arc<dyn ForgeClient>,
    analyzer: RepositoryAnalyzer,
    max_workers: usize,
    consolidate: bool,
}

impl AnalysisCoordinator {
    pub fn new(forge: Arc<dyn ForgeClient>, analyzer: RepositoryAnalyzer) -> Self {
        Self {
            forge,
            analyzer,
            max_workers: DEFAULT_MAX_WORKERS,
            consolidate: false,
        }
    }

    /// Values below one are treated as one
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Also gather every finding into `RunReport::findings`
    pub fn with_consolidated_findings(mut self, consolidate: bool) -> Self {
        self.consolidate = consolidate;
        self
    }

    /// Clear registry caches between runs
    pub fn reset(&self) {
        self.analyzer.reset();
    }

    pub fn analyze_owner(&self, owner: &str, limit: usize) -> RunReport {
        info!("Fetching repositories for {} from {}", owner, self.forge.name());
        match self.forge.list_repositories(owner, limit) {
            Ok(repos) => self.process(repos),
            Err(e) => {
                error!("Error listing repositories for {}: {}", owner, e);
                RunReport::default()
            }
        }
    }

    pub fn analyze_language(&self, query: &SearchQuery, limit: usize) -> RunReport {
        info!(
            "Searching {} for {} repositories ({} stars and up)",
            self.forge.name(),
            query.language,
            query.min_stars
        );
        match self.forge.search_repositories(query, limit) {
            Ok(repos) => self.process(repos),
            Err(e) => {
                error!("Error searching {} repositories: {}", query.language, e);
                RunReport::default()
            }
        }
    }

    /// Analyze `repos` with at most `max_workers` running at once
    pub fn process(&self, repos: Vec<RepositoryDescriptor>) -> RunReport {
        let mut report = RunReport::default();
        if repos.is_empty() {
            warn!("No repositories found to analyze");
            return report;
        }
        info!("Found {} repositories to analyze", repos.len());

        let workers = self.max_workers.min(repos.len());
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let repos = &repos;
                let analyzer = &self.analyzer;
                scope.spawn(move || {
                    while let Some(repo) = repos.get(cursor.fetch_add(1, Ordering::SeqCst)) {
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(repo)));
                        if tx.send((repo, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for (repo, outcome) in rx {
                self.collect(&mut report, repo, outcome);
            }
        });

        info!(
            "Analyzed {} of {} repositories, {} suspicious packages",
            report.results.len(),
            repos.len(),
            report.finding_count()
        );
        report
    }

    fn collect(
        &self,
        report: &mut RunReport,
        repo: &RepositoryDescriptor,
        outcome: thread::Result<Result<RepositoryResult, AnalysisError>>,
    ) {
        match outcome {
            Ok(Ok(result)) => {
                info!("Completed analysis of {}", repo.id);
                if self.consolidate {
                    report
                        .findings
                        .extend(result.suspicious_packages.iter().cloned());
                }
                report.results.push(result);
            }
            Ok(Err(e)) => error!("Error analyzing repository {}: {}", repo.id, e),
            Err(payload) => error!(
                "Analysis of {} panicked: {}",
                repo.id,
                panic_message(payload.as_ref())
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
