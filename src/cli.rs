use crate::forge::GITLAB_URL;
use clap::{ArgGroup, Parser, ValueEnum};
use serde::Serialize;
use std::fmt;

/// Scans forge repositories for dependencies missing from their public registry
#[derive(Parser, Debug)]
#[command(name = "depscout")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("auth").args(["github_token", "gitlab_token"]).multiple(false)))]
#[command(group(ArgGroup::new("mode").args(["owner", "language"]).multiple(false)))]
pub struct Cli {
    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitLab API token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub gitlab_token: Option<String>,

    /// Owner (user, organization or group) whose repositories are analyzed
    #[arg(long)]
    pub owner: Option<String>,

    /// Language to search popular repositories for
    #[arg(long)]
    pub language: Option<String>,

    /// GitLab instance URL (for self-hosted GitLab)
    #[arg(long, default_value = GITLAB_URL)]
    pub gitlab_url: String,

    /// Minimum stars for language-based search
    #[arg(long, default_value_t = 0)]
    pub min_stars: u64,

    /// Maximum stars for language-based search
    #[arg(long)]
    pub max_stars: Option<u64>,

    /// Maximum number of repositories to analyze
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Maximum concurrent workers for repository analysis
    #[arg(long, default_value_t = 5)]
    pub max_workers: usize,

    /// Also analyze manifests found in nested directories
    #[arg(long)]
    pub recursive: bool,

    /// Logging level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output_format: OutputFormat,
}

/// Which forge backend a run talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForgeKind {
    GitHub { token: String },
    GitLab { token: String, url: String },
}

/// What the run analyzes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Owner(String),
    Language(String),
}

impl Cli {
    /// Resolve the forge backend from the token flags (or their env fallbacks).
    ///
    /// When both tokens come from the environment, GitHub wins.
    pub fn forge(&self) -> Option<ForgeKind> {
        if let Some(token) = non_empty(&self.github_token) {
            return Some(ForgeKind::GitHub { token });
        }
        non_empty(&self.gitlab_token).map(|token| ForgeKind::GitLab {
            token,
            url: self.gitlab_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn mode(&self) -> Option<Mode> {
        if let Some(owner) = non_empty(&self.owner) {
            return Some(Mode::Owner(owner));
        }
        non_empty(&self.language).map(Mode::Language)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Tui,
}

impl OutputFormat {
    /// Whether the run should keep a consolidated buffer of findings
    pub fn wants_consolidated_findings(&self) -> bool {
        matches!(self, OutputFormat::Tui)
    }
}

/// Supported package ecosystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Python,
    Node,
}

impl Ecosystem {
    /// Name of the public registry backing this ecosystem
    pub fn registry_name(&self) -> &'static str {
        match self {
            Ecosystem::Python => "PyPI",
            Ecosystem::Node => "npm",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Python => write!(f, "python"),
            Ecosystem::Node => write!(f, "node"),
        }
    }
}
