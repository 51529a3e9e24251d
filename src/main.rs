use clap::Parser;
use depscout::analyzer::{EcosystemScanner, RepositoryAnalyzer};
use depscout::cli::{Cli, ForgeKind, Mode, OutputFormat};
use depscout::config::Config;
use depscout::coordinator::{AnalysisCoordinator, RunReport};
use depscout::forge::{ClientOptions, ForgeClient, GitHubClient, GitLabClient, SearchQuery};
use depscout::node::{NodeManifestParser, NpmChecker};
use depscout::python::{PyPiChecker, PythonManifestParser};
use depscout::{logging, output};
use std::sync::Arc;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let forge_kind = cli.forge().ok_or(
        "Either --github-token or --gitlab-token must be provided \
         (or set GITHUB_TOKEN / GITLAB_TOKEN)",
    )?;
    let mode = cli
        .mode()
        .ok_or("Either --owner or --language must be specified")?;
    let config = Config::load()?;

    let forge = build_forge(&forge_kind, &config);
    let analyzer = build_analyzer(forge.clone(), &config).with_recursive(cli.recursive);
    let coordinator = AnalysisCoordinator::new(forge, analyzer)
        .with_max_workers(cli.max_workers)
        .with_consolidated_findings(cli.output_format.wants_consolidated_findings());

    let report = match mode {
        Mode::Owner(owner) => coordinator.analyze_owner(&owner, cli.limit),
        Mode::Language(language) => {
            let query = SearchQuery::new(&language, cli.min_stars, cli.max_stars);
            coordinator.analyze_language(&query, cli.limit)
        }
    };

    render(&report, cli.output_format);
    Ok(())
}

fn build_forge(kind: &ForgeKind, config: &Config) -> Arc<dyn ForgeClient> {
    match kind {
        ForgeKind::GitHub { token } => {
            let options = client_options(&config.github_api_url, config);
            Arc::new(GitHubClient::new(token, options))
        }
        ForgeKind::GitLab { token, url } => {
            let options = client_options(url, config);
            Arc::new(GitLabClient::new(token, options))
        }
    }
}

fn client_options(api_url: &str, config: &Config) -> ClientOptions {
    ClientOptions::new(api_url)
        .with_timeout(config.forge_timeout())
        .with_rate_limit(config.rate_limit_policy())
}

/// Python is always scanned before Node
fn build_analyzer(forge: Arc<dyn ForgeClient>, config: &Config) -> RepositoryAnalyzer {
    let timeout = config.registry_timeout();
    RepositoryAnalyzer::new(forge)
        .with_scanner(EcosystemScanner::new(
            Box::new(PythonManifestParser),
            Arc::new(PyPiChecker::new(&config.pypi_url, timeout)),
        ))
        .with_scanner(EcosystemScanner::new(
            Box::new(NodeManifestParser),
            Arc::new(NpmChecker::new(&config.npm_url, timeout)),
        ))
}

fn render(report: &RunReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(&report.results),
        OutputFormat::Text => print!("{}", output::format_text(&report.results)),
        OutputFormat::Tui => print!("{}", output::format_consolidated(report)),
    }
}
