//! Output formatting for JSON, text and consolidated modes
//!
//! JSON is the machine-readable report. Text and the consolidated list are
//! for humans, coloured when stdout supports it.

use crate::coordinator::RunReport;
use crate::model::{RepositoryResult, SuspiciousFinding};
use colored::Colorize;
use serde::Serialize;

/// Print JSON output to stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// One block per repository: header, URL, stars, dependency counts, findings
pub fn format_text(results: &[RepositoryResult]) -> String {
    if results.is_empty() {
        return format!("{}\n", "No repositories analyzed".yellow());
    }

    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{}\n", result.repository.bold()));
        out.push_str(&format!("  URL:   {}\n", result.url));
        out.push_str(&format!("  Stars: {}\n", result.stars));
        out.push_str(&format!(
            "  Dependencies: {} python, {} node\n",
            result.python_dependencies.len(),
            result.node_dependencies.len()
        ));

        if result.suspicious_packages.is_empty() {
            out.push_str(&format!("  {}\n", "No suspicious packages".green()));
            continue;
        }

        let heading = format!("Suspicious packages ({}):", result.suspicious_packages.len());
        out.push_str(&format!("  {}\n", heading.red()));
        for finding in &result.suspicious_packages {
            out.push_str(&format!("    - {}\n", describe(finding)));
        }
    }
    out
}

/// Every finding of the run under one banner.
///
/// Falls back to the per-repository text report when nothing was found.
pub fn format_consolidated(report: &RunReport) -> String {
    if report.findings.is_empty() {
        return format_text(&report.results);
    }

    let banner = format!(
        "Suspicious packages across {} repositories: {}",
        report.results.len(),
        report.findings.len()
    );
    let mut out = format!("{}\n{}\n", banner.red().bold(), "=".repeat(banner.len()));
    for finding in &report.findings {
        out.push_str(&format!(
            "{}  {}\n    risk: {}\n",
            finding.repository.bold(),
            describe(finding),
            finding.risk
        ));
    }
    out
}

fn describe(finding: &SuspiciousFinding) -> String {
    format!(
        "{} {} ({}, {}): {}",
        finding.name.yellow(),
        finding.version,
        finding.ecosystem,
        finding.class,
        finding.issue
    )
}
