//! Manifest parsing for Python projects
//!
//! Supports extracting declared dependencies from:
//! - requirements.txt (line-based, `package==version`)
//! - setup.py (`install_requires = [...]`)
//! - pyproject.toml (`[tool.poetry.*dependencies]`, `[project.dependencies]`,
//!   `[project.optional-dependencies]`)
//!
//! Manifest priority order: requirements.txt > setup.py > pyproject.toml

use crate::cli::Ecosystem;
use crate::manifest::{ManifestParser, requirement_record};
use crate::model::{DependencyClass, DependencyRecord};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

const MANIFEST_NAMES: [&str; 3] = ["requirements.txt", "setup.py", "pyproject.toml"];

static INSTALL_REQUIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]").expect("install_requires pattern is valid")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"](.*?)['"]"#).expect("quoted pattern is valid"));

/// Which grammar a Python manifest is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grammar {
    Requirements,
    SetupScript,
    Pyproject,
}

impl Grammar {
    /// Pick a grammar from the file name, falling back to content sniffing
    fn detect(content: &str, path_hint: &str) -> Self {
        if path_hint.ends_with("requirements.txt") {
            Grammar::Requirements
        } else if path_hint.ends_with("setup.py") {
            Grammar::SetupScript
        } else if path_hint.ends_with("pyproject.toml") {
            Grammar::Pyproject
        } else if content.contains("install_requires") {
            Grammar::SetupScript
        } else if content.contains("[tool.poetry") || content.contains("[project]") {
            Grammar::Pyproject
        } else {
            Grammar::Requirements
        }
    }
}

#[derive(Debug, Default)]
pub struct PythonManifestParser;

impl ManifestParser for PythonManifestParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn manifest_names(&self) -> &'static [&'static str] {
        &MANIFEST_NAMES
    }

    fn extract(&self, content: &str, path_hint: &str) -> Vec<DependencyRecord> {
        match Grammar::detect(content, path_hint) {
            Grammar::Requirements => parse_requirements(content),
            Grammar::SetupScript => parse_setup_py(content),
            Grammar::Pyproject => parse_pyproject(content, path_hint),
        }
    }
}

// === requirements.txt ===

/// Parse requirements.txt lines
///
/// Skips blank lines, comments, options (`-r`, `-e`, `--index-url`) and
/// direct URL references.
fn parse_requirements(content: &str) -> Vec<DependencyRecord> {
    content.lines().filter_map(parse_requirement_line).collect()
}

fn parse_requirement_line(line: &str) -> Option<DependencyRecord> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = line.split('#').next()?.trim();
    if line.starts_with('-') || line.starts_with("http") {
        return None;
    }

    requirement_record(Ecosystem::Python, line)
}

// === setup.py ===

/// Extract quoted requirement strings from the `install_requires` list
fn parse_setup_py(content: &str) -> Vec<DependencyRecord> {
    let Some(list) = INSTALL_REQUIRES.captures(content).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    QUOTED
        .captures_iter(list.as_str())
        .filter_map(|c| c.get(1))
        .filter_map(|spec| requirement_record(Ecosystem::Python, spec.as_str()))
        .collect()
}

// === pyproject.toml ===

fn parse_pyproject(content: &str, path_hint: &str) -> Vec<DependencyRecord> {
    let doc: toml::Value = match toml::from_str(content) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Error parsing {}: {}", display_path(path_hint), e);
            return Vec::new();
        }
    };

    let mut deps = Vec::new();

    if let Some(poetry) = doc.get("tool").and_then(|t| t.get("poetry")) {
        if let Some(table) = poetry.get("dependencies").and_then(|v| v.as_table()) {
            collect_poetry_table(table, DependencyClass::Runtime, &mut deps);
        }
        if let Some(table) = poetry.get("dev-dependencies").and_then(|v| v.as_table()) {
            collect_poetry_table(table, DependencyClass::Dev, &mut deps);
        }
        if let Some(groups) = poetry.get("group").and_then(|v| v.as_table()) {
            for group in groups.values() {
                if let Some(table) = group.get("dependencies").and_then(|v| v.as_table()) {
                    collect_poetry_table(table, DependencyClass::Dev, &mut deps);
                }
            }
        }
    }

    if let Some(project) = doc.get("project") {
        if let Some(arr) = project.get("dependencies").and_then(|v| v.as_array()) {
            collect_pep621_array(arr, DependencyClass::Runtime, &mut deps);
        }
        if let Some(extras) = project.get("optional-dependencies").and_then(|v| v.as_table()) {
            for arr in extras.values().filter_map(|v| v.as_array()) {
                collect_pep621_array(arr, DependencyClass::Optional, &mut deps);
            }
        }
    }

    deps
}

/// Poetry tables map names to a version string or a detail table
fn collect_poetry_table(
    table: &toml::map::Map<String, toml::Value>,
    class: DependencyClass,
    deps: &mut Vec<DependencyRecord>,
) {
    for (name, value) in table {
        if name == "python" {
            continue;
        }
        let version = match value {
            toml::Value::String(s) => Some(s.as_str()),
            toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()),
            _ => None,
        };
        deps.push(DependencyRecord::new(Ecosystem::Python, name, version).with_class(class));
    }
}

/// PEP 621 arrays hold requirement strings
fn collect_pep621_array(
    arr: &[toml::Value],
    class: DependencyClass,
    deps: &mut Vec<DependencyRecord>,
) {
    for spec in arr.iter().filter_map(|v| v.as_str()) {
        if let Some(record) = requirement_record(Ecosystem::Python, spec) {
            deps.push(record.with_class(class));
        }
    }
}

fn display_path(path_hint: &str) -> &str {
    if path_hint.is_empty() {
        "pyproject.toml"
    } else {
        path_hint
    }
}
