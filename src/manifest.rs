//! Manifest parsing shared across ecosystems
//!
//! A parser turns the raw text of one manifest file into dependency records.
//! Parsers never fail: malformed input is logged and yields no records, so a
//! broken manifest cannot abort a repository's analysis.

use crate::cli::Ecosystem;
use crate::model::DependencyRecord;
use regex::Regex;
use std::sync::LazyLock;

pub trait ManifestParser: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    /// Root-level manifest file names, in the order they are analyzed
    fn manifest_names(&self) -> &'static [&'static str];

    /// Extract declared dependencies; `path_hint` selects the grammar
    fn extract(&self, content: &str, path_hint: &str) -> Vec<DependencyRecord>;
}

/// `name` optionally followed by a comparison operator and a version
static REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9_\-\.]+)(?:[<>=!~]+([a-zA-Z0-9_\-\.,]+))?")
        .expect("requirement pattern is valid")
});

/// Split a PEP 508-ish requirement string into name and version.
///
/// The version is whatever follows the first comparison operator up to the
/// next one, so `flask>=2.0,<3` gives `("flask", Some("2.0"))`.
pub fn parse_requirement(spec: &str) -> Option<(String, Option<String>)> {
    let caps = REQUIREMENT.captures(spec.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let version = caps
        .get(2)
        .map(|v| v.as_str().trim_end_matches(',').to_string())
        .filter(|v| !v.is_empty());
    Some((name, version))
}

/// Build a record from a requirement string, if it names a package
pub fn requirement_record(ecosystem: Ecosystem, spec: &str) -> Option<DependencyRecord> {
    let (name, version) = parse_requirement(spec)?;
    Some(DependencyRecord::new(ecosystem, &name, version.as_deref()))
}

/// Regex matching `name` as the final path component at any depth
pub fn nested_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"(^|/){}$", regex::escape(name))).expect("escaped pattern is valid")
}
