//! Manifest parsing for Node.js projects
//!
//! Extracts the four dependency sections of package.json, tagging each record
//! with the section it came from.

use crate::cli::Ecosystem;
use crate::manifest::ManifestParser;
use crate::model::{DependencyClass, DependencyRecord};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

const MANIFEST_NAMES: [&str; 1] = ["package.json"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    dependencies: Option<Map<String, Value>>,
    dev_dependencies: Option<Map<String, Value>>,
    peer_dependencies: Option<Map<String, Value>>,
    optional_dependencies: Option<Map<String, Value>>,
}

#[derive(Debug, Default)]
pub struct NodeManifestParser;

impl ManifestParser for NodeManifestParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Node
    }

    fn manifest_names(&self) -> &'static [&'static str] {
        &MANIFEST_NAMES
    }

    fn extract(&self, content: &str, path_hint: &str) -> Vec<DependencyRecord> {
        let manifest: PackageJson = match serde_json::from_str(content) {
            Ok(manifest) => manifest,
            Err(e) => {
                let path = if path_hint.is_empty() { "package.json" } else { path_hint };
                warn!("Error parsing {}: {}", path, e);
                return Vec::new();
            }
        };

        let sections = [
            (manifest.dependencies, DependencyClass::Runtime),
            (manifest.dev_dependencies, DependencyClass::Dev),
            (manifest.peer_dependencies, DependencyClass::Peer),
            (manifest.optional_dependencies, DependencyClass::Optional),
        ];

        let mut deps = Vec::new();
        for (section, class) in sections {
            let Some(map) = section else {
                continue;
            };
            for (name, version) in &map {
                deps.push(
                    DependencyRecord::new(Ecosystem::Node, name, version.as_str())
                        .with_class(class),
                );
            }
        }
        deps
    }
}
