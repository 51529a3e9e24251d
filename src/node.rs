//! Node.js ecosystem support
//!
//! Handles:
//! - Manifest parsing: package.json
//! - Package existence checks against the npm registry

mod manifest;
mod npm;

pub use manifest::NodeManifestParser;
pub use npm::{DEFAULT_URL as NPM_URL, NpmChecker};
