//! npm registry integration
//!
//! Confirms a package exists via the registry document: `GET {base}/{name}`.

use crate::cli::Ecosystem;
use crate::registry::{DEFAULT_TIMEOUT, Existence, ExistenceChecker, RegistryProbe};
use std::time::Duration;

pub const DEFAULT_URL: &str = "https://registry.npmjs.org";

pub struct NpmChecker {
    base_url: String,
    probe: RegistryProbe,
}

impl NpmChecker {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            probe: RegistryProbe::new("npm", timeout),
        }
    }

    fn package_url(&self, name: &str) -> String {
        // Scoped packages keep the @ and encode the slash: @scope/name -> @scope%2fname
        match name.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
            Some((scope, package)) => format!(
                "{}/@{}%2f{}",
                self.base_url,
                urlencoding::encode(scope),
                urlencoding::encode(package)
            ),
            None => format!("{}/{}", self.base_url, urlencoding::encode(name)),
        }
    }
}

impl Default for NpmChecker {
    fn default() -> Self {
        Self::new(DEFAULT_URL, DEFAULT_TIMEOUT)
    }
}

impl ExistenceChecker for NpmChecker {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Node
    }

    fn exists(&self, name: &str) -> Existence {
        self.probe.check(name, &self.package_url(name))
    }

    fn reset(&self) {
        self.probe.cache().clear();
    }
}
