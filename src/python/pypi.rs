//! PyPI registry integration
//!
//! Confirms a package exists via the JSON API: `GET {base}/pypi/{name}/json`.

use crate::cli::Ecosystem;
use crate::registry::{DEFAULT_TIMEOUT, Existence, ExistenceChecker, RegistryProbe};
use std::time::Duration;

pub const DEFAULT_URL: &str = "https://pypi.org";

pub struct PyPiChecker {
    base_url: String,
    probe: RegistryProbe,
}

impl PyPiChecker {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            probe: RegistryProbe::new("PyPI", timeout),
        }
    }

    fn package_url(&self, name: &str) -> String {
        format!("{}/pypi/{}/json", self.base_url, urlencoding::encode(name))
    }
}

impl Default for PyPiChecker {
    fn default() -> Self {
        Self::new(DEFAULT_URL, DEFAULT_TIMEOUT)
    }
}

impl ExistenceChecker for PyPiChecker {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn exists(&self, name: &str) -> Existence {
        self.probe.check(name, &self.package_url(name))
    }

    fn reset(&self) {
        self.probe.cache().clear();
    }
}
