//! Python ecosystem support
//!
//! Handles:
//! - Manifest parsing: requirements.txt, setup.py, pyproject.toml
//! - Package existence checks against PyPI

mod manifest;
mod pypi;

pub use manifest::PythonManifestParser;
pub use pypi::{DEFAULT_URL as PYPI_URL, PyPiChecker};
