//! depscout: find declared dependencies that don't exist in their public registry
//!
//! Scans GitHub or GitLab repositories for Python and Node manifests and
//! flags every dependency its registry (PyPI or npm) doesn't know about,
//! the classic typosquatting and dependency-confusion target.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod forge;
pub mod http;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod node;
pub mod output;
pub mod python;
pub mod registry;

#[cfg(test)]
mod test_helper;
