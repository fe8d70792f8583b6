//! Integration tests for codecell
//!
//! These tests require the isolate binary to be installed and accessible.
//! Run with: cargo test -p codecell --features integration-tests
//!
//! Tests that require root are marked `#[ignore]`. To include them:
//!    cargo test -p codecell --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use codecell::{Config, Orchestrator};

mod compilation;
mod execution;
mod lifecycle;
mod timeout;

/// Create a test config with cgroup support if available, falling back to
/// non-cgroup mode.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    if config.cgroup {
        match codecell::prepare_cgroup(&config.cg_root) {
            Ok(true) => {}              // cgroups ready
            _ => config.cgroup = false, // not available, fall back
        }
    }
    config
}

pub(crate) fn test_orchestrator() -> Orchestrator {
    Orchestrator::new(test_config())
}
