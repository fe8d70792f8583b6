//! IOI Isolate wrapper
//!
//! Interface to the isolate sandbox binary: command building, box
//! lifecycle, and meta-file result parsing. Isolate provides the
//! namespace/cgroup isolation (no network, restricted filesystem view,
//! CPU/memory/process/output rlimits) that every execution runs under.
//!
//! References for isolate's CLI arguments and meta files:
//! - https://www.ucw.cz/isolate/isolate.1.html
//! - https://github.com/ioi/isolate

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::isolate::box_manager::IsolateBox;
pub use crate::isolate::command::{IsolateAction, IsolateCommand};
pub use crate::isolate::meta::{ExecutionStatus, MetaFile, SandboxOutcome};
pub use crate::isolate::process::{run_batch, run_with_output};
pub(crate) use crate::isolate::process::salvage_output;
use crate::types::MountConfig;

mod box_manager;
mod command;
mod meta;
mod process;

/// Errors from isolate sandbox operations.
///
/// These are service faults, distinct from program-level failures which
/// are reported through [`SandboxOutcome`].
#[derive(Debug, Error)]
pub enum IsolateError {
    #[error("failed to initialize box {id}: {message}")]
    InitFailed { id: u32, message: String },

    #[error("failed to cleanup box {id}: {message}")]
    CleanupFailed { id: u32, message: String },

    #[error("isolate command failed: {0}")]
    CommandFailed(String),

    #[error("failed to spawn isolate process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("mount source path does not exist: {0}")]
    MountSourceNotFound(String),
}

/// Attempt to set up the cgroup v2 hierarchy for isolate.
///
/// In container environments the systemd service that normally manages
/// isolate's cgroup (`isolate-cg-keeper`) is not available. This replicates
/// its job: creating the cgroup directory at `cg_root` and enabling the
/// memory and pids controllers so per-box child cgroups work.
///
/// Returns `Ok(true)` if cgroups are ready, `Ok(false)` if the caller
/// should fall back to RLIMIT_AS memory limiting.
pub fn prepare_cgroup(cg_root: &Path) -> Result<bool, IsolateError> {
    let cg_base = Path::new("/sys/fs/cgroup");

    let controllers_path = cg_base.join("cgroup.controllers");
    if !controllers_path.exists() {
        return Ok(false);
    }

    let controllers = fs::read_to_string(&controllers_path)?;
    if !controllers.split_whitespace().any(|c| c == "memory") {
        return Ok(false);
    }

    // Already set up from a previous run
    if cg_root.exists() {
        let subtree = cg_root.join("cgroup.subtree_control");
        if let Ok(content) = fs::read_to_string(&subtree)
            && content.split_whitespace().any(|c| c == "memory")
        {
            return Ok(true);
        }
    }

    // cgroup v2's "no internal process" rule: move ourselves into a leaf
    // cgroup before enabling controllers at the root.
    let init_cg = cg_base.join("init");
    if !init_cg.exists() {
        fs::create_dir(&init_cg)?;
    }
    fs::write(init_cg.join("cgroup.procs"), std::process::id().to_string())?;

    fs::write(cg_base.join("cgroup.subtree_control"), "+memory +pids")?;

    if !cg_root.exists() {
        fs::create_dir(cg_root)?;
    }

    fs::write(cg_root.join("cgroup.subtree_control"), "+memory +pids")?;

    Ok(true)
}

/// Validate that all non-optional mount source paths exist on the host.
pub fn validate_mounts(mounts: &[MountConfig]) -> Result<(), IsolateError> {
    for mount in mounts {
        if mount.optional {
            continue;
        }
        let path = Path::new(&mount.source);
        if !path.exists() {
            return Err(IsolateError::MountSourceNotFound(mount.source.clone()));
        }
    }
    Ok(())
}

/// Resolve the program in a command to an absolute path using the host's PATH.
///
/// Isolate uses `execve`, which does not search PATH, so bare command names
/// (like `g++` or `python3`) must be resolved to full paths before being
/// handed to the sandbox. Commands that already contain a `/` are left
/// unchanged.
pub fn resolve_command(command: &mut [String]) -> Result<(), IsolateError> {
    let first = match command.first_mut() {
        Some(first) => first,
        None => return Ok(()),
    };

    if first.contains('/') {
        return Ok(());
    }

    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':') {
        let candidate = PathBuf::from(dir).join(&*first);
        if candidate.exists() {
            // Canonicalize so symlinked runtimes stay reachable across the
            // sandbox's bind-mount boundaries.
            *first = std::fs::canonicalize(&candidate)
                .unwrap_or(candidate)
                .to_string_lossy()
                .into_owned();
            return Ok(());
        }
    }

    Err(IsolateError::CommandFailed(format!(
        "command '{first}' not found in PATH",
    )))
}
