//! Isolate box lifecycle
//!
//! An [`IsolateBox`] is one initialized sandbox directory. It is owned by
//! exactly one job for its whole life; the orchestrator guarantees
//! `cleanup()` runs on every exit path.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::isolate::IsolateError;
use crate::isolate::command::{IsolateAction, IsolateCommand};

/// An initialized isolate sandbox.
///
/// # Cleanup
///
/// Always call [`cleanup()`](Self::cleanup) explicitly before dropping.
/// The `Drop` implementation attempts best-effort cleanup via a spawned
/// thread and logs a warning, but may not complete before process exit.
#[derive(Debug)]
pub struct IsolateBox {
    /// Box ID
    id: u32,

    /// Host path of the box directory
    box_path: PathBuf,

    /// Path to the isolate binary
    isolate_path: PathBuf,

    /// Cleared once cleanup has run
    initialized: bool,

    /// Whether cgroup support is enabled
    cgroup: bool,
}

impl IsolateBox {
    /// Initialize a new isolate box (`isolate --init`).
    #[instrument(skip(isolate_path))]
    pub async fn init(
        id: u32,
        isolate_path: impl Into<PathBuf>,
        cgroup: bool,
    ) -> Result<Self, IsolateError> {
        let isolate_path = isolate_path.into();

        let args = IsolateCommand::new(&isolate_path, id)
            .action(IsolateAction::Init)
            .cgroup(cgroup)
            .build();

        debug!(?args, "initializing isolate box");

        let output = run_isolate(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsolateError::InitFailed {
                id,
                message: stderr.to_string(),
            });
        }

        // isolate prints the box path on stdout
        let stdout = String::from_utf8_lossy(&output.stdout);
        let box_path = PathBuf::from(stdout.trim());

        if !box_path.exists() {
            return Err(IsolateError::InitFailed {
                id,
                message: format!("box path does not exist: {}", box_path.display()),
            });
        }

        debug!(?box_path, "box initialized");

        Ok(Self {
            id,
            box_path,
            isolate_path,
            initialized: true,
            cgroup,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.box_path
    }

    pub fn isolate_path(&self) -> &Path {
        &self.isolate_path
    }

    pub fn cgroup(&self) -> bool {
        self.cgroup
    }

    /// Host path of a file inside the box.
    ///
    /// Rejects path traversal.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(IsolateError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.box_path.join("box").join(name))
    }

    /// Path of a file as seen from inside the sandbox, where the box
    /// directory is mounted at `/box/`. Used for isolate's `--stdin`,
    /// `--stdout` and `--stderr` flags, which are opened inside the sandbox.
    pub fn sandbox_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(IsolateError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(PathBuf::from("/box").join(name))
    }

    /// Write a file into the box
    #[instrument(skip(self, content))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<(), IsolateError> {
        let path = self.file_path(name)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to box");
        Ok(())
    }

    /// Read a file from the box; missing files read as empty.
    #[instrument(skip(self))]
    pub async fn read_file_or_empty(&self, name: &str) -> Result<Vec<u8>, IsolateError> {
        let path = self.file_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists in the box
    pub async fn file_exists(&self, name: &str) -> Result<bool, IsolateError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    /// Tear the box down (`isolate --cleanup`).
    ///
    /// # Errors
    ///
    /// Returns an error if the isolate cleanup command fails.
    #[must_use = "cleanup errors should be handled"]
    #[instrument(skip(self))]
    pub async fn cleanup(&mut self) -> Result<(), IsolateError> {
        if !self.initialized {
            return Ok(());
        }

        let args = IsolateCommand::new(&self.isolate_path, self.id)
            .action(IsolateAction::Cleanup)
            .cgroup(self.cgroup)
            .build();

        debug!(?args, "cleaning up isolate box");

        let output = run_isolate(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(id = self.id, stderr = %stderr, "cleanup failed");
            return Err(IsolateError::CleanupFailed {
                id: self.id,
                message: stderr.to_string(),
            });
        }

        self.initialized = false;
        debug!("box cleaned up");
        Ok(())
    }

    /// Check if the box is still initialized (not yet cleaned up)
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

async fn run_isolate(args: &[String]) -> Result<std::process::Output, IsolateError> {
    let program = args
        .first()
        .ok_or_else(|| IsolateError::CommandFailed("empty command arguments".to_owned()))?;
    Command::new(program)
        .args(&args[1..])
        .output()
        .await
        .map_err(IsolateError::SpawnFailed)
}

impl Drop for IsolateBox {
    fn drop(&mut self) {
        if !self.initialized {
            return;
        }

        warn!(
            box_id = self.id,
            box_path = %self.box_path.display(),
            "IsolateBox dropped without explicit cleanup; \
             attempting best-effort cleanup via spawned thread"
        );

        let args = IsolateCommand::new(&self.isolate_path, self.id)
            .action(IsolateAction::Cleanup)
            .cgroup(self.cgroup)
            .build();
        let id = self.id;

        // May not complete before process exit
        std::thread::spawn(move || {
            let Some(program) = args.first() else {
                return;
            };
            match std::process::Command::new(program).args(&args[1..]).output() {
                Ok(output) if output.status.success() => {
                    debug!(box_id = id, "best-effort cleanup succeeded");
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!(box_id = id, stderr = %stderr, "best-effort cleanup failed");
                }
                Err(e) => {
                    warn!(box_id = id, error = %e, "best-effort cleanup spawn failed");
                }
            }
        });
    }
}
