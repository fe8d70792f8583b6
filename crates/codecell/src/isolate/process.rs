//! Sandbox process invocation
//!
//! Runs commands inside an isolate box with file-based batch I/O and
//! reads the results back out.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::isolate::IsolateError;
use crate::isolate::box_manager::IsolateBox;
use crate::isolate::command::IsolateCommand;
use crate::isolate::meta::{MetaFile, SandboxOutcome};

/// Run an isolate command to completion and parse the meta file.
///
/// `kill_on_drop` is set so that when the caller's future is dropped (the
/// orchestrator's backstop timeout, or a disconnected client), the isolate
/// process and the sandboxed program under it are killed rather than
/// orphaned.
async fn run_isolate_command(
    args: Vec<String>,
    meta_path: &Path,
) -> Result<MetaFile, IsolateError> {
    let program = args
        .first()
        .ok_or_else(|| IsolateError::CommandFailed("empty command arguments".to_owned()))?;

    let output = Command::new(program)
        .args(&args[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(IsolateError::SpawnFailed)?;

    if meta_path.exists() {
        MetaFile::load(meta_path).await
    } else {
        // No meta file means isolate itself failed before running anything
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(IsolateError::CommandFailed(stderr.to_string()))
    }
}

/// Run a program in an isolate box with batch I/O.
///
/// Stdin is provided once through a file in the box; stdout and stderr are
/// captured to box files and read back after the process exits.
#[instrument(skip(sandbox, stdin_data))]
pub async fn run_batch(
    sandbox: &IsolateBox,
    command: IsolateCommand,
    stdin_data: Option<&[u8]>,
) -> Result<SandboxOutcome, IsolateError> {
    let meta_path = sandbox.file_path("meta.txt")?;

    // Isolate cannot read from /dev/null when --stdin is given, so the
    // stdin file always exists, empty if no input was supplied.
    sandbox
        .write_file("stdin.txt", stdin_data.unwrap_or_default())
        .await?;

    let command = command
        .meta_file(&meta_path)
        .stdin(sandbox.sandbox_path("stdin.txt")?)
        .stdout(sandbox.sandbox_path("stdout.txt")?)
        .stderr(sandbox.sandbox_path("stderr.txt")?);

    let args = command.build();
    debug!(?args, "running isolate command");

    let meta = run_isolate_command(args, &meta_path).await?;

    let mut outcome = meta.to_outcome();
    outcome.stdout = sandbox.read_file_or_empty("stdout.txt").await?;
    outcome.stderr = sandbox.read_file_or_empty("stderr.txt").await?;

    debug!(
        status = ?outcome.status,
        time = outcome.time,
        memory = outcome.memory,
        exit_code = ?outcome.exit_code,
        "execution complete"
    );

    Ok(outcome)
}

/// Run a compiler in an isolate box, combining its stdout and stderr into
/// one diagnostic string.
#[instrument(skip(sandbox))]
pub async fn run_with_output(
    sandbox: &IsolateBox,
    command: IsolateCommand,
) -> Result<(SandboxOutcome, String), IsolateError> {
    let meta_path = sandbox.file_path("compile_meta.txt")?;

    sandbox.write_file("compile_stdin.txt", b"").await?;

    let command = command
        .meta_file(&meta_path)
        .stdin(sandbox.sandbox_path("compile_stdin.txt")?)
        .stdout(sandbox.sandbox_path("compile_stdout.txt")?)
        .stderr(sandbox.sandbox_path("compile_stderr.txt")?);

    let args = command.build();
    debug!(?args, "running compile command");

    let meta = run_isolate_command(args, &meta_path).await?;
    let outcome = meta.to_outcome();

    let stdout = sandbox.read_file_or_empty("compile_stdout.txt").await?;
    let stderr = sandbox.read_file_or_empty("compile_stderr.txt").await?;

    let mut diagnostics = String::from_utf8_lossy(&stdout).into_owned();
    let stderr = String::from_utf8_lossy(&stderr);
    if !diagnostics.is_empty() && !stderr.is_empty() {
        diagnostics.push('\n');
    }
    diagnostics.push_str(&stderr);

    Ok((outcome, diagnostics))
}

/// Read back whatever partial output a killed run left in the box.
///
/// Used when the orchestrator's backstop timeout fires before isolate
/// reports a result; errors are swallowed because the box may be in any
/// state at that point.
pub(crate) async fn salvage_output(sandbox: &IsolateBox) -> (Vec<u8>, Vec<u8>) {
    let stdout = sandbox
        .read_file_or_empty("stdout.txt")
        .await
        .unwrap_or_default();
    let stderr = sandbox
        .read_file_or_empty("stderr.txt")
        .await
        .unwrap_or_default();
    (stdout, stderr)
}
