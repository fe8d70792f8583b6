//! Compilation phase
//!
//! Compilers run inside the same sandbox as the program they build, under
//! their own resource limits. A failing compile is a normal outcome: its
//! diagnostics become the job's stderr and no execution phase runs.

use tracing::{debug, instrument};

use crate::config::language::DEFAULT_SANDBOX_PATH;
use crate::config::{CompileConfig, Config, Language};
use crate::isolate::{
    self, ExecutionStatus, IsolateBox, IsolateCommand, IsolateError, SandboxOutcome,
};
use crate::types::ResourceLimits;

/// Outcome of one compilation.
#[derive(Debug)]
pub struct CompileResult {
    /// Whether the compiler exited cleanly
    pub success: bool,

    /// Raw sandbox outcome of the compiler process
    pub outcome: SandboxOutcome,

    /// Combined compiler stdout and stderr
    pub diagnostics: String,
}

/// Baseline limits for compilers.
///
/// Compilers are trusted more than submitted programs but still bounded;
/// javac in particular forks and needs headroom over the run-phase
/// defaults.
fn default_compile_limits() -> ResourceLimits {
    ResourceLimits::new()
        .with_time_limit(30.0)
        .with_wall_time_limit(60.0)
        .with_memory_limit(512 * ResourceLimits::MB)
        .with_max_processes(16)
}

/// Run the compilation phase for a compiled language.
///
/// The source file must already be in the box under the language's
/// source name.
#[instrument(skip_all, fields(box_id = sandbox.id(), language = %language.name))]
pub async fn compile(
    sandbox: &IsolateBox,
    config: &Config,
    language: &Language,
    compile_cfg: &CompileConfig,
) -> Result<CompileResult, IsolateError> {
    let mut command = Language::expand_command(
        &compile_cfg.command,
        &compile_cfg.source_name,
        &compile_cfg.output_name,
    );
    isolate::resolve_command(&mut command)?;

    isolate::validate_mounts(&config.sandbox_mounts)?;

    let limits = match &compile_cfg.limits {
        Some(overrides) => default_compile_limits().with_overrides(overrides),
        None => default_compile_limits(),
    };

    let mut builder = IsolateCommand::new(config.isolate_binary(), sandbox.id())
        .limits(limits)
        .mounts(config.sandbox_mounts.iter().cloned())
        .cgroup(sandbox.cgroup())
        .env("PATH", DEFAULT_SANDBOX_PATH)
        .env("HOME", "/box")
        .working_dir("/box")
        .command(command);
    for (key, value) in &compile_cfg.env {
        builder = builder.env(key, value);
    }

    let (outcome, mut diagnostics) = isolate::run_with_output(sandbox, builder).await?;

    let success = outcome.status == ExecutionStatus::Ok && outcome.exit_code_or_signal() == 0;

    // Surface isolate's own message when the compiler produced no output
    // (a compiler killed at a limit says nothing on stderr)
    if !success
        && diagnostics.is_empty()
        && let Some(ref message) = outcome.message
    {
        diagnostics = message.clone();
    }

    debug!(success, status = ?outcome.status, "compilation finished");

    Ok(CompileResult {
        success,
        outcome,
        diagnostics,
    })
}
