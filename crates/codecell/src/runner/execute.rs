//! Execution phase
//!
//! Runs the prepared program inside its sandbox with batch stdin and
//! captured output. For compiled languages the compile phase must have
//! produced the artifact first; interpreted languages run straight from
//! their source file.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::isolate::{self, IsolateBox, IsolateCommand, IsolateError, SandboxOutcome};

/// Token substituted for `{binary}` in the run command: the compiler's
/// output name for compiled languages, the source file otherwise. For
/// Java this is the class name, not a file.
fn program_name(language: &Language) -> String {
    match &language.compile {
        Some(compile) => compile.output_name.clone(),
        None => language.source_name(),
    }
}

/// Run the program in the box and capture its outcome.
#[instrument(skip_all, fields(box_id = sandbox.id(), language = %language.name))]
pub async fn execute(
    sandbox: &IsolateBox,
    config: &Config,
    language: &Language,
    stdin: Option<&[u8]>,
) -> Result<SandboxOutcome, IsolateError> {
    let program = program_name(language);
    let mut command =
        Language::expand_command(&language.run.command, &language.source_name(), &program);
    isolate::resolve_command(&mut command)?;

    isolate::validate_mounts(&config.sandbox_mounts)?;
    isolate::validate_mounts(&language.run.mounts)?;

    let limits = config.effective_limits(language.run.limits.as_ref());

    let mut builder = IsolateCommand::new(config.isolate_binary(), sandbox.id())
        .limits(limits)
        .mounts(config.sandbox_mounts.iter().cloned())
        .mounts(language.run.mounts.iter().cloned())
        .cgroup(sandbox.cgroup())
        .env("PATH", &language.run.path)
        .env("HOME", "/box")
        .working_dir("/box")
        .command(command);
    for (key, value) in &language.run.env {
        builder = builder.env(key, value);
    }

    let outcome = isolate::run_batch(sandbox, builder, stdin).await?;

    debug!(
        status = ?outcome.status,
        exit_code = ?outcome.exit_code,
        time = outcome.time,
        "execution finished"
    );

    Ok(outcome)
}
