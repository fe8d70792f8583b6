//! Execution orchestrator
//!
//! Owns the full path of a submission: validation, admission, sandbox
//! setup, the optional compile phase, execution, and result shaping.
//! Every exit path releases the sandbox and its slot.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::{Config, Language};
use crate::isolate::{self, IsolateBox, IsolateError};
use crate::job::{ExecutionJob, InvalidTransition, JobState};
use crate::queue::{AdmissionQueue, QueueTimeout};
use crate::runner::{self, CompileResult};
use crate::types::{
    ExecutionRequest, ExecutionResult, TIMEOUT_EXIT_CODE, truncate_output,
};

/// Extra wall-clock seconds granted past the sandbox's own budget before
/// the orchestrator kills the run from outside. Only reached when isolate
/// itself fails to enforce its limits.
const BACKSTOP_GRACE: f64 = 2.0;

/// Why a submission was rejected or failed.
///
/// Program failures (compile errors, crashes, timeouts) are not here;
/// they come back as a normal [`ExecutionResult`].
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("{what} is {size} bytes, over the {limit} byte limit")]
    PayloadTooLarge {
        what: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("source must not be empty")]
    EmptySource,

    #[error(transparent)]
    QueueTimeout(#[from] QueueTimeout),

    #[error("sandbox failure: {0}")]
    Sandbox(#[from] IsolateError),

    #[error("job lifecycle fault: {0}")]
    Lifecycle(#[from] InvalidTransition),
}

impl SubmitError {
    /// Whether the submission itself was at fault, as opposed to the
    /// service being unable to run it.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SubmitError::UnsupportedLanguage(_)
                | SubmitError::PayloadTooLarge { .. }
                | SubmitError::EmptySource
        )
    }
}

/// The execution service.
///
/// Shared across request handlers behind an `Arc`; all state it owns is
/// internally synchronized.
#[derive(Debug)]
pub struct Orchestrator {
    config: Config,
    queue: AdmissionQueue,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let queue = AdmissionQueue::new(0, config.max_concurrency, config.queue_wait());
        Self { config, queue }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of execution slots currently free
    pub fn available_slots(&self) -> usize {
        self.queue.available()
    }

    /// Run one submission to completion.
    ///
    /// Blocks until the program finishes, times out, or the request is
    /// rejected. The sandbox and its slot are released before returning,
    /// on every path.
    #[instrument(skip_all, fields(language = %request.language))]
    pub async fn submit(&self, request: ExecutionRequest) -> Result<ExecutionResult, SubmitError> {
        let language = self
            .config
            .get_language(request.language)
            .map_err(|_| SubmitError::UnsupportedLanguage(request.language.to_string()))?;

        self.validate(&request)?;

        let mut job = ExecutionJob::new(request);
        info!(job = %job.id(), "job accepted");

        job.advance(JobState::Queued)?;
        let slot = match self.queue.admit().await {
            Ok(slot) => slot,
            Err(e) => {
                warn!(job = %job.id(), "no slot within the admission window");
                job.advance(JobState::Failed)?;
                return Err(e.into());
            }
        };

        job.advance(JobState::Running)?;
        let mut sandbox = match IsolateBox::init(
            slot.box_id(),
            self.config.isolate_binary(),
            self.config.cgroup,
        )
        .await
        {
            Ok(sandbox) => sandbox,
            Err(e) => {
                error!(job = %job.id(), error = %e, "sandbox init failed");
                job.advance(JobState::Failed)?;
                return Err(e.into());
            }
        };

        let result = self.run_in_sandbox(&mut job, language, &sandbox).await;

        // Release order: box first, then the slot (held by `slot` until drop)
        if let Err(e) = sandbox.cleanup().await {
            error!(job = %job.id(), error = %e, "sandbox cleanup failed");
        }
        drop(slot);

        match &result {
            Ok(res) => info!(
                job = %job.id(),
                state = ?job.state(),
                exit_code = res.exit_code,
                timed_out = res.timed_out,
                "job finished"
            ),
            Err(e) => error!(job = %job.id(), error = %e, "job failed"),
        }

        result
    }

    fn validate(&self, request: &ExecutionRequest) -> Result<(), SubmitError> {
        if request.source.is_empty() {
            return Err(SubmitError::EmptySource);
        }
        if request.source.len() > self.config.max_source_bytes {
            return Err(SubmitError::PayloadTooLarge {
                what: "source",
                size: request.source.len(),
                limit: self.config.max_source_bytes,
            });
        }
        if let Some(stdin) = &request.stdin
            && stdin.len() > self.config.max_stdin_bytes
        {
            return Err(SubmitError::PayloadTooLarge {
                what: "stdin",
                size: stdin.len(),
                limit: self.config.max_stdin_bytes,
            });
        }
        Ok(())
    }

    /// Compile (if needed) and execute inside an initialized box.
    ///
    /// The caller owns cleanup; this only uses the box.
    async fn run_in_sandbox(
        &self,
        job: &mut ExecutionJob,
        language: &Language,
        sandbox: &IsolateBox,
    ) -> Result<ExecutionResult, SubmitError> {
        let source = job.request().source.clone();
        let stdin = job.request().stdin.clone();

        sandbox.write_file(&language.source_name(), &source).await?;

        if let Some(compile_cfg) = &language.compile {
            let compiled = runner::compile(sandbox, &self.config, language, compile_cfg).await?;
            if !compiled.success {
                // A failed build is the job's result, not a service error
                job.advance(JobState::Completed)?;
                return Ok(self.compile_failure_result(compiled));
            }
        }

        let limits = self.config.effective_limits(language.run.limits.as_ref());
        let backstop = Duration::from_secs_f64(limits.wall_budget() + BACKSTOP_GRACE);

        let run = runner::execute(sandbox, &self.config, language, stdin.as_deref());
        match tokio::time::timeout(backstop, run).await {
            Ok(Ok(outcome)) => {
                let next = if outcome.timed_out() {
                    JobState::TimedOut
                } else {
                    JobState::Completed
                };
                job.advance(next)?;
                Ok(self.finish(outcome))
            }
            Ok(Err(e)) => {
                job.advance(JobState::Failed)?;
                Err(e.into())
            }
            Err(_) => {
                // Dropping the run future killed the isolate process
                warn!(job = %job.id(), "kill backstop fired before isolate reported");
                job.advance(JobState::TimedOut)?;
                let (stdout, stderr) = isolate::salvage_output(sandbox).await;
                Ok(self.timeout_result(stdout, stderr, backstop))
            }
        }
    }

    fn finish(&self, outcome: isolate::SandboxOutcome) -> ExecutionResult {
        let timed_out = outcome.timed_out();
        let exit_code = if timed_out {
            TIMEOUT_EXIT_CODE
        } else {
            outcome.exit_code_or_signal()
        };

        let mut stdout = outcome.stdout;
        let mut stderr = outcome.stderr;
        let truncated = truncate_output(&mut stdout, self.config.max_output_bytes)
            | truncate_output(&mut stderr, self.config.max_output_bytes);

        ExecutionResult {
            stdout,
            stderr,
            exit_code,
            timed_out,
            truncated,
            time: outcome.time,
            wall_time: outcome.wall_time,
            memory: outcome.memory,
        }
    }

    fn compile_failure_result(&self, compiled: CompileResult) -> ExecutionResult {
        let mut stderr = compiled.diagnostics.into_bytes();
        let truncated = truncate_output(&mut stderr, self.config.max_output_bytes);

        // Signal deaths and compiler timeouts still need a nonzero code
        let exit_code = match compiled.outcome.exit_code_or_signal() {
            0 => 1,
            code => code,
        };

        ExecutionResult {
            stdout: Vec::new(),
            stderr,
            exit_code,
            timed_out: false,
            truncated,
            time: compiled.outcome.time,
            wall_time: compiled.outcome.wall_time,
            memory: compiled.outcome.memory,
        }
    }

    fn timeout_result(
        &self,
        mut stdout: Vec<u8>,
        mut stderr: Vec<u8>,
        budget: Duration,
    ) -> ExecutionResult {
        let truncated = truncate_output(&mut stdout, self.config.max_output_bytes)
            | truncate_output(&mut stderr, self.config.max_output_bytes);

        ExecutionResult {
            stdout,
            stderr,
            exit_code: TIMEOUT_EXIT_CODE,
            timed_out: true,
            truncated,
            time: 0.0,
            wall_time: budget.as_secs_f64(),
            memory: 0,
        }
    }
}
