use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier for a supported language.
///
/// The wire contract accepts exactly these four identifiers; anything else
/// is rejected before a sandbox is ever allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Python,
    Javascript,
    Java,
    Cpp,
}

impl LanguageId {
    /// All supported language identifiers.
    pub const ALL: [LanguageId; 4] = [
        LanguageId::Python,
        LanguageId::Javascript,
        LanguageId::Java,
        LanguageId::Cpp,
    ];

    /// The wire-level name of this language
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::Python => "python",
            LanguageId::Javascript => "javascript",
            LanguageId::Java => "java",
            LanguageId::Cpp => "cpp",
        }
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown language identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for LanguageId {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(LanguageId::Python),
            "javascript" => Ok(LanguageId::Javascript),
            "java" => Ok(LanguageId::Java),
            "cpp" => Ok(LanguageId::Cpp),
            other => Err(UnknownLanguage(other.to_owned())),
        }
    }
}

/// A validated request to execute one program.
///
/// Immutable once constructed; size caps are enforced by the orchestrator
/// before admission.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Language to compile/interpret the source as
    pub language: LanguageId,

    /// Program source text
    pub source: Vec<u8>,

    /// Data fed to the program's standard input
    pub stdin: Option<Vec<u8>>,
}

impl ExecutionRequest {
    pub fn new(language: LanguageId, source: impl Into<Vec<u8>>) -> Self {
        Self {
            language,
            source: source.into(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

/// Resource limits applied to a sandboxed process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU time limit in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,

    /// Wall clock time limit in seconds
    #[serde(default)]
    pub wall_time_limit: Option<f64>,

    /// Memory limit in kilobytes
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Stack size limit in kilobytes
    #[serde(default)]
    pub stack_limit: Option<u64>,

    /// Maximum number of processes/threads
    #[serde(default)]
    pub max_processes: Option<u32>,

    /// Maximum file size the process may write, in kilobytes
    #[serde(default)]
    pub max_file_size: Option<u64>,

    /// Maximum open files
    #[serde(default)]
    pub max_open_files: Option<u32>,

    /// Grace period past the time limit before the process is killed, in seconds
    #[serde(default)]
    pub extra_time: Option<f64>,
}

impl ResourceLimits {
    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;
    /// 1 gigabyte in kilobytes
    pub const GB: u64 = 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_wall_time_limit(mut self, seconds: f64) -> Self {
        self.wall_time_limit = Some(seconds);
        self
    }

    pub fn with_memory_limit(mut self, kb: u64) -> Self {
        self.memory_limit = Some(kb);
        self
    }

    pub fn with_max_processes(mut self, count: u32) -> Self {
        self.max_processes = Some(count);
        self
    }

    /// Apply overrides from another `ResourceLimits`, preferring values from
    /// `overrides` when both are present.
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            time_limit: overrides.time_limit.or(self.time_limit),
            wall_time_limit: overrides.wall_time_limit.or(self.wall_time_limit),
            memory_limit: overrides.memory_limit.or(self.memory_limit),
            stack_limit: overrides.stack_limit.or(self.stack_limit),
            max_processes: overrides.max_processes.or(self.max_processes),
            max_file_size: overrides.max_file_size.or(self.max_file_size),
            max_open_files: overrides.max_open_files.or(self.max_open_files),
            extra_time: overrides.extra_time.or(self.extra_time),
        }
    }

    /// Wall-clock budget for one sandbox invocation, including the grace
    /// period. The orchestrator sizes its kill backstop from this.
    pub fn wall_budget(&self) -> f64 {
        self.wall_time_limit.unwrap_or(DEFAULT_WALL_TIMEOUT) + self.extra_time.unwrap_or(0.0)
    }
}

/// Wall-clock timeout applied when no limit is configured, in seconds.
pub const DEFAULT_WALL_TIMEOUT: f64 = 10.0;

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            time_limit: Some(5.0),
            wall_time_limit: Some(DEFAULT_WALL_TIMEOUT),
            memory_limit: Some(256 * Self::MB),
            stack_limit: Some(64 * Self::MB),
            max_processes: Some(1),
            max_file_size: Some(16 * Self::MB),
            max_open_files: Some(64),
            extra_time: Some(0.5),
        }
    }
}

/// Exit code reported when a program exceeded the wall-clock timeout,
/// matching the conventional `timeout(1)` exit status.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Final outcome of one execution job.
///
/// Program-level failures (compile errors, crashes, limit kills) are
/// expressed here through `exit_code`/`stderr`, never as a service error.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Captured standard output, truncated at the configured cap
    pub stdout: Vec<u8>,

    /// Captured standard error, truncated at the configured cap.
    /// For compiled languages that fail to build, this carries the
    /// compiler diagnostics.
    pub stderr: Vec<u8>,

    /// Exit status of the program; [`TIMEOUT_EXIT_CODE`] when it timed out,
    /// `128 + signal` when killed by a signal
    pub exit_code: i32,

    /// The program was killed because it exceeded the wall-clock timeout
    pub timed_out: bool,

    /// Captured output exceeded the cap and was cut short
    pub truncated: bool,

    /// CPU time used in seconds
    pub time: f64,

    /// Wall clock time used in seconds
    pub wall_time: f64,

    /// Peak memory usage in kilobytes
    pub memory: u64,
}

impl ExecutionResult {
    /// Check if the program exited normally with status 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// A directory bind-mounted into the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// Source path on the host
    pub source: String,

    /// Target path in the sandbox
    pub target: String,

    /// Whether the mount is read-write (default: read-only)
    #[serde(default)]
    pub writable: bool,

    /// Don't fail if the source doesn't exist
    #[serde(default)]
    pub optional: bool,
}

/// Cap a captured output stream at `cap` bytes.
///
/// Returns whether the stream was cut short.
pub(crate) fn truncate_output(data: &mut Vec<u8>, cap: usize) -> bool {
    if data.len() > cap {
        data.truncate(cap);
        true
    } else {
        false
    }
}
