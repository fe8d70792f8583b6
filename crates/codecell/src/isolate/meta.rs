//! Meta-file parsing
//!
//! After every run, isolate writes a key-value meta file describing how
//! the process ended: time and memory used, exit code or fatal signal,
//! and a two-letter status code. This module turns that file into a
//! [`SandboxOutcome`].

use std::collections::HashMap;
use std::path::Path;

use crate::isolate::IsolateError;

/// Status of a sandboxed run, from isolate's two-letter status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Program exited normally
    Ok,
    /// Runtime error (non-zero exit code)
    RuntimeError,
    /// Time limit exceeded
    TimeLimitExceeded,
    /// Killed by a signal (includes memory/output limit kills)
    Signaled,
    /// Internal error in isolate itself
    InternalError,
}

impl ExecutionStatus {
    pub fn from_meta_status(status: &str) -> Self {
        match status {
            "OK" => ExecutionStatus::Ok,
            "RE" => ExecutionStatus::RuntimeError,
            "TO" => ExecutionStatus::TimeLimitExceeded,
            "SG" => ExecutionStatus::Signaled,
            _ => ExecutionStatus::InternalError,
        }
    }
}

/// Raw result of one sandbox invocation, before the orchestrator applies
/// output caps and the timeout sentinel.
#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    pub status: ExecutionStatus,

    /// CPU time used in seconds
    pub time: f64,

    /// Wall clock time used in seconds
    pub wall_time: f64,

    /// Peak memory usage in kilobytes (cg-mem preferred, fallback max-rss)
    pub memory: u64,

    /// Exit code if the program exited normally
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    /// Additional message from isolate
    pub message: Option<String>,

    /// Captured standard output
    pub stdout: Vec<u8>,

    /// Captured standard error
    pub stderr: Vec<u8>,
}

impl SandboxOutcome {
    /// Whether the run was cut off at a time limit
    pub fn timed_out(&self) -> bool {
        self.status == ExecutionStatus::TimeLimitExceeded
    }

    /// Collapse exit code and signal into a single wire-style exit status:
    /// the exit code when present, `128 + signal` for signal deaths.
    pub fn exit_code_or_signal(&self) -> i32 {
        if let Some(code) = self.exit_code {
            code
        } else if let Some(signal) = self.signal {
            128 + signal
        } else if self.status == ExecutionStatus::Ok {
            0
        } else {
            1
        }
    }
}

impl Default for SandboxOutcome {
    fn default() -> Self {
        Self {
            status: ExecutionStatus::Ok,
            time: 0.0,
            wall_time: 0.0,
            memory: 0,
            exit_code: None,
            signal: None,
            message: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }
}

/// Parsed isolate meta file.
#[derive(Debug, Clone, Default)]
pub struct MetaFile {
    entries: HashMap<String, String>,
}

impl MetaFile {
    /// Parse meta-file content.
    ///
    /// Lenient: malformed lines are skipped. Isolate owns this format, so
    /// a bad line is noise rather than a reason to fail the job.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        // Entries are "key:value" lines; values may themselves contain
        // colons (messages, timestamps), so split on the first only.
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    entries.insert(key.to_owned(), value.trim().to_owned());
                }
            }
        }

        Self { entries }
    }

    /// Load and parse a meta file from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IsolateError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn status(&self) -> ExecutionStatus {
        self.get("status")
            .map(ExecutionStatus::from_meta_status)
            .unwrap_or(ExecutionStatus::Ok)
    }

    /// Convert to a [`SandboxOutcome`] (output streams left empty; the
    /// process layer fills them in from the box files).
    pub fn to_outcome(&self) -> SandboxOutcome {
        SandboxOutcome {
            status: self.status(),
            time: self.get_f64("time").unwrap_or(0.0),
            wall_time: self.get_f64("time-wall").unwrap_or(0.0),
            // cg-mem covers the whole cgroup; max-rss is process-only
            memory: self
                .get_u64("cg-mem")
                .or_else(|| self.get_u64("max-rss"))
                .unwrap_or(0),
            exit_code: self.get_i32("exitcode"),
            signal: self.get_i32("exitsig"),
            message: self.get("message").map(String::from),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_success_meta() {
        let content = "\ntime:0.042\ntime-wall:0.050\nmax-rss:3456\nexitcode:0\n";
        let outcome = MetaFile::parse(content).to_outcome();

        assert_eq!(outcome.status, ExecutionStatus::Ok);
        assert!((outcome.time - 0.042).abs() < 0.001);
        assert!((outcome.wall_time - 0.050).abs() < 0.001);
        assert_eq!(outcome.memory, 3456);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.signal, None);
        assert_eq!(outcome.exit_code_or_signal(), 0);
        assert!(!outcome.timed_out());
    }

    #[test]
    fn parse_timeout_meta() {
        let content = "time:2.001\ntime-wall:10.05\nstatus:TO\nmessage:Time limit exceeded\n";
        let outcome = MetaFile::parse(content).to_outcome();

        assert_eq!(outcome.status, ExecutionStatus::TimeLimitExceeded);
        assert!(outcome.timed_out());
        assert_eq!(outcome.message.as_deref(), Some("Time limit exceeded"));
    }

    #[test]
    fn parse_signal_meta() {
        let content = "time:0.010\nexitsig:11\nstatus:SG\nmessage:Caught fatal signal 11\n";
        let outcome = MetaFile::parse(content).to_outcome();

        assert_eq!(outcome.status, ExecutionStatus::Signaled);
        assert_eq!(outcome.signal, Some(11));
        assert_eq!(outcome.exit_code_or_signal(), 139);
    }

    #[test]
    fn parse_runtime_error_meta() {
        let content = "time:0.030\nexitcode:1\nstatus:RE\nmessage:Exited with error status 1\n";
        let outcome = MetaFile::parse(content).to_outcome();

        assert_eq!(outcome.status, ExecutionStatus::RuntimeError);
        assert_eq!(outcome.exit_code_or_signal(), 1);
    }

    #[test]
    fn cg_mem_preferred_over_max_rss() {
        let content = "cg-mem:524288\nmax-rss:512000\n";
        let outcome = MetaFile::parse(content).to_outcome();
        assert_eq!(outcome.memory, 524288);
    }

    #[test]
    fn unknown_status_maps_to_internal_error() {
        assert_eq!(
            ExecutionStatus::from_meta_status("??"),
            ExecutionStatus::InternalError
        );
        assert_eq!(
            ExecutionStatus::from_meta_status(""),
            ExecutionStatus::InternalError
        );
    }

    #[test]
    fn missing_status_defaults_to_ok() {
        let meta = MetaFile::parse("time:0.1\nexitcode:0\n");
        assert_eq!(meta.status(), ExecutionStatus::Ok);
    }

    #[test]
    fn value_with_colon_is_preserved() {
        let meta = MetaFile::parse("message:Error at 12:30:45");
        assert_eq!(meta.get("message"), Some("Error at 12:30:45"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let meta = MetaFile::parse("time:0.042\nnot a meta line\nexitcode:0");
        assert_eq!(meta.get("exitcode"), Some("0"));
        assert!(meta.get("not a meta line").is_none());
    }

    #[test]
    fn no_exit_code_no_signal_fallbacks() {
        let ok = SandboxOutcome::default();
        assert_eq!(ok.exit_code_or_signal(), 0);

        let failed = SandboxOutcome {
            status: ExecutionStatus::InternalError,
            ..Default::default()
        };
        assert_eq!(failed.exit_code_or_signal(), 1);
    }
}
