//! Wire representation of execution results.
//!
//! Pure shaping: no I/O, no sandbox state. Output bytes become lossy
//! UTF-8 so clients always get valid JSON strings even when a program
//! prints raw binary.

use serde::Serialize;

use crate::types::ExecutionResult;

/// JSON body returned to clients for one execution.
#[derive(Debug, Clone, Serialize)]
pub struct WireResponse {
    /// Captured standard output
    pub stdout: String,

    /// Captured standard error; compiler diagnostics for failed builds
    pub stderr: String,

    /// Exit status; 124 for timeouts, 128+signal for signal deaths
    pub code: i32,

    /// Present only when the service itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The program was killed at the wall-clock timeout
    pub timed_out: bool,

    /// Output was cut at the configured cap
    pub truncated: bool,
}

impl WireResponse {
    /// Body for a request the service could not run at all: no program
    /// output exists, only the error message.
    pub fn service_error(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            code: -1,
            error: Some(message.into()),
            timed_out: false,
            truncated: false,
        }
    }
}

impl From<&ExecutionResult> for WireResponse {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            code: result.exit_code,
            error: None,
            timed_out: result.timed_out,
            truncated: result.truncated,
        }
    }
}
