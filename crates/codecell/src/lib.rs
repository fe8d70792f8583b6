//! A library for sandboxed multi-language code execution.
//!
//! Codecell runs untrusted programs submitted over a simple request
//! contract: a language identifier, source text, and optional stdin. Each
//! submission is validated, admitted through a bounded FIFO queue, and
//! executed inside an IOI Isolate sandbox; the result carries the
//! program's output and exit status whether it succeeded, crashed, failed
//! to compile, or was killed at a limit.
//!
//! # Features
//!
//! - **Sandboxed execution** — every run happens inside an Isolate box with
//!   CPU, memory, process, and output limits.
//! - **Multi-language** — interpreted (Python, JavaScript) and compiled
//!   (Java, C++) languages behind one contract; compile failures are
//!   ordinary results, not errors.
//! - **Bounded concurrency** — a FIFO admission queue caps simultaneous
//!   sandboxes and rejects requests that wait too long.
//! - **TOML configuration** — per-language commands, mounts, and resource
//!   limits.
//! - **cgroup v2 support** — memory limiting for runtimes like the JVM in
//!   container environments.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language};
pub use isolate::{IsolateBox, IsolateError, prepare_cgroup};
pub use job::{ExecutionJob, JobState};
pub use orchestrator::{Orchestrator, SubmitError};
pub use queue::{AdmissionQueue, ExecutionSlot, QueueTimeout};
pub use types::{
    ExecutionRequest, ExecutionResult, LanguageId, MountConfig, ResourceLimits,
    TIMEOUT_EXIT_CODE, UnknownLanguage,
};
pub use wire::WireResponse;

pub mod config;
pub mod isolate;
pub mod job;
pub mod orchestrator;
pub mod queue;
pub mod runner;
pub mod types;
pub mod wire;
