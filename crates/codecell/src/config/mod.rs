use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{
    CompileConfig, DEFAULT_SANDBOX_PATH, FileExtension, Language, RunConfig,
};
use crate::types::{LanguageId, MountConfig, ResourceLimits};

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Also serves as the default configuration when no file is given.
pub const EXAMPLE_CONFIG: &str = include_str!("../../codecell.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("no configuration for language '{0}'")]
    LanguageNotConfigured(LanguageId),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the isolate binary (uses PATH if not specified).
    #[serde(default)]
    pub isolate_path: Option<PathBuf>,

    /// Use cgroup memory limiting instead of RLIMIT_AS.
    ///
    /// Required for runtimes like the JVM and Node that map large amounts
    /// of virtual memory.
    #[serde(default)]
    pub cgroup: bool,

    /// Cgroup root path for isolate. Must match isolate's `cg_root` value.
    #[serde(default = "default_cg_root")]
    pub cg_root: PathBuf,

    /// Maximum number of sandboxes running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Maximum time a request may wait for admission, in seconds.
    #[serde(default = "default_max_queue_wait")]
    pub max_queue_wait: f64,

    /// Maximum accepted source size in bytes.
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Maximum accepted stdin size in bytes.
    #[serde(default = "default_max_stdin_bytes")]
    pub max_stdin_bytes: usize,

    /// Cap on captured bytes per output stream; excess is truncated.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Global directory mounts applied to every sandbox invocation.
    #[serde(default)]
    pub sandbox_mounts: Vec<MountConfig>,

    /// Default resource limits applied to all executions.
    #[serde(default)]
    pub default_limits: ResourceLimits,

    /// Language configurations keyed by wire identifier.
    #[serde(default)]
    pub languages: HashMap<LanguageId, Language>,
}

impl Config {
    /// Create a config with the embedded defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            isolate_path: None,
            cgroup: false,
            cg_root: default_cg_root(),
            max_concurrency: default_max_concurrency(),
            max_queue_wait: default_max_queue_wait(),
            max_source_bytes: default_max_source_bytes(),
            max_stdin_bytes: default_max_stdin_bytes(),
            max_output_bytes: default_max_output_bytes(),
            sandbox_mounts: Vec::new(),
            default_limits: ResourceLimits::default(),
            languages: HashMap::new(),
        }
    }

    /// Look up the configuration for a language
    pub fn get_language(&self, id: LanguageId) -> Result<&Language, ConfigError> {
        self.languages
            .get(&id)
            .ok_or(ConfigError::LanguageNotConfigured(id))
    }

    /// Path to the isolate binary
    pub fn isolate_binary(&self) -> PathBuf {
        self.isolate_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("isolate"))
    }

    /// Admission wait bound as a `Duration`
    pub fn queue_wait(&self) -> Duration {
        Duration::from_secs_f64(self.max_queue_wait.max(0.0))
    }

    /// Merge resource limits with the service defaults
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_cg_root() -> PathBuf {
    PathBuf::from("/sys/fs/cgroup/isolate")
}

fn default_max_concurrency() -> u32 {
    4
}

fn default_max_queue_wait() -> f64 {
    5.0
}

fn default_max_source_bytes() -> usize {
    128 * 1024
}

fn default_max_stdin_bytes() -> usize {
    64 * 1024
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}
