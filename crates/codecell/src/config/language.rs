use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::{MountConfig, ResourceLimits};

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Runtime description of one supported language.
///
/// This is the per-language driver table: the presence of `compile`
/// decides whether a build phase runs before execution, and the command
/// templates decide what the sandbox actually invokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name (e.g. "Python 3")
    pub name: String,

    /// Source file extension
    pub extension: FileExtension,

    /// Compilation phase; `None` for interpreted languages
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution phase
    pub run: RunConfig,
}

impl Language {
    /// Check if the language needs a compilation phase
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Name of the source file placed in the sandbox
    pub fn source_name(&self) -> String {
        if let Some(ref compile) = self.compile {
            compile.source_name.clone()
        } else {
            format!("main.{}", self.extension)
        }
    }

    /// Expand `{source}`/`{binary}`/`{output}` placeholders in a command template
    pub fn expand_command(command: &[String], source: &str, binary: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{output}", binary)
                    .replace("{binary}", binary)
            })
            .collect()
    }
}

/// File extension without dot (e.g. "py")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command template; placeholders: {source}, {output}
    pub command: Vec<String>,

    /// Source file name in the sandbox (e.g. "main.cpp")
    pub source_name: String,

    /// Output artifact name (e.g. "main", or "Main" for the Java class)
    pub output_name: String,

    /// Environment variables set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for compilation (overrides compile defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

/// Default PATH inside the sandbox
pub const DEFAULT_SANDBOX_PATH: &str = "/usr/bin:/bin";

/// Configuration for the execution phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command template; placeholders: {source}, {binary}
    pub command: Vec<String>,

    /// Environment variables set for the program
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Extra directory mounts this runtime needs
    #[serde(default)]
    pub mounts: Vec<MountConfig>,

    /// PATH inside the sandbox; defaults to "/usr/bin:/bin"
    #[serde(default = "default_sandbox_path")]
    pub path: String,

    /// Resource limits for execution (overrides service defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

fn default_sandbox_path() -> String {
    DEFAULT_SANDBOX_PATH.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_config(command: Vec<String>) -> RunConfig {
        RunConfig {
            command,
            env: HashMap::new(),
            mounts: vec![],
            path: DEFAULT_SANDBOX_PATH.to_owned(),
            limits: None,
        }
    }

    #[test]
    fn file_extension_accepts_plain() {
        let ext = FileExtension::new("py").unwrap();
        assert_eq!(ext.to_string(), "py");
        assert!(!ext.is_empty());
    }

    #[test]
    fn file_extension_rejects_dot_and_slash() {
        assert!(FileExtension::new(".py").is_err());
        assert!(FileExtension::new("a/b").is_err());
        assert!(FileExtension::new("tar.gz").is_err());
    }

    #[test]
    fn expand_command_replaces_placeholders() {
        let cmd = vec![
            "g++".to_owned(),
            "{source}".to_owned(),
            "-o".to_owned(),
            "{output}".to_owned(),
        ];
        let result = Language::expand_command(&cmd, "main.cpp", "main");
        assert_eq!(result, vec!["g++", "main.cpp", "-o", "main"]);
    }

    #[test]
    fn expand_command_binary_placeholder() {
        let cmd = vec!["./{binary}".to_owned()];
        assert_eq!(
            Language::expand_command(&cmd, "main.cpp", "main"),
            vec!["./main"]
        );
    }

    #[test]
    fn expand_command_leaves_plain_args() {
        let cmd = vec!["java".to_owned(), "-Xss64m".to_owned(), "{binary}".to_owned()];
        assert_eq!(
            Language::expand_command(&cmd, "Main.java", "Main"),
            vec!["java", "-Xss64m", "Main"]
        );
    }

    #[test]
    fn interpreted_source_name_uses_extension() {
        let lang = Language {
            name: "Python 3".to_owned(),
            extension: FileExtension::new("py").unwrap(),
            compile: None,
            run: run_config(vec!["python3".to_owned(), "{source}".to_owned()]),
        };
        assert!(!lang.is_compiled());
        assert_eq!(lang.source_name(), "main.py");
    }

    #[test]
    fn compiled_source_name_comes_from_compile_config() {
        let lang = Language {
            name: "Java".to_owned(),
            extension: FileExtension::new("java").unwrap(),
            compile: Some(CompileConfig {
                command: vec!["javac".to_owned(), "{source}".to_owned()],
                source_name: "Main.java".to_owned(),
                output_name: "Main".to_owned(),
                env: HashMap::new(),
                limits: None,
            }),
            run: run_config(vec!["java".to_owned(), "{binary}".to_owned()]),
        };
        assert!(lang.is_compiled());
        assert_eq!(lang.source_name(), "Main.java");
    }
}
