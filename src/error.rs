//! Error types for weavr
//!
//! All modules use `WeavrResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for weavr operations
pub type WeavrResult<T> = Result<T, WeavrError>;

/// How an error is reported at the run boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad paths, bad manifests, nothing to run
    Configuration,
    /// A plugin failed while transforming the artifact
    Execution,
    /// Anything else that went wrong during orchestration
    Fault,
}

/// All errors that can occur in weavr
#[derive(Error, Debug)]
pub enum WeavrError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{field} is not set")]
    MissingPath { field: &'static str },

    #[error("{field} does not exist: {path}")]
    PathNotFound { field: &'static str, path: PathBuf },

    #[error("Invalid path for {field}: {path}: {reason}")]
    PathInvalid {
        field: &'static str,
        path: PathBuf,
        reason: String,
    },

    // Discovery errors
    #[error("Malformed plugin manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Plugin '{name}' could not be found. Searched: {searched}")]
    PluginNotFound { name: String, searched: String },

    #[error("You don't seem to have configured any plugins. Try adding a [[plugin]] entry to '{manifest}'.")]
    NoPlugins { manifest: String },

    // History errors
    #[error("Failed to persist history record {path}: {reason}")]
    HistoryPersist { path: PathBuf, reason: String },

    // Isolation errors
    #[error("Failed to start isolated context for {workspace}: {reason}")]
    ContextStart { workspace: String, reason: String },

    #[error("Isolated context protocol error: {0}")]
    Protocol(String),

    #[error("Isolated context exited unexpectedly: {0}")]
    ContextExited(String),

    #[error("Plugin '{plugin}' failed: {reason}")]
    PluginFailed { plugin: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl WeavrError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Where this error lands in the run error taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigInvalid { .. }
            | Self::MissingPath { .. }
            | Self::PathNotFound { .. }
            | Self::PathInvalid { .. }
            | Self::ManifestInvalid { .. }
            | Self::PluginNotFound { .. }
            | Self::NoPlugins { .. }
            | Self::TomlParse(_) => ErrorClass::Configuration,
            Self::PluginFailed { .. } => ErrorClass::Execution,
            _ => ErrorClass::Fault,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoPlugins { .. } => Some("List plugins with [[plugin]] name = \"...\" in weavr.toml"),
            Self::PluginNotFound { .. } => {
                Some("Install the plugin into .weavr/addins or add an addin_dirs entry")
            }
            Self::ManifestInvalid { .. } => Some("Check the manifest against `weavr config show`"),
            _ => None,
        }
    }
}
