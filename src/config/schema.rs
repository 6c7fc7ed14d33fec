//! Configuration schema for weavr
//!
//! Global configuration is stored at `~/.config/weavr/config.toml`; a
//! project may override any key in `.weavr.toml`.

use crate::logger::Verbosity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Plugin discovery settings
    pub discovery: DiscoveryConfig,

    /// Isolated worker settings
    pub worker: WorkerConfig,

    /// History store settings
    pub history: HistoryConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default verbosity for build messages
    pub verbosity: Verbosity,

    /// Forward trace messages from plugins
    pub debug_logging: bool,

    /// Diagnostic log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            debug_logging: false,
            log_format: "text".to_string(),
        }
    }
}

/// Plugin discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Manifest file name looked up in project and workspace directories
    pub manifest_name: String,

    /// Extra addin directories scanned for every run
    pub addin_dirs: Vec<PathBuf>,

    /// Also run addins that no manifest lists
    pub include_unlisted: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            manifest_name: "weavr.toml".to_string(),
            addin_dirs: vec![],
            include_unlisted: false,
        }
    }
}

/// Isolated worker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker executable (defaults to the running weavr binary)
    pub program: Option<PathBuf>,

    /// Arguments placed before the `worker` subcommand
    pub args: Vec<String>,
}

/// History store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Directory for history records (defaults to the state directory)
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.general.verbosity, Verbosity::Normal);
        assert_eq!(config.discovery.manifest_name, "weavr.toml");
        assert!(config.worker.program.is_none());
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
            [general]
            verbosity = "high"

            [discovery]
            addin_dirs = ["/opt/weavers"]
            include_unlisted = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.verbosity, Verbosity::High);
        assert!(!config.general.debug_logging);
        assert_eq!(config.discovery.addin_dirs, vec![PathBuf::from("/opt/weavers")]);
        assert!(config.discovery.include_unlisted);
        assert_eq!(config.discovery.manifest_name, "weavr.toml");
    }

    #[test]
    fn serialize_roundtrip() {
        let mut config = Config::default();
        config.worker.program = Some(PathBuf::from("/usr/local/bin/weavr"));

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.worker.program, config.worker.program);
    }
}
