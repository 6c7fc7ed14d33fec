//! Plugin manifest parsing
//!
//! A project or workspace lists the plugins it wants in `weavr.toml`:
//!
//! ```toml
//! [settings]
//! addin_dirs = ["tools/weavers"]
//!
//! [[plugin]]
//! name = "PropertyChanged"
//!
//! [[plugin]]
//! name = "Tracer"
//! path = "tools/tracer/tracer-weaver"
//! [plugin.options]
//! level = "debug"
//! ```

use crate::error::{WeavrError, WeavrResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Parsed `weavr.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginManifest {
    /// Discovery settings
    #[serde(default)]
    pub settings: ManifestSettings,

    /// Plugins in execution order
    #[serde(default, rename = "plugin")]
    pub plugins: Vec<ManifestEntry>,
}

/// `[settings]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestSettings {
    /// Addin directories, relative to the manifest's directory
    #[serde(default)]
    pub addin_dirs: Vec<PathBuf>,

    /// Also run addins that are not listed
    #[serde(default)]
    pub include_unlisted: bool,
}

/// One `[[plugin]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    /// Plugin name, matched case-insensitively against addins
    pub name: String,

    /// Explicit binary path, relative to the manifest's directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Options forwarded to the plugin untouched
    #[serde(default)]
    pub options: toml::Table,
}

impl ManifestEntry {
    /// Options converted for the JSON wire format
    pub fn options_json(&self) -> WeavrResult<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(&self.options)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }
}

impl PluginManifest {
    /// Parse a manifest from a TOML string; `path` is used for errors only
    pub fn parse(content: &str, path: &Path) -> WeavrResult<Self> {
        let manifest: Self = toml::from_str(content).map_err(|e| WeavrError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        for entry in &manifest.plugins {
            validate_plugin_name(&entry.name).map_err(|reason| WeavrError::ManifestInvalid {
                path: path.to_path_buf(),
                reason,
            })?;
        }

        Ok(manifest)
    }
}

/// A manifest together with where it was read from
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: PluginManifest,
}

impl LoadedManifest {
    /// Read and parse a manifest file
    pub async fn from_file(path: &Path) -> WeavrResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            WeavrError::io(format!("reading plugin manifest {}", path.display()), e)
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            manifest: PluginManifest::parse(&content, path)?,
        })
    }

    /// Directory relative paths in the manifest resolve against
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Addin directories made absolute
    pub fn addin_dirs(&self) -> Vec<PathBuf> {
        self.manifest
            .settings
            .addin_dirs
            .iter()
            .map(|dir| self.base_dir().join(dir))
            .collect()
    }
}

/// Plugin names must be usable as file name stems
fn validate_plugin_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("plugin name cannot be empty".to_string());
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") || name.contains('\0') {
        return Err(format!(
            "invalid plugin name '{}': must not contain path separators or '..'",
            name
        ));
    }
    Ok(())
}
