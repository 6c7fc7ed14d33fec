//! In-workspace plugin project (development mode)
//!
//! A workspace may carry the source of its own plugin in `weavers/`. When
//! that crate has been built, its binary provides the plugin named after the
//! package and takes precedence over installed addins.

use crate::error::{WeavrError, WeavrResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Directory name of the in-workspace plugin project
pub const PROJECT_DIR: &str = "weavers";

/// A plugin project found in the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginProject {
    /// Package name, also the plugin name
    pub name: String,

    /// Path of the project's Cargo.toml
    pub manifest_path: PathBuf,

    /// Most recently built binary, if any
    pub binary: Option<PathBuf>,
}

#[derive(Deserialize)]
struct CargoManifest {
    package: Option<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
}

/// Locate the plugin project under `workspace`, if there is one
pub async fn find_plugin_project(workspace: &Path) -> WeavrResult<Option<PluginProject>> {
    let project_dir = workspace.join(PROJECT_DIR);
    let manifest_path = project_dir.join("Cargo.toml");

    if !manifest_path.is_file() {
        return Ok(None);
    }

    let content = tokio::fs::read_to_string(&manifest_path).await.map_err(|e| {
        WeavrError::io(format!("reading plugin project {}", manifest_path.display()), e)
    })?;
    let cargo: CargoManifest =
        toml::from_str(&content).map_err(|e| WeavrError::ManifestInvalid {
            path: manifest_path.clone(),
            reason: e.to_string(),
        })?;

    let Some(package) = cargo.package else {
        debug!(
            "{} has no [package] table, not a plugin project",
            manifest_path.display()
        );
        return Ok(None);
    };
    let name = package.name;
    let binary = newest_binary(&project_dir, &name);
    debug!(
        "Plugin project '{}' at {} (built: {})",
        name,
        project_dir.display(),
        binary.is_some()
    );

    Ok(Some(PluginProject {
        name,
        manifest_path,
        binary,
    }))
}

fn newest_binary(project_dir: &Path, name: &str) -> Option<PathBuf> {
    let exe_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    ["debug", "release"]
        .iter()
        .map(|profile| project_dir.join("target").join(profile).join(&exe_name))
        .filter_map(|path| {
            let modified = path.metadata().ok()?.modified().ok()?;
            Some((modified, path))
        })
        .max_by_key(|(modified, _): &(SystemTime, PathBuf)| *modified)
        .map(|(_, path)| path)
}
