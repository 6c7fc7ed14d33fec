//! Plugin discovery
//!
//! Turns the manifests of a project and its workspace into the ordered list
//! of plugins to run:
//! - `manifest`: `weavr.toml` parsing
//! - `addins`: scanning addin directories for `<name>-weaver` binaries
//! - `project`: the in-workspace plugin project (development mode)
//! - `resolve`: merging all of the above into `PluginDescriptor`s

pub mod addins;
pub mod manifest;
pub mod project;
pub mod resolve;

pub use addins::{Addin, AddinFinder};
pub use manifest::{LoadedManifest, ManifestEntry, PluginManifest};
pub use project::{find_plugin_project, PluginProject};
pub use resolve::{discover, listed_plugins, ListedPlugins};

use crate::error::WeavrResult;
use crate::history::file_signature_if_exists;
use crate::request::RunConfiguration;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Candidate manifest locations, project level first
pub fn manifest_paths(config: &RunConfiguration, manifest_name: &str) -> Vec<PathBuf> {
    let project = config.project_dir().join(manifest_name);
    let workspace = config.workspace_root.join(manifest_name);
    if project == workspace {
        vec![project]
    } else {
        vec![project, workspace]
    }
}

/// Load every manifest that exists; missing ones are skipped
pub async fn load_manifests(paths: &[PathBuf]) -> WeavrResult<Vec<LoadedManifest>> {
    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        if path.is_file() {
            loaded.push(LoadedManifest::from_file(path).await?);
        }
    }
    Ok(loaded)
}

/// Content signatures of the manifests that exist
pub fn manifest_signatures(paths: &[PathBuf]) -> WeavrResult<BTreeMap<PathBuf, String>> {
    let mut signatures = BTreeMap::new();
    for path in paths {
        if let Some(signature) = file_signature_if_exists(path)? {
            signatures.insert(path.clone(), signature);
        }
    }
    Ok(signatures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn manifest_paths_deduplicated() {
        let config = RunConfiguration::new("/w/bin/app", "/w");
        assert_eq!(manifest_paths(&config, "weavr.toml"), vec![PathBuf::from("/w/weavr.toml")]);

        let config = RunConfiguration {
            project_dir: Some(PathBuf::from("/w/app")),
            ..config
        };
        assert_eq!(
            manifest_paths(&config, "weavr.toml"),
            vec![
                PathBuf::from("/w/app/weavr.toml"),
                PathBuf::from("/w/weavr.toml")
            ]
        );
    }

    #[tokio::test]
    async fn missing_manifests_skipped() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("weavr.toml");
        std::fs::write(&present, "[[plugin]]\nname = \"A\"\n").unwrap();

        let loaded = load_manifests(&[dir.path().join("nope.toml"), present.clone()])
            .await
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path, present);

        let signatures = manifest_signatures(&[dir.path().join("nope.toml"), present.clone()])
            .unwrap();
        assert_eq!(signatures.len(), 1);
        assert!(signatures.contains_key(&present));
    }
}
