//! Plugin resolution
//!
//! Resolves manifest entries to plugin binaries. Per entry, first match wins:
//! 1. Explicit `path` in the entry
//! 2. The built in-workspace plugin project with the same name
//! 3. An addin with the same name (case-insensitive)
//!
//! With `include_unlisted`, remaining addins follow the listed plugins in
//! name order.

use crate::config::schema::DiscoveryConfig;
use crate::discovery::addins::{Addin, AddinFinder};
use crate::discovery::manifest::{LoadedManifest, ManifestEntry};
use crate::discovery::project::{find_plugin_project, PluginProject};
use crate::discovery::{load_manifests, manifest_paths};
use crate::error::{WeavrError, WeavrResult};
use crate::history::file_signature;
use crate::plugin::{PluginDescriptor, PluginSource};
use crate::request::RunConfiguration;
use std::path::PathBuf;
use tracing::debug;

/// Names listed across all manifests, without resolving binaries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListedPlugins {
    pub names: Vec<String>,
    pub include_unlisted: bool,
}

/// Manifest entries in execution order, de-duplicated by name
///
/// Project-level entries come first; workspace-level entries follow unless
/// the project already listed them.
pub fn merged_entries(manifests: &[LoadedManifest]) -> Vec<(&LoadedManifest, &ManifestEntry)> {
    let mut merged: Vec<(&LoadedManifest, &ManifestEntry)> = Vec::new();
    for loaded in manifests {
        for entry in &loaded.manifest.plugins {
            if merged
                .iter()
                .any(|(_, e)| e.name.eq_ignore_ascii_case(&entry.name))
            {
                continue;
            }
            merged.push((loaded, entry));
        }
    }
    merged
}

fn include_unlisted(manifests: &[LoadedManifest], settings: &DiscoveryConfig) -> bool {
    settings.include_unlisted
        || manifests
            .iter()
            .any(|m| m.manifest.settings.include_unlisted)
}

/// Read only the manifests: which plugins are asked for
pub async fn listed_plugins(
    config: &RunConfiguration,
    settings: &DiscoveryConfig,
) -> WeavrResult<ListedPlugins> {
    let manifests = load_manifests(&manifest_paths(config, &settings.manifest_name)).await?;
    Ok(ListedPlugins {
        names: merged_entries(&manifests)
            .into_iter()
            .map(|(_, entry)| entry.name.clone())
            .collect(),
        include_unlisted: include_unlisted(&manifests, settings),
    })
}

/// Resolve the ordered plugin list for a run
pub async fn discover(
    config: &RunConfiguration,
    settings: &DiscoveryConfig,
) -> WeavrResult<Vec<PluginDescriptor>> {
    let manifests = load_manifests(&manifest_paths(config, &settings.manifest_name)).await?;

    let mut addin_dirs: Vec<PathBuf> = manifests.iter().flat_map(|m| m.addin_dirs()).collect();
    addin_dirs.extend(settings.addin_dirs.iter().cloned());
    addin_dirs.push(AddinFinder::workspace_dir(&config.workspace_root));
    let finder = AddinFinder::new(addin_dirs);
    let addins = finder.scan().await?;

    let project = find_plugin_project(&config.workspace_root).await?;

    let mut plugins: Vec<PluginDescriptor> = Vec::new();
    for (loaded, entry) in merged_entries(&manifests) {
        let (path, source) = resolve_entry(loaded, entry, project.as_ref(), &addins, &finder)?;
        plugins.push(PluginDescriptor {
            name: entry.name.clone(),
            signature: file_signature(&path)?,
            path,
            rank: plugins.len(),
            source,
            options: entry.options_json()?,
        });
    }

    if include_unlisted(&manifests, settings) {
        let mut extra: Vec<&Addin> = addins
            .iter()
            .filter(|a| !plugins.iter().any(|p| p.name.eq_ignore_ascii_case(&a.name)))
            .collect();
        extra.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        for addin in extra {
            plugins.push(PluginDescriptor {
                name: addin.name.clone(),
                signature: file_signature(&addin.path)?,
                path: addin.path.clone(),
                rank: plugins.len(),
                source: PluginSource::Addin,
                options: serde_json::Map::new(),
            });
        }
    }

    debug!("Resolved {} plugin(s)", plugins.len());
    Ok(plugins)
}

fn resolve_entry(
    loaded: &LoadedManifest,
    entry: &ManifestEntry,
    project: Option<&PluginProject>,
    addins: &[Addin],
    finder: &AddinFinder,
) -> WeavrResult<(PathBuf, PluginSource)> {
    if let Some(ref explicit) = entry.path {
        let path = loaded.base_dir().join(explicit);
        if path.is_file() {
            return Ok((path, PluginSource::ManifestPath));
        }
        return Err(WeavrError::PluginNotFound {
            name: entry.name.clone(),
            searched: path.display().to_string(),
        });
    }

    if let Some(project) = project.filter(|p| p.name.eq_ignore_ascii_case(&entry.name)) {
        if let Some(ref binary) = project.binary {
            return Ok((binary.clone(), PluginSource::Project));
        }
        debug!(
            "Plugin project '{}' has not been built, falling back to addins",
            project.name
        );
    }

    if let Some(addin) = addins
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(&entry.name))
    {
        return Ok((addin.path.clone(), PluginSource::Addin));
    }

    let mut searched: Vec<String> = finder
        .dirs()
        .iter()
        .map(|d| d.display().to_string())
        .collect();
    if let Some(project) = project {
        searched.push(format!("plugin project {}", project.manifest_path.display()));
    }
    Err(WeavrError::PluginNotFound {
        name: entry.name.clone(),
        searched: searched.join(", "),
    })
}
