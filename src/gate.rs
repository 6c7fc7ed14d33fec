//! Staleness gate
//!
//! Decides before discovery whether a run is needed at all. Signals, in
//! order:
//!
//! | Signal | Changed means |
//! |--------|---------------|
//! | No history record | run |
//! | Target artifact signature | run |
//! | Manifest signatures | run (configuration changed the plugin set) |
//! | Listed plugins vs. recorded plugins | skip, but warn that a rebuild is needed |
//!
//! The plugin check only reads manifests and re-hashes the recorded binaries;
//! it never scans addin directories and never touches an isolated context.

use crate::config::schema::DiscoveryConfig;
use crate::discovery::{listed_plugins, manifest_paths, manifest_signatures, ListedPlugins};
use crate::error::WeavrResult;
use crate::history::{file_signature, file_signature_if_exists, HistoryRecord, HistoryStore};
use crate::logger::BuildLogger;
use crate::request::RunConfiguration;
use crate::workspace::WorkspaceKey;
use std::fmt;
use tracing::debug;

/// Warning logged when the artifact is up to date but its plugins are not
pub const REBUILD_WARNING: &str = "A rebuild is required because a plugin changed";

/// Why a run was not skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReason {
    NoHistory,
    ArtifactChanged,
    ManifestChanged,
}

impl fmt::Display for RunReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHistory => write!(f, "no previous successful run"),
            Self::ArtifactChanged => write!(f, "target artifact changed"),
            Self::ManifestChanged => write!(f, "plugin manifest changed"),
        }
    }
}

/// Outcome of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run(RunReason),
    SkipClean,
    SkipWarnRebuildNeeded,
}

impl GateDecision {
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::Run(_))
    }
}

/// Cheap pre-check against the history store
pub struct StalenessGate<'a> {
    history: &'a HistoryStore,
    settings: &'a DiscoveryConfig,
}

impl<'a> StalenessGate<'a> {
    pub fn new(history: &'a HistoryStore, settings: &'a DiscoveryConfig) -> Self {
        Self { history, settings }
    }

    pub async fn evaluate(
        &self,
        config: &RunConfiguration,
        workspace: &WorkspaceKey,
        logger: &BuildLogger,
    ) -> WeavrResult<GateDecision> {
        let Some(record) = self.history.load(workspace, &config.target_path).await? else {
            return Ok(GateDecision::Run(RunReason::NoHistory));
        };

        if file_signature(&config.target_path)? != record.artifact_signature {
            return Ok(GateDecision::Run(RunReason::ArtifactChanged));
        }

        let manifests =
            manifest_signatures(&manifest_paths(config, &self.settings.manifest_name))?;
        if manifests != record.manifests {
            debug!("Manifest changed since last run, running full discovery");
            return Ok(GateDecision::Run(RunReason::ManifestChanged));
        }

        let listed = listed_plugins(config, self.settings).await?;
        if plugins_drifted(&record, &listed)? {
            logger.warning(REBUILD_WARNING);
            return Ok(GateDecision::SkipWarnRebuildNeeded);
        }

        debug!(
            "{} is up to date, skipping",
            config.target_path.display()
        );
        Ok(GateDecision::SkipClean)
    }
}

/// Identity-only comparison of the listed plugins against the record
fn plugins_drifted(record: &HistoryRecord, listed: &ListedPlugins) -> WeavrResult<bool> {
    let recorded = |name: &str| {
        record
            .plugins
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name))
    };

    if let Some(missing) = listed.names.iter().find(|name| !recorded(name)) {
        debug!("Plugin '{}' is listed but was not part of the last run", missing);
        return Ok(true);
    }

    if !listed.include_unlisted && record.plugins.len() != listed.names.len() {
        debug!("A recorded plugin is no longer listed");
        return Ok(true);
    }

    for plugin in &record.plugins {
        match file_signature_if_exists(&plugin.path)? {
            Some(signature) if signature == plugin.signature => {}
            _ => {
                debug!("Plugin binary {} changed", plugin.path.display());
                return Ok(true);
            }
        }
    }

    Ok(false)
}
