//! History record persistence
//!
//! One JSON file per (workspace, target) pair under the history directory.
//! Records are only ever written after a successful run.

use crate::config::ConfigManager;
use crate::error::{WeavrError, WeavrResult};
use crate::plugin::{same_plugin_set, PluginIdentity};
use crate::workspace::WorkspaceKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// What the last successful run saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Workspace root as given on that run
    pub workspace: PathBuf,

    /// Target artifact
    pub target: PathBuf,

    /// Plugins used, in execution order
    pub plugins: Vec<PluginIdentity>,

    /// Signature of the target artifact after the run
    pub artifact_signature: String,

    /// Signatures of the manifests that existed at the time
    #[serde(default)]
    pub manifests: BTreeMap<PathBuf, String>,

    /// When the record was written
    pub updated_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(
        workspace: &WorkspaceKey,
        target: &Path,
        plugins: Vec<PluginIdentity>,
        artifact_signature: String,
        manifests: BTreeMap<PathBuf, String>,
    ) -> Self {
        Self {
            workspace: workspace.root().to_path_buf(),
            target: target.to_path_buf(),
            plugins,
            artifact_signature,
            manifests,
            updated_at: Utc::now(),
        }
    }

    /// Whether `plugins` differs from the recorded set
    pub fn plugins_changed(&self, plugins: &[PluginIdentity]) -> bool {
        !same_plugin_set(&self.plugins, plugins)
    }
}

/// File-backed history store
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location under the weavr state directory
    pub fn default_dir() -> PathBuf {
        ConfigManager::state_dir().join("history")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record file for a workspace/target pair
    pub fn record_path(&self, workspace: &WorkspaceKey, target: &Path) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(workspace.normalized().as_bytes());
        hasher.update([0u8]);
        hasher.update(target.to_string_lossy().as_bytes());
        let digest = hasher.finalize();
        self.dir.join(format!("{}.json", hex::encode(&digest[..8])))
    }

    /// Load the record for a workspace/target pair
    ///
    /// A corrupt record is treated as absent so the next run rebuilds it.
    pub async fn load(
        &self,
        workspace: &WorkspaceKey,
        target: &Path,
    ) -> WeavrResult<Option<HistoryRecord>> {
        let path = self.record_path(workspace, target);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| WeavrError::io(format!("reading history file {}", path.display()), e))?;

        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Ignoring unreadable history record {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Persist a record, replacing any previous one atomically
    pub async fn save(&self, record: &HistoryRecord) -> WeavrResult<()> {
        let workspace = WorkspaceKey::new(&record.workspace);
        let path = self.record_path(&workspace, &record.target);

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| WeavrError::io("creating history directory", e))?;

        let content = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, content)
            .await
            .map_err(|e| WeavrError::HistoryPersist {
                path: tmp.clone(),
                reason: e.to_string(),
            })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| WeavrError::HistoryPersist {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            "Recorded {} plugin(s) for {}",
            record.plugins.len(),
            record.target.display()
        );
        Ok(())
    }

    /// Whether `plugins` differs from the last successful run
    ///
    /// No record at all counts as changed.
    pub async fn has_changed(
        &self,
        workspace: &WorkspaceKey,
        target: &Path,
        plugins: &[PluginIdentity],
    ) -> WeavrResult<bool> {
        Ok(match self.load(workspace, target).await? {
            Some(record) => record.plugins_changed(plugins),
            None => true,
        })
    }

    /// List all records, newest first
    pub async fn list(&self) -> WeavrResult<Vec<HistoryRecord>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut records = vec![];
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| WeavrError::io("reading history directory", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WeavrError::io("reading history entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path).await.ok();
                if let Some(content) = content {
                    if let Ok(record) = serde_json::from_str::<HistoryRecord>(&content) {
                        records.push(record);
                    }
                }
            }
        }

        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    /// Delete every record, returning how many were removed
    pub async fn clear(&self) -> WeavrResult<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| WeavrError::io("reading history directory", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WeavrError::io("reading history entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path).await.map_err(|e| {
                    WeavrError::io(format!("deleting history file {}", path.display()), e)
                })?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity(name: &str, sig: &str) -> PluginIdentity {
        PluginIdentity {
            name: name.to_string(),
            path: PathBuf::from(format!("/addins/{}-weaver", name)),
            signature: sig.to_string(),
        }
    }

    fn record(workspace: &WorkspaceKey, plugins: Vec<PluginIdentity>) -> HistoryRecord {
        HistoryRecord::new(
            workspace,
            Path::new("/work/app/target/app"),
            plugins,
            "artifact".to_string(),
            BTreeMap::new(),
        )
    }

    #[tokio::test]
    async fn load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let ws = WorkspaceKey::new("/work");

        let loaded = store.load(&ws, Path::new("/work/app")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let ws = WorkspaceKey::new("/work");
        let rec = record(&ws, vec![identity("a", "1")]);

        store.save(&rec).await.unwrap();
        let loaded = store.load(&ws, &rec.target).await.unwrap().unwrap();

        assert_eq!(loaded.plugins, rec.plugins);
        assert_eq!(loaded.artifact_signature, "artifact");
    }

    #[tokio::test]
    async fn workspace_lookup_ignores_case() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let rec = record(&WorkspaceKey::new("/Work"), vec![identity("a", "1")]);
        store.save(&rec).await.unwrap();

        let loaded = store
            .load(&WorkspaceKey::new("/work"), &rec.target)
            .await
            .unwrap();
        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn has_changed_compares_sets() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let ws = WorkspaceKey::new("/work");
        let rec = record(&ws, vec![identity("a", "1"), identity("b", "2")]);
        store.save(&rec).await.unwrap();

        let same = vec![identity("b", "2"), identity("a", "1")];
        assert!(!store.has_changed(&ws, &rec.target, &same).await.unwrap());

        let rebuilt = vec![identity("a", "1"), identity("b", "3")];
        assert!(store.has_changed(&ws, &rec.target, &rebuilt).await.unwrap());

        let other_target = Path::new("/work/other");
        assert!(store.has_changed(&ws, other_target, &same).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_saves_of_one_record_succeed() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let ws = WorkspaceKey::new("/work");
        let rec = record(&ws, vec![identity("a", "1")]);

        let saves = (0..8).map(|_| store.save(&rec));
        for result in futures_util::future::join_all(saves).await {
            result.unwrap();
        }

        assert!(store.load(&ws, &rec.target).await.unwrap().is_some());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_record_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let ws = WorkspaceKey::new("/work");
        let target = Path::new("/work/app");
        std::fs::write(store.record_path(&ws, target), "not json").unwrap();

        assert!(store.load(&ws, target).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history"));
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.clear().await.unwrap(), 0);

        let mut first = record(&WorkspaceKey::new("/one"), vec![identity("a", "1")]);
        first.target = PathBuf::from("/one/app");
        let mut second = record(&WorkspaceKey::new("/two"), vec![identity("b", "1")]);
        second.target = PathBuf::from("/two/app");
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 2);
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.list().await.unwrap().is_empty());
    }
}
