//! Addin directory scanning
//!
//! An addin is an executable named `<name>-weaver` (`<name>-weaver.exe` on
//! Windows) placed directly in an addin directory or one level below it.
//! Directories that do not exist are skipped; manifests commonly point at
//! optional locations.

use crate::error::{WeavrError, WeavrResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name suffix identifying a plugin binary
pub const ADDIN_SUFFIX: &str = "-weaver";

/// A plugin binary found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addin {
    pub name: String,
    pub path: PathBuf,
}

/// Scans addin directories in priority order
#[derive(Debug, Clone, Default)]
pub struct AddinFinder {
    dirs: Vec<PathBuf>,
}

impl AddinFinder {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        Self { dirs: unique }
    }

    /// Workspace-level addin directory
    pub fn workspace_dir(workspace: &Path) -> PathBuf {
        workspace.join(".weavr").join("addins")
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Find all addins; the first directory to provide a name wins
    pub async fn scan(&self) -> WeavrResult<Vec<Addin>> {
        let mut found: Vec<Addin> = Vec::new();

        for dir in &self.dirs {
            if !dir.is_dir() {
                debug!("Skipping missing addin directory {}", dir.display());
                continue;
            }

            let mut candidates = list_dir(dir).await?;
            let mut nested = Vec::new();
            for path in &candidates {
                if path.is_dir() {
                    nested.extend(list_dir(path).await?);
                }
            }
            candidates.extend(nested);

            for path in candidates {
                let Some(name) = addin_name(&path) else {
                    continue;
                };
                if found.iter().any(|a| a.name.eq_ignore_ascii_case(&name)) {
                    debug!("Ignoring shadowed addin {}", path.display());
                    continue;
                }
                debug!("Found addin {} at {}", name, path.display());
                found.push(Addin { name, path });
            }
        }

        Ok(found)
    }
}

/// Sorted entries of a directory
async fn list_dir(dir: &Path) -> WeavrResult<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| WeavrError::io(format!("reading addin directory {}", dir.display()), e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| WeavrError::io(format!("reading addin directory {}", dir.display()), e))?
    {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Plugin name for a binary path, if it follows the addin naming scheme
pub fn addin_name(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name
        .strip_suffix(".exe")
        .or_else(|| file_name.strip_suffix(".EXE"))
        .unwrap_or(file_name);
    let name = stem.strip_suffix(ADDIN_SUFFIX)?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"#!/bin/sh\n").unwrap();
    }

    #[test]
    fn addin_name_parsing() {
        let dir = TempDir::new().unwrap();
        let weaver = dir.path().join("Tracer-weaver");
        let exe = dir.path().join("Null-weaver.exe");
        let other = dir.path().join("readme.txt");
        let bare = dir.path().join("-weaver");
        for p in [&weaver, &exe, &other, &bare] {
            touch(p);
        }

        assert_eq!(addin_name(&weaver), Some("Tracer".to_string()));
        assert_eq!(addin_name(&exe), Some("Null".to_string()));
        assert_eq!(addin_name(&other), None);
        assert_eq!(addin_name(&bare), None);
        assert_eq!(addin_name(dir.path()), None);
    }

    #[tokio::test]
    async fn scan_skips_missing_dirs() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("addins").join("A-weaver"));

        let finder = AddinFinder::new(vec![
            dir.path().join("does-not-exist"),
            dir.path().join("addins"),
        ]);
        let addins = finder.scan().await.unwrap();

        assert_eq!(addins.len(), 1);
        assert_eq!(addins[0].name, "A");
    }

    #[tokio::test]
    async fn scan_finds_nested_packages() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("addins").join("pkg-b").join("B-weaver"));

        let finder = AddinFinder::new(vec![dir.path().join("addins")]);
        let addins = finder.scan().await.unwrap();

        assert_eq!(addins.len(), 1);
        assert_eq!(addins[0].name, "B");
    }

    #[tokio::test]
    async fn earlier_directory_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first").join("A-weaver");
        touch(&first);
        touch(&dir.path().join("second").join("a-weaver"));

        let finder = AddinFinder::new(vec![dir.path().join("first"), dir.path().join("second")]);
        let addins = finder.scan().await.unwrap();

        assert_eq!(addins.len(), 1);
        assert_eq!(addins[0].path, first);
    }

    #[test]
    fn duplicate_dirs_collapsed() {
        let finder = AddinFinder::new(vec![PathBuf::from("/a"), PathBuf::from("/a")]);
        assert_eq!(finder.dirs().len(), 1);
    }
}
