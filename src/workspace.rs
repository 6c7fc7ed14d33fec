//! Workspace identity

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Workspace root used as the isolated context cache key
///
/// Equality and hashing ignore ASCII case and trailing separators, so
/// `C:\Src\App\` and `c:\src\app` name the same workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceKey {
    root: PathBuf,
    normalized: String,
}

impl WorkspaceKey {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let normalized = normalize(&root);
        Self { root, normalized }
    }

    /// The path as given by the caller
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Case-folded form used for comparisons
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

fn normalize(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let trimmed = text.trim_end_matches('/');
    let trimmed = if trimmed.is_empty() && !text.is_empty() {
        "/"
    } else {
        trimmed
    };
    trimmed.to_ascii_lowercase()
}

impl PartialEq for WorkspaceKey {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for WorkspaceKey {}

impl Hash for WorkspaceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn case_insensitive_equality() {
        assert_eq!(WorkspaceKey::new("/Src/App"), WorkspaceKey::new("/src/app"));
        assert_ne!(WorkspaceKey::new("/src/app"), WorkspaceKey::new("/src/other"));
    }

    #[test]
    fn trailing_separator_ignored() {
        assert_eq!(WorkspaceKey::new("/src/app/"), WorkspaceKey::new("/src/app"));
        assert_eq!(WorkspaceKey::new("C:\\Src\\App\\"), WorkspaceKey::new("c:/src/app"));
    }

    #[test]
    fn root_is_preserved() {
        let key = WorkspaceKey::new("/Src/App");
        assert_eq!(key.root(), Path::new("/Src/App"));
        assert_eq!(key.normalized(), "/src/app");
    }

    #[test]
    fn usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(WorkspaceKey::new("/Work"), 1);
        map.insert(WorkspaceKey::new("/work"), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&WorkspaceKey::new("/WORK")), Some(&2));
    }
}
