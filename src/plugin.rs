//! Plugin descriptors and identities

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a plugin binary was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginSource {
    /// Explicit `path` in a manifest entry
    ManifestPath,
    /// Built binary of the in-workspace plugin project
    Project,
    /// Found by scanning an addin directory
    Addin,
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestPath => write!(f, "manifest"),
            Self::Project => write!(f, "project"),
            Self::Addin => write!(f, "addin"),
        }
    }
}

/// A plugin resolved for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub path: PathBuf,
    /// Execution order, lowest first
    pub rank: usize,
    /// Content signature of the binary at discovery time
    pub signature: String,
    pub source: PluginSource,
    /// Free-form options from the manifest entry
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl PluginDescriptor {
    pub fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            name: self.name.clone(),
            path: self.path.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// What makes two plugin binaries "the same": path plus content signature
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub name: String,
    pub path: PathBuf,
    pub signature: String,
}

impl PluginIdentity {
    fn key(&self) -> (&Path, &str) {
        (self.path.as_path(), self.signature.as_str())
    }
}

impl fmt::Display for PluginIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}@{})", self.name, self.path.display(), self.signature)
    }
}

/// Identities of an ordered descriptor list
pub fn identities(plugins: &[PluginDescriptor]) -> Vec<PluginIdentity> {
    plugins.iter().map(PluginDescriptor::identity).collect()
}

/// Order-insensitive comparison on (path, signature)
pub fn same_plugin_set(a: &[PluginIdentity], b: &[PluginIdentity]) -> bool {
    let left: BTreeSet<_> = a.iter().map(PluginIdentity::key).collect();
    let right: BTreeSet<_> = b.iter().map(PluginIdentity::key).collect();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str, sig: &str) -> PluginIdentity {
        PluginIdentity {
            name: name.to_string(),
            path: PathBuf::from(format!("/addins/{}-weaver", name)),
            signature: sig.to_string(),
        }
    }

    #[test]
    fn order_does_not_matter() {
        let a = vec![id("a", "1"), id("b", "2")];
        let b = vec![id("b", "2"), id("a", "1")];
        assert!(same_plugin_set(&a, &b));
    }

    #[test]
    fn signature_change_at_same_path_differs() {
        let a = vec![id("a", "1")];
        let b = vec![id("a", "2")];
        assert!(!same_plugin_set(&a, &b));
    }

    #[test]
    fn added_plugin_differs() {
        let a = vec![id("a", "1")];
        let b = vec![id("a", "1"), id("b", "2")];
        assert!(!same_plugin_set(&a, &b));
    }
}
