//! Run configuration handed from the build to the orchestrator

use crate::logger::Verbosity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one weaving run needs to know about the build
///
/// Serialized as-is into the isolated worker and on to each plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    /// Artifact the plugins transform in place
    pub target_path: PathBuf,

    /// Workspace root; keys the isolated context cache
    pub workspace_root: PathBuf,

    /// Project directory holding the project-level manifest
    pub project_dir: Option<PathBuf>,

    /// Reference paths the artifact was built against
    pub references: Vec<PathBuf>,

    /// References copied next to the artifact
    pub copy_local_references: Vec<PathBuf>,

    /// Intermediate (obj) directory of the build
    pub intermediate_dir: Option<PathBuf>,

    /// Key used to re-sign the artifact
    pub key_file: Option<PathBuf>,

    /// Whether the artifact is signed after weaving
    pub sign: bool,

    /// Preprocessor symbols defined for the build
    pub define_constants: Vec<String>,

    /// Minimum importance forwarded to the build host
    pub verbosity: Verbosity,

    /// Forward trace messages regardless of verbosity
    pub debug_logging: bool,
}

impl RunConfiguration {
    pub fn new(target_path: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
            workspace_root: workspace_root.into(),
            ..Default::default()
        }
    }

    /// Directory searched for the project-level manifest
    pub fn project_dir(&self) -> &Path {
        self.project_dir.as_deref().unwrap_or(&self.workspace_root)
    }
}
