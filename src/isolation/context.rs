//! Isolated context abstraction
//!
//! An isolated context hosts one loaded plugin set and runs transformation
//! requests against it. Contexts are never patched: a changed plugin set means
//! unloading the context and creating a new one.

use crate::error::WeavrResult;
use crate::logger::LogMessage;
use crate::plugin::{PluginDescriptor, PluginIdentity};
use crate::request::RunConfiguration;
use crate::workspace::WorkspaceKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of one run inside a context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    pub messages: Vec<LogMessage>,
}

/// A live execution environment with loaded plugins
#[async_trait]
pub trait IsolatedContext: Send {
    /// Identities of the plugins loaded when the context was created
    fn plugins(&self) -> &[PluginIdentity];

    /// Run the plugins, in rank order, against the configured artifact
    async fn run(
        &mut self,
        config: &RunConfiguration,
        plugins: &[PluginDescriptor],
    ) -> WeavrResult<RunReport>;

    /// Tear the context down, releasing everything it loaded
    async fn unload(self: Box<Self>) -> WeavrResult<()>;
}

/// Creates isolated contexts
///
/// Implementations decide what isolation means: the default spawns a worker
/// process; tests use in-process fakes.
#[async_trait]
pub trait ContextFactory: Send + Sync {
    /// Create a context with `plugins` loaded
    async fn create(
        &self,
        workspace: &WorkspaceKey,
        plugins: &[PluginDescriptor],
    ) -> WeavrResult<Box<dyn IsolatedContext>>;

    /// Human-readable name for diagnostics
    fn name(&self) -> &'static str;
}
