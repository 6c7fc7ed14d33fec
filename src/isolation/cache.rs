//! Process-wide isolated context cache
//!
//! Maps workspace keys to live contexts. One mutex guards the whole map, and
//! callers hold it across acquire, execute and release. Runs against
//! different workspaces therefore serialize too; that is the throughput
//! ceiling of this design, not an accident.

use crate::error::{WeavrError, WeavrResult};
use crate::isolation::context::{ContextFactory, IsolatedContext};
use crate::logger::BuildLogger;
use crate::plugin::{identities, same_plugin_set, PluginDescriptor};
use crate::workspace::WorkspaceKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

type ContextMap = HashMap<WorkspaceKey, Box<dyn IsolatedContext>>;

/// Counters for context lifecycle events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Contexts created, including replacements
    pub created: usize,
    /// Contexts replaced because their plugin set went stale
    pub recycled: usize,
    /// Acquisitions served by an existing context
    pub reused: usize,
}

/// Cache of isolated contexts keyed by workspace
pub struct ContextCache {
    factory: Box<dyn ContextFactory>,
    contexts: Mutex<ContextMap>,
    created: AtomicUsize,
    recycled: AtomicUsize,
    reused: AtomicUsize,
}

impl ContextCache {
    pub fn new(factory: Box<dyn ContextFactory>) -> Self {
        Self {
            factory,
            contexts: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
            recycled: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
        }
    }

    /// Enter the critical section; the guard is the only way to reach a context
    pub async fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            cache: self,
            contexts: self.contexts.lock().await,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            created: self.created.load(Ordering::SeqCst),
            recycled: self.recycled.load(Ordering::SeqCst),
            reused: self.reused.load(Ordering::SeqCst),
        }
    }

    /// Unload every cached context
    pub async fn shutdown(&self) {
        let mut contexts = self.contexts.lock().await;
        for (workspace, context) in contexts.drain() {
            if let Err(e) = context.unload().await {
                warn!("Failed to unload context for {}: {}", workspace, e);
            }
        }
    }
}

/// Exclusive access to the cache for one acquire/execute/release sequence
pub struct CacheGuard<'a> {
    cache: &'a ContextCache,
    contexts: MutexGuard<'a, ContextMap>,
}

impl CacheGuard<'_> {
    /// Number of live contexts
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn contains(&self, workspace: &WorkspaceKey) -> bool {
        self.contexts.contains_key(workspace)
    }

    /// Context for `workspace` with exactly `plugins` loaded
    ///
    /// Reuses the cached context when its plugin identities match, otherwise
    /// unloads it and creates a replacement. If creation fails the key is
    /// left empty so the next run can retry.
    pub async fn acquire(
        &mut self,
        workspace: &WorkspaceKey,
        plugins: &[PluginDescriptor],
        logger: &BuildLogger,
    ) -> WeavrResult<&mut dyn IsolatedContext> {
        let wanted = identities(plugins);

        let stale = self
            .contexts
            .get(workspace)
            .is_some_and(|context| !same_plugin_set(context.plugins(), &wanted));

        if stale {
            logger.info("A plugin changed so loading a new isolated context");
            if let Some(old) = self.contexts.remove(workspace) {
                if let Err(e) = old.unload().await {
                    warn!("Failed to unload stale context for {}: {}", workspace, e);
                }
            }
            self.cache.recycled.fetch_add(1, Ordering::SeqCst);
        }

        if self.contexts.contains_key(workspace) {
            debug!("Reusing isolated context for {}", workspace);
            self.cache.reused.fetch_add(1, Ordering::SeqCst);
        } else {
            logger.info(format!("Creating a new isolated context for '{}'", workspace));
            let context = self.cache.factory.create(workspace, plugins).await?;
            info!(
                "Created {} context for {} with {} plugin(s)",
                self.cache.factory.name(),
                workspace,
                plugins.len()
            );
            self.contexts.insert(workspace.clone(), context);
            self.cache.created.fetch_add(1, Ordering::SeqCst);
        }

        match self.contexts.get_mut(workspace) {
            Some(context) => Ok(context.as_mut()),
            None => Err(WeavrError::Internal(format!(
                "context for {} vanished",
                workspace
            ))),
        }
    }

    /// Drop the context for `workspace`, e.g. after it faulted
    pub async fn evict(&mut self, workspace: &WorkspaceKey) {
        if let Some(context) = self.contexts.remove(workspace) {
            debug!("Evicting isolated context for {}", workspace);
            if let Err(e) = context.unload().await {
                warn!("Failed to unload context for {}: {}", workspace, e);
            }
        }
    }
}
