//! Top-level run control
//!
//! One `Orchestrator` per process, shared by every invocation. A run goes
//!
//! ```text
//! Init -> ValidatingPaths -> Gating -> Discovering -> AcquiringContext
//!      -> Executing -> CommittingHistory -> Done
//! ```
//!
//! and may stop early as aborted, skipped, failed or faulted. Gate and
//! discovery run outside the cache lock; acquire and execute run inside it.

mod outcome;

pub use outcome::{RunOutcome, RunSummary, Stage};

use crate::config::schema::DiscoveryConfig;
use crate::discovery::{discover, manifest_paths, manifest_signatures};
use crate::error::{ErrorClass, WeavrError, WeavrResult};
use crate::gate::{GateDecision, StalenessGate};
use crate::history::{file_signature, HistoryRecord, HistoryStore};
use crate::isolation::ContextCache;
use crate::logger::{BuildHost, BuildLogger, Severity, ORIGIN};
use crate::plugin::identities;
use crate::request::RunConfiguration;
use crate::workspace::WorkspaceKey;
use futures_util::FutureExt;
use std::any::Any;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct Orchestrator {
    cache: Arc<ContextCache>,
    history: HistoryStore,
    discovery: DiscoveryConfig,
    host: Arc<dyn BuildHost>,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<ContextCache>,
        history: HistoryStore,
        discovery: DiscoveryConfig,
        host: Arc<dyn BuildHost>,
    ) -> Self {
        Self {
            cache,
            history,
            discovery,
            host,
        }
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Run once; true iff no error was logged
    pub async fn execute(&self, config: RunConfiguration) -> bool {
        self.run(config).await.success
    }

    /// Run once and report how it ended
    ///
    /// Never returns an error and never unwinds: every failure becomes an
    /// error message on the host and an unsuccessful summary. The log is
    /// flushed and the timing line emitted on every path.
    pub async fn run(&self, config: RunConfiguration) -> RunSummary {
        let started = Instant::now();
        self.host.emit(
            Severity::Info,
            &format!("weavr (version {}) executing", env!("CARGO_PKG_VERSION")),
        );

        let logger = BuildLogger::new(config.verbosity, config.debug_logging);
        let result = AssertUnwindSafe(self.run_stages(&config, &logger))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                logger.error(describe(&e));
                match e.class() {
                    ErrorClass::Configuration => RunOutcome::Aborted,
                    ErrorClass::Execution => RunOutcome::Failed,
                    ErrorClass::Fault => RunOutcome::Faulted,
                }
            }
            Err(panic) => {
                logger.error(format!(
                    "Unhandled fault while weaving: {}",
                    panic_message(panic.as_ref())
                ));
                RunOutcome::Faulted
            }
        };

        let success = !logger.error_occurred();
        logger.flush(self.host.as_ref());

        let elapsed = started.elapsed();
        self.host.emit(
            Severity::Info,
            &format!("\tFinished weavr {}ms.", elapsed.as_millis()),
        );
        info!(
            artifact = %config.target_path.display(),
            outcome = %outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Run finished"
        );

        RunSummary {
            outcome,
            success,
            elapsed,
        }
    }

    async fn run_stages(
        &self,
        config: &RunConfiguration,
        logger: &BuildLogger,
    ) -> WeavrResult<RunOutcome> {
        enter(Stage::Init);

        enter(Stage::ValidatingPaths);
        validate_paths(config)?;
        let workspace = WorkspaceKey::new(&config.workspace_root);

        enter(Stage::Gating);
        let gate = StalenessGate::new(&self.history, &self.discovery);
        match gate.evaluate(config, &workspace, logger).await? {
            GateDecision::SkipClean => return Ok(RunOutcome::SkippedClean),
            GateDecision::SkipWarnRebuildNeeded => return Ok(RunOutcome::SkippedWithWarning),
            GateDecision::Run(reason) => debug!("Running because {}", reason),
        }

        enter(Stage::Discovering);
        logger.info("Finding plugins");
        let discovery_started = Instant::now();
        let plugins = discover(config, &self.discovery).await?;
        logger.info(format!(
            "Finished finding plugins {}ms",
            discovery_started.elapsed().as_millis()
        ));
        if plugins.is_empty() {
            return Err(WeavrError::NoPlugins {
                manifest: self.discovery.manifest_name.clone(),
            });
        }
        let manifests =
            manifest_signatures(&manifest_paths(config, &self.discovery.manifest_name))?;

        let report = {
            enter(Stage::AcquiringContext);
            let mut guard = self.cache.lock().await;
            let context = guard.acquire(&workspace, &plugins, logger).await?;

            enter(Stage::Executing);
            let result = context.run(config, &plugins).await;
            match result {
                Ok(report) => report,
                Err(e) => {
                    guard.evict(&workspace).await;
                    return Err(e);
                }
            }
        };

        // an error message fails the run even when the context claims success
        let last_origin = report.messages.last().map(|m| m.origin.clone());
        logger.extend(report.messages);
        if logger.error_occurred() {
            return Ok(RunOutcome::Failed);
        }
        if !report.success {
            return Err(WeavrError::PluginFailed {
                plugin: last_origin.unwrap_or_else(|| ORIGIN.to_string()),
                reason: format!(
                    "weaving {} failed without reporting an error",
                    config.target_path.display()
                ),
            });
        }

        enter(Stage::CommittingHistory);
        let record = HistoryRecord::new(
            &workspace,
            &config.target_path,
            identities(&plugins),
            file_signature(&config.target_path)?,
            manifests,
        );
        if let Err(e) = self.history.save(&record).await {
            logger.warning(format!("Could not record this run: {}", e));
        }

        enter(Stage::Done);
        Ok(RunOutcome::Completed)
    }
}

fn enter(stage: Stage) {
    debug!(stage = %stage, "Entering stage");
}

fn validate_paths(config: &RunConfiguration) -> WeavrResult<()> {
    require_path("target_path", &config.target_path, false)?;
    require_path("workspace_root", &config.workspace_root, true)?;
    if let Some(project) = &config.project_dir {
        require_path("project_dir", project, true)?;
    }
    Ok(())
}

fn require_path(field: &'static str, path: &Path, dir: bool) -> WeavrResult<()> {
    if path.as_os_str().is_empty() {
        return Err(WeavrError::MissingPath { field });
    }
    if !path.is_absolute() {
        return Err(WeavrError::PathInvalid {
            field,
            path: path.to_path_buf(),
            reason: "must be absolute".to_string(),
        });
    }
    if !path.exists() {
        return Err(WeavrError::PathNotFound {
            field,
            path: path.to_path_buf(),
        });
    }
    let kind_ok = if dir { path.is_dir() } else { path.is_file() };
    if !kind_ok {
        return Err(WeavrError::PathInvalid {
            field,
            path: path.to_path_buf(),
            reason: if dir { "not a directory" } else { "not a file" }.to_string(),
        });
    }
    Ok(())
}

/// Error text with every source not already part of it
fn describe(error: &WeavrError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    if let Some(hint) = error.hint() {
        text.push_str(" (");
        text.push_str(hint);
        text.push(')');
    }
    text
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
