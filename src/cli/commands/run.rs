//! Run command - weave one or more build artifacts

use crate::cli::args::RunArgs;
use crate::cli::host::ConsoleHost;
use crate::config::Config;
use crate::error::{WeavrError, WeavrResult};
use crate::history::HistoryStore;
use crate::isolation::{ContextCache, WorkerProcessFactory};
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::request::RunConfiguration;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> WeavrResult<()> {
    let cwd = std::env::current_dir().map_err(|e| WeavrError::io("getting current directory", e))?;
    let requests = build_requests(&args, config, &cwd);

    let factory = WorkerProcessFactory::from_config(&config.worker)?;
    let cache = Arc::new(ContextCache::new(Box::new(factory)));
    let history = HistoryStore::new(
        config
            .history
            .dir
            .clone()
            .unwrap_or_else(HistoryStore::default_dir),
    );
    let orchestrator = Orchestrator::new(
        Arc::clone(&cache),
        history,
        config.discovery.clone(),
        Arc::new(ConsoleHost),
    );

    debug!("Weaving {} target(s)", requests.len());
    let summaries: Vec<RunSummary> =
        join_all(requests.into_iter().map(|request| orchestrator.run(request))).await;

    cache.shutdown().await;

    let failed = summaries.iter().filter(|s| !s.success).count();
    if failed > 0 {
        return Err(WeavrError::User(format!(
            "{} of {} target(s) failed to weave",
            failed,
            summaries.len()
        )));
    }
    Ok(())
}

/// One run configuration per target, paths made absolute against `cwd`
fn build_requests(args: &RunArgs, config: &Config, cwd: &Path) -> Vec<RunConfiguration> {
    let workspace = args
        .workspace
        .as_deref()
        .map(|p| absolute(cwd, p))
        .unwrap_or_else(|| cwd.to_path_buf());

    args.targets
        .iter()
        .map(|target| RunConfiguration {
            target_path: absolute(cwd, target),
            workspace_root: workspace.clone(),
            project_dir: args.project.as_deref().map(|p| absolute(cwd, p)),
            references: args.references.iter().map(|p| absolute(cwd, p)).collect(),
            copy_local_references: args.copy_local.iter().map(|p| absolute(cwd, p)).collect(),
            intermediate_dir: args.intermediate_dir.as_deref().map(|p| absolute(cwd, p)),
            key_file: args.key_file.as_deref().map(|p| absolute(cwd, p)),
            sign: args.sign,
            define_constants: args
                .defines
                .iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
            verbosity: args.verbosity.unwrap_or(config.general.verbosity),
            debug_logging: args.debug || config.general.debug_logging,
        })
        .collect()
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
