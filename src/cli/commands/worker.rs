//! Worker command - host one isolated context on stdin/stdout

use crate::cli::args::WorkerArgs;
use crate::error::WeavrResult;
use crate::isolation::run_stdio;
use crate::workspace::WorkspaceKey;
use tracing::debug;

/// Execute the hidden worker command
pub async fn execute(args: WorkerArgs) -> WeavrResult<()> {
    debug!("Worker starting for {}", args.workspace.display());
    run_stdio(WorkspaceKey::new(args.workspace)).await
}
