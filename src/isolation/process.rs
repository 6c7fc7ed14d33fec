//! Worker-process isolated contexts
//!
//! Each context is a child `weavr worker` process. Plugins are loaded once
//! when the process starts; replacing the plugin set means a new process.

use crate::config::schema::WorkerConfig;
use crate::error::{WeavrError, WeavrResult};
use crate::isolation::context::{ContextFactory, IsolatedContext, RunReport};
use crate::isolation::protocol::{read_message, write_message, HostMessage, WorkerMessage};
use crate::plugin::{identities, PluginDescriptor, PluginIdentity};
use crate::request::RunConfiguration;
use crate::workspace::WorkspaceKey;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};
use uuid::Uuid;

/// Spawns `weavr worker` processes
#[derive(Debug, Clone)]
pub struct WorkerProcessFactory {
    program: PathBuf,
    args: Vec<String>,
}

impl WorkerProcessFactory {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Use the configured worker program, or this executable
    pub fn from_config(config: &WorkerConfig) -> WeavrResult<Self> {
        let program = match &config.program {
            Some(program) => program.clone(),
            None => std::env::current_exe()
                .map_err(|e| WeavrError::io("locating the weavr executable", e))?,
        };
        Ok(Self::new(program, config.args.clone()))
    }

    fn command(&self, workspace: &WorkspaceKey) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("worker")
            .arg("--workspace")
            .arg(workspace.root())
            .current_dir(workspace.root())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ContextFactory for WorkerProcessFactory {
    async fn create(
        &self,
        workspace: &WorkspaceKey,
        plugins: &[PluginDescriptor],
    ) -> WeavrResult<Box<dyn IsolatedContext>> {
        let start_error = |reason: String| WeavrError::ContextStart {
            workspace: workspace.to_string(),
            reason,
        };

        let mut child = self
            .command(workspace)
            .spawn()
            .map_err(|e| start_error(format!("{}: {}", self.program.display(), e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| start_error("worker stdin not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| start_error("worker stdout not piped".to_string()))?;

        let mut context = WorkerProcessContext {
            workspace: workspace.clone(),
            plugins: identities(plugins),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let load = HostMessage::Load {
            workspace: workspace.root().to_path_buf(),
            plugins: plugins.to_vec(),
        };
        write_message(&mut context.stdin, &load)
            .await
            .map_err(|e| start_error(e.to_string()))?;

        match read_message::<_, WorkerMessage>(&mut context.stdout).await {
            Ok(Some(WorkerMessage::Loaded { count })) => {
                debug!(
                    "Worker {:?} loaded {} plugin(s) for {}",
                    context.child.id(),
                    count,
                    workspace
                );
                Ok(Box::new(context))
            }
            Ok(Some(WorkerMessage::Failed { reason })) => Err(start_error(reason)),
            Ok(Some(other)) => Err(start_error(format!("unexpected reply {:?}", other))),
            Ok(None) => Err(start_error("worker exited during load".to_string())),
            Err(e) => Err(start_error(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "worker process"
    }
}

/// A live worker process and its pipes
pub struct WorkerProcessContext {
    workspace: WorkspaceKey,
    plugins: Vec<PluginIdentity>,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

#[async_trait]
impl IsolatedContext for WorkerProcessContext {
    fn plugins(&self) -> &[PluginIdentity] {
        &self.plugins
    }

    async fn run(
        &mut self,
        config: &RunConfiguration,
        plugins: &[PluginDescriptor],
    ) -> WeavrResult<RunReport> {
        let id = Uuid::new_v4();
        let request = HostMessage::Run {
            id,
            config: config.clone(),
            plugins: plugins.to_vec(),
        };
        write_message(&mut self.stdin, &request).await?;

        let mut messages = Vec::new();
        loop {
            let reply = read_message::<_, WorkerMessage>(&mut self.stdout)
                .await?
                .ok_or_else(|| {
                    WeavrError::ContextExited(format!(
                        "worker for {} exited during run {}",
                        self.workspace, id
                    ))
                })?;

            match reply {
                WorkerMessage::Log { id: got, message } if got == id => messages.push(message),
                WorkerMessage::Finished { id: got, success } if got == id => {
                    return Ok(RunReport { success, messages });
                }
                WorkerMessage::Failed { reason } => {
                    return Err(WeavrError::Protocol(format!(
                        "worker rejected run: {}",
                        reason
                    )));
                }
                other => {
                    return Err(WeavrError::Protocol(format!(
                        "unexpected reply to run {}: {:?}",
                        id, other
                    )));
                }
            }
        }
    }

    async fn unload(mut self: Box<Self>) -> WeavrResult<()> {
        if let Err(e) = write_message(&mut self.stdin, &HostMessage::Shutdown).await {
            warn!("Worker for {} did not take shutdown: {}", self.workspace, e);
            self.child
                .kill()
                .await
                .map_err(|e| WeavrError::io("killing worker", e))?;
            return Ok(());
        }

        let Self { mut child, stdin, .. } = *self;
        drop(stdin);
        let status = child
            .wait()
            .await
            .map_err(|e| WeavrError::io("waiting for worker to exit", e))?;
        debug!("Worker exited with {}", status);
        Ok(())
    }
}
