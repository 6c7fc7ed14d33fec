//! Worker side of an isolated context
//!
//! `weavr worker` runs this loop on its stdin/stdout. The worker owns the
//! loaded plugin set for its lifetime; it never reloads, the host replaces
//! the whole process instead.

use crate::error::{WeavrError, WeavrResult};
use crate::history::file_signature_if_exists;
use crate::isolation::protocol::{read_message, write_message, HostMessage, WorkerMessage};
use crate::isolation::runner::{ExecutablePluginRunner, PluginRunner};
use crate::logger::{LogMessage, Severity};
use crate::plugin::{identities, same_plugin_set, PluginDescriptor, PluginIdentity};
use crate::request::RunConfiguration;
use crate::workspace::WorkspaceKey;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, info};
use uuid::Uuid;

pub struct Worker<R> {
    workspace: WorkspaceKey,
    runner: R,
    loaded: Option<Vec<PluginIdentity>>,
}

impl<R: PluginRunner> Worker<R> {
    pub fn new(workspace: WorkspaceKey, runner: R) -> Self {
        Self {
            workspace,
            runner,
            loaded: None,
        }
    }

    /// Answer host messages until `shutdown` or end of input
    pub async fn serve<I, O>(&mut self, mut input: I, mut output: O) -> WeavrResult<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        while let Some(message) = read_message::<_, HostMessage>(&mut input).await? {
            match message {
                HostMessage::Load { workspace, plugins } => {
                    let reply = self.load(&workspace, &plugins);
                    write_message(&mut output, &reply).await?;
                }
                HostMessage::Run {
                    id,
                    config,
                    plugins,
                } => {
                    self.run(id, &config, &plugins, &mut output).await?;
                }
                HostMessage::Shutdown => {
                    debug!("Worker for {} shutting down", self.workspace);
                    break;
                }
            }
        }
        Ok(())
    }

    fn load(&mut self, workspace: &Path, plugins: &[PluginDescriptor]) -> WorkerMessage {
        if self.loaded.is_some() {
            return WorkerMessage::Failed {
                reason: "plugins are already loaded".to_string(),
            };
        }
        if WorkspaceKey::new(workspace) != self.workspace {
            return WorkerMessage::Failed {
                reason: format!(
                    "worker serves '{}', not '{}'",
                    self.workspace,
                    workspace.display()
                ),
            };
        }

        for plugin in plugins {
            match file_signature_if_exists(&plugin.path) {
                Ok(Some(signature)) if signature == plugin.signature => {}
                Ok(Some(_)) => {
                    return WorkerMessage::Failed {
                        reason: format!(
                            "plugin '{}' changed on disk since discovery",
                            plugin.name
                        ),
                    }
                }
                Ok(None) => {
                    return WorkerMessage::Failed {
                        reason: format!(
                            "plugin '{}' not found at {}",
                            plugin.name,
                            plugin.path.display()
                        ),
                    }
                }
                Err(e) => {
                    return WorkerMessage::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }

        info!("Loaded {} plugin(s) for {}", plugins.len(), self.workspace);
        self.loaded = Some(identities(plugins));
        WorkerMessage::Loaded {
            count: plugins.len(),
        }
    }

    async fn run<O>(
        &self,
        id: Uuid,
        config: &RunConfiguration,
        plugins: &[PluginDescriptor],
        output: &mut O,
    ) -> WeavrResult<()>
    where
        O: AsyncWrite + Unpin,
    {
        let Some(loaded) = &self.loaded else {
            let reply = WorkerMessage::Failed {
                reason: "run requested before plugins were loaded".to_string(),
            };
            return write_message(output, &reply).await;
        };
        if !same_plugin_set(loaded, &identities(plugins)) {
            let reply = WorkerMessage::Failed {
                reason: "run requested with a plugin set this context did not load".to_string(),
            };
            return write_message(output, &reply).await;
        }

        let mut ordered: Vec<&PluginDescriptor> = plugins.iter().collect();
        ordered.sort_by_key(|p| p.rank);

        let mut success = true;
        for plugin in ordered {
            debug!("Running plugin {} on {}", plugin.name, config.target_path.display());
            let outcome = match self.runner.run_plugin(plugin, config).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let failure = WeavrError::PluginFailed {
                        plugin: plugin.name.clone(),
                        reason: e.to_string(),
                    };
                    let message = LogMessage::new(
                        Severity::Error,
                        failure.to_string(),
                        plugin.name.as_str(),
                    );
                    write_message(output, &WorkerMessage::Log { id, message }).await?;
                    success = false;
                    break;
                }
            };

            for message in outcome.messages {
                write_message(output, &WorkerMessage::Log { id, message }).await?;
            }
            if !outcome.success {
                success = false;
                break;
            }
        }

        write_message(output, &WorkerMessage::Finished { id, success }).await
    }
}

/// Serve the protocol on this process's stdin/stdout
pub async fn run_stdio(workspace: WorkspaceKey) -> WeavrResult<()> {
    let mut worker = Worker::new(workspace, ExecutablePluginRunner);
    worker
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
