//! Runs one plugin executable against a configured artifact

use crate::error::{WeavrError, WeavrResult};
use crate::logger::{LogMessage, Severity};
use crate::plugin::PluginDescriptor;
use crate::request::RunConfiguration;
use async_trait::async_trait;
use serde::Serialize;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

/// Max number of output lines kept in a plugin failure message
const FAILURE_TAIL_LINES: usize = 50;

/// What one plugin produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginOutcome {
    pub success: bool,
    pub messages: Vec<LogMessage>,
}

/// Executes a single plugin inside the isolated context
#[async_trait]
pub trait PluginRunner: Send + Sync {
    async fn run_plugin(
        &self,
        plugin: &PluginDescriptor,
        config: &RunConfiguration,
    ) -> WeavrResult<PluginOutcome>;
}

/// Request written to a plugin's stdin
#[derive(Serialize)]
struct PluginRequest<'a> {
    plugin: &'a str,
    options: &'a serde_json::Map<String, serde_json::Value>,
    config: &'a RunConfiguration,
}

/// Runs plugins as child processes speaking JSON on stdin/stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutablePluginRunner;

#[async_trait]
impl PluginRunner for ExecutablePluginRunner {
    async fn run_plugin(
        &self,
        plugin: &PluginDescriptor,
        config: &RunConfiguration,
    ) -> WeavrResult<PluginOutcome> {
        let command_line = plugin.path.display().to_string();
        debug!("Spawning plugin {} ({})", plugin.name, command_line);

        let mut child = Command::new(&plugin.path)
            .current_dir(&config.workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WeavrError::command_failed(&command_line, e))?;

        let request = serde_json::to_vec(&PluginRequest {
            plugin: &plugin.name,
            options: &plugin.options,
            config,
        })?;
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&request).await {
                Ok(()) => {}
                // plugin exited without reading its request
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => {
                    return Err(WeavrError::io(
                        format!("writing request to {}", plugin.name),
                        e,
                    ))
                }
            }
            // EOF tells the plugin the request is complete
            drop(stdin);
        }

        let (mut messages, output) = collect_output(&mut child, &plugin.name).await?;
        let status = child
            .wait()
            .await
            .map_err(|e| WeavrError::command_failed(&command_line, e))?;

        let reported_error = messages.iter().any(|m| m.severity == Severity::Error);
        if !status.success() {
            let tail = output_tail(&output);
            let mut text = format!("Plugin '{}' exited with {}", plugin.name, status);
            if !tail.is_empty() {
                text.push_str(":\n");
                text.push_str(&tail);
            }
            messages.push(LogMessage::new(Severity::Error, text, plugin.name.as_str()));
        }

        Ok(PluginOutcome {
            success: status.success() && !reported_error,
            messages,
        })
    }
}

/// Drain stdout and stderr concurrently
///
/// Stdout lines that parse as a log message keep their severity; other
/// stdout lines become info and stderr lines become trace. Every raw line is
/// also returned for failure diagnostics.
async fn collect_output(
    child: &mut Child,
    origin: &str,
) -> WeavrResult<(Vec<LogMessage>, Vec<String>)> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| WeavrError::Internal("plugin stdout not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| WeavrError::Internal("plugin stderr not piped".to_string()))?;

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();

    let mut messages = Vec::new();
    let mut raw = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(message) = parse_stdout_line(&line, origin) {
                            messages.push(message);
                        }
                        raw.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        messages.push(LogMessage::new(Severity::Trace, line.clone(), origin));
                        raw.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
        }
    }

    Ok((messages, raw))
}

fn parse_stdout_line(line: &str, origin: &str) -> Option<LogMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<LogMessage>(trimmed) {
        Ok(mut message) => {
            message.origin = origin.to_string();
            Some(message)
        }
        Err(_) => Some(LogMessage::new(Severity::Info, trimmed, origin)),
    }
}

/// Last `FAILURE_TAIL_LINES` lines of combined output
fn output_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
    lines[start..].join("\n")
}
