//! Wire protocol between the orchestrator and a worker process
//!
//! Newline-delimited JSON. The host sends `load` once, then any number of
//! `run` requests, then `shutdown`. The worker answers `load` with `loaded`
//! (or `failed`) and each `run` with zero or more `log` lines followed by
//! `finished`, all tagged with the run's id.

use crate::error::{WeavrError, WeavrResult};
use crate::logger::LogMessage;
use crate::plugin::PluginDescriptor;
use crate::request::RunConfiguration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Host → worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Load {
        workspace: PathBuf,
        plugins: Vec<PluginDescriptor>,
    },
    Run {
        id: Uuid,
        config: RunConfiguration,
        plugins: Vec<PluginDescriptor>,
    },
    Shutdown,
}

/// Worker → host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Loaded { count: usize },
    Log { id: Uuid, message: LogMessage },
    Finished { id: Uuid, success: bool },
    Failed { reason: String },
}

/// Write one message as a JSON line and flush
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> WeavrResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| WeavrError::io("writing protocol message", e))?;
    writer
        .flush()
        .await
        .map_err(|e| WeavrError::io("flushing protocol message", e))
}

/// Read the next message; `None` at end of stream. Blank lines are skipped.
pub async fn read_message<R, T>(reader: &mut R) -> WeavrResult<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| WeavrError::io("reading protocol message", e))?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        return serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|e| WeavrError::Protocol(format!("malformed message '{}': {}", trimmed, e)));
    }
}
