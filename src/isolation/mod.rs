//! Isolated execution contexts
//!
//! - `context`: the `IsolatedContext` / `ContextFactory` seams
//! - `cache`: one context per workspace, behind a single process-wide lock
//! - `protocol`: JSON-lines messages between host and worker
//! - `process`: contexts backed by `weavr worker` child processes
//! - `worker`: the loop a worker process runs
//! - `runner`: executes one plugin binary

pub mod cache;
pub mod context;
pub mod process;
pub mod protocol;
pub mod runner;
pub mod worker;

pub use cache::{CacheGuard, CacheStats, ContextCache};
pub use context::{ContextFactory, IsolatedContext, RunReport};
pub use process::{WorkerProcessContext, WorkerProcessFactory};
pub use runner::{ExecutablePluginRunner, PluginOutcome, PluginRunner};
pub use worker::{run_stdio, Worker};
