//! weavr - build-time weaving orchestrator
//!
//! Decides whether a build artifact needs its weaving pass, discovers the
//! configured plugins, and runs them inside an isolated worker process that
//! is cached per workspace and replaced only when the plugin set changes.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gate;
pub mod history;
pub mod isolation;
pub mod logger;
pub mod orchestrator;
pub mod plugin;
pub mod request;
pub mod ui;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use error::{WeavrError, WeavrResult};
