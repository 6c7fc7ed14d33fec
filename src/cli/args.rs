//! CLI argument definitions using clap derive

use crate::logger::Verbosity;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// weavr - build-time weaving orchestrator
///
/// Decides whether the weaving pass must run for a build artifact, finds the
/// configured plugins, and runs them in a cached isolated worker.
#[derive(Parser, Debug)]
#[command(name = "weavr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase diagnostic verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WEAVR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .weavr.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Weave one or more build artifacts
    Run(RunArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Inspect or clear run history
    History(HistoryArgs),

    /// Host an isolated context on stdin/stdout
    #[command(hide = true)]
    Worker(WorkerArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Artifact to weave (repeat to weave several concurrently)
    #[arg(short, long = "target", required = true)]
    pub targets: Vec<PathBuf>,

    /// Workspace root (defaults to the current directory)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Project directory holding the project-level manifest
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Reference path the artifact was built against
    #[arg(short, long = "reference")]
    pub references: Vec<PathBuf>,

    /// Reference copied next to the artifact
    #[arg(long = "copy-local")]
    pub copy_local: Vec<PathBuf>,

    /// Intermediate build directory
    #[arg(long)]
    pub intermediate_dir: Option<PathBuf>,

    /// Key file used to re-sign the artifact
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Re-sign the artifact after weaving
    #[arg(long)]
    pub sign: bool,

    /// Preprocessor symbol defined for the build (repeatable, or ';'-separated)
    #[arg(short = 'D', long = "define", value_delimiter = ';')]
    pub defines: Vec<String>,

    /// Minimum importance of build messages: low, normal, high
    #[arg(long)]
    pub verbosity: Option<Verbosity>,

    /// Forward trace messages from plugins
    #[arg(long)]
    pub debug: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the history command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: Option<HistoryAction>,
}

/// History subcommands
#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List recorded runs
    Show {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every record, forcing the next run of each target
    Clear,
}

/// Arguments for the hidden worker command
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Workspace this worker serves
    #[arg(long)]
    pub workspace: PathBuf,
}
