//! CLI command implementations

pub mod config;
pub mod history;
pub mod run;
pub mod worker;

pub use config::execute as config;
pub use history::execute as history;
pub use run::execute as run;
pub use worker::execute as worker;
