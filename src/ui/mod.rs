//! Plain console output for the non-build commands
//!
//! Build messages go through `cli::host::ConsoleHost`; this module only
//! formats the human-facing output of `config` and `history`.

mod output;

pub use output::{key_value, remark, section, step_ok, step_ok_detail, step_warn_hint};
