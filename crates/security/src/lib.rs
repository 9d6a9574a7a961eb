//! Security filters for hivebot tools: path containment and shell command
//! screening.
//!
//! Both filters are pure functions over their inputs:
//! - **Path validation**: resolve a path and refuse access to sensitive
//!   files or anything outside the configured workspace.
//! - **Command screening**: pattern-match shell commands against known
//!   destructive idioms before execution.
//!
//! This is advisory filtering, not a security boundary: a determined
//! adversary with shell access can get around substring and regex checks.
//! It exists to stop accidental or naive destructive actions from a model
//! acting in good faith.

pub mod command;
pub mod path;

pub use command::check_dangerous_command;
pub use path::{PathPolicyError, sanitize_path};
