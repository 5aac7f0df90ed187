//! Command implementations for the CLI.

mod alias;
mod log;
mod schedule;
mod send;

pub use alias::{AliasAction, cmd_alias};
pub use log::cmd_log;
pub use schedule::{ScheduleArgs, cmd_schedule};
pub use send::{SendArgs, cmd_send};
