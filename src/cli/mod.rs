mod args;
mod history;
mod join;

pub use args::{Cli, CliCommand, HistoryCliArgs, JoinCliArgs};
pub use history::handle_history_command;
pub use join::handle_join_command;
