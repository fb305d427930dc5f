mod command_error;
mod command_handler;
mod config_get;
mod echo;
mod get;
mod incr;
mod info;
mod keys;
mod ping;
mod replication;
mod set;
mod stream_utils;
mod transactions;
mod type_command;
mod xadd;
mod xrange;
mod xread;

pub use command_error::CommandError;
pub use command_handler::{CommandHandler, CommandResult};
pub use transactions::run_transaction_commands;
