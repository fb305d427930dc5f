use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::{CommandHandler, CommandResult},
    },
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::RedisServer,
    state::State,
};

pub struct ExecArguments;

impl ExecArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::InvalidExecCommand);
        }

        Ok(Self)
    }
}

/// Ends the client's transaction and hands its queued commands back to the
/// connection, which runs them with [`run_transaction_commands`].
pub async fn exec(
    client_address: &str,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    ExecArguments::parse(arguments)?;

    let mut state_guard = state.lock().await;

    let Ok(transaction) = state_guard.remove_transaction(client_address) else {
        return Err(CommandError::ExecWithoutMulti);
    };

    if transaction.is_empty() {
        Ok(CommandResult::Response(RespValue::Array(Vec::new())))
    } else {
        Ok(CommandResult::Batch(transaction))
    }
}

/// Runs queued commands in order and collects one reply per command.
/// Failing commands put their error in the array instead of aborting.
pub async fn run_transaction_commands(
    client_address: &str,
    server: Arc<RedisServer>,
    store: Arc<RwLock<KeyValueStore>>,
    state: Arc<Mutex<State>>,
    commands: Vec<CommandHandler>,
) -> RespValue {
    let mut responses = Vec::with_capacity(commands.len());

    for command in commands {
        let response = match command
            .handle_command(
                client_address,
                Arc::clone(&server),
                Arc::clone(&store),
                Arc::clone(&state),
            )
            .await
        {
            Ok(CommandResult::Response(response)) => response,
            Ok(_) => RespValue::NullBulkString,
            Err(e) => e.as_resp(),
        };

        responses.push(response);
    }

    RespValue::Array(responses)
}
