use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore},
    resp::RespValue,
};

pub struct GetArguments {
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key] =
            <[String; 1]>::try_from(arguments).map_err(|_| CommandError::InvalidGetCommand)?;

        Ok(Self { key })
    }
}

/// Handles the Redis GET command.
///
/// # Returns
///
/// * `Ok(CommandResult::Response)` - A bulk string with the value, or a null
///   bulk string if the key is missing or expired
/// * `Err(CommandError::InvalidGetCommand)` - If the number of arguments is not exactly 1
/// * `Err(CommandError::InvalidDataTypeForKey)` - If the key holds a stream
pub async fn get(
    store: Arc<RwLock<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    let store_guard = store.read().await;

    let Some(value) = store_guard.get(&get_arguments.key) else {
        return Ok(CommandResult::Response(RespValue::NullBulkString));
    };

    match &value.data {
        DataType::String(data) => Ok(CommandResult::Response(RespValue::bulk_string(data))),
        DataType::Stream(_) => Err(CommandError::InvalidDataTypeForKey),
    }
}
