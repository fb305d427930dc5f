use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore, Value},
    resp::RespValue,
};

pub struct IncrArguments {
    key: String,
}

impl IncrArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key] =
            <[String; 1]>::try_from(arguments).map_err(|_| CommandError::InvalidIncrCommand)?;

        Ok(Self { key })
    }
}

/// Increments the integer stored at a key, creating it as `1` when missing.
/// The expiration of an existing key is kept.
pub async fn incr(
    store: Arc<RwLock<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let incr_arguments = IncrArguments::parse(arguments)?;

    let mut store_guard = store.write().await;

    let Some(value) = store_guard.get_mut(&incr_arguments.key) else {
        store_guard.insert(incr_arguments.key, Value::string("1"));
        return Ok(CommandResult::Response(RespValue::Integer(1)));
    };

    let DataType::String(stored_data) = &mut value.data else {
        return Err(CommandError::InvalidDataTypeForKey);
    };

    let incremented = stored_data
        .parse::<i64>()
        .ok()
        .and_then(|current| current.checked_add(1))
        .ok_or(CommandError::InvalidIncrValue)?;
    *stored_data = incremented.to_string();

    Ok(CommandResult::Response(RespValue::Integer(incremented)))
}
