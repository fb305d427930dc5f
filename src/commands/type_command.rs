use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct TypeArguments {
    key: String,
}

impl TypeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key] =
            <[String; 1]>::try_from(arguments).map_err(|_| CommandError::InvalidTypeCommand)?;

        Ok(Self { key })
    }
}

pub async fn type_command(
    store: Arc<RwLock<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let type_arguments = TypeArguments::parse(arguments)?;

    let store_guard = store.read().await;
    let type_name = store_guard
        .get(&type_arguments.key)
        .map_or("none", |value| value.data.type_name());

    Ok(CommandResult::Response(RespValue::simple_string(type_name)))
}
