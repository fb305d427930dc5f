use std::sync::Arc;

use globset::Glob;
use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct KeysArguments {
    pattern: String,
}

impl KeysArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [pattern] =
            <[String; 1]>::try_from(arguments).map_err(|_| CommandError::InvalidKeysCommand)?;

        Ok(Self { pattern })
    }
}

/// Lists the live keys matching a glob pattern, sorted.
pub async fn keys(
    store: Arc<RwLock<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let keys_arguments = KeysArguments::parse(arguments)?;

    let matcher = Glob::new(&keys_arguments.pattern)
        .map_err(|_| CommandError::InvalidKeysPattern)?
        .compile_matcher();

    let store_guard = store.read().await;
    let mut matching_keys: Vec<&String> = store_guard
        .keys()
        .filter(|key| matcher.is_match(key.as_str()))
        .collect();
    matching_keys.sort();

    Ok(CommandResult::Response(RespValue::Array(
        matching_keys
            .into_iter()
            .map(|key| RespValue::bulk_string(key))
            .collect(),
    )))
}
