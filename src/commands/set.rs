use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{DataType, KeyValueStore, Value},
    resp::RespValue,
};

/// Expiration requested with SET
#[derive(Debug, PartialEq)]
pub enum SetExpiration {
    /// `PX` or `EX`, relative to when the command runs
    TimeToLive(SignedDuration),
    /// `PXAT`, an absolute unix time in milliseconds
    At(Timestamp),
}

/// Represents the parsed arguments for SET command
pub struct SetArguments {
    /// The key name to store the value under
    key: String,
    /// The value to be stored under the given key
    value: String,
    /// Expiration requested with `PX`, `EX` or `PXAT`
    expiration: Option<SetExpiration>,
}

impl SetArguments {
    /// Parses command arguments into a SetArguments structure.
    ///
    /// # Arguments
    ///
    /// * `arguments` - Either `[key, value]` or `[key, value, "PX" | "EX" | "PXAT", amount]`
    ///
    /// # Returns
    ///
    /// * `Ok(SetArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::InvalidSetCommand)` - If the number of arguments is not 2 or 4
    /// * `Err(CommandError::InvalidSetCommandArgument)` - If the option is not `PX`, `EX` or `PXAT`
    /// * `Err(CommandError::InvalidSetCommandExpiration)` - If the amount is not a positive integer
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // SET grape mango PX 100
    /// let result = SetArguments::parse(vec![
    ///     "grape".to_string(),
    ///     "mango".to_string(),
    ///     "PX".to_string(),
    ///     "100".to_string(),
    /// ]);
    /// // Returns: Ok(SetArguments { key: "grape", value: "mango", expiration: Some(TimeToLive(100ms)) })
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::InvalidSetCommand);
        }

        let mut expiration = None;

        if arguments.len() == 4 {
            let amount = arguments[3]
                .parse::<i64>()
                .ok()
                .filter(|amount| *amount > 0)
                .ok_or(CommandError::InvalidSetCommandExpiration)?;

            expiration = match arguments[2].to_lowercase().as_str() {
                "px" => Some(SetExpiration::TimeToLive(SignedDuration::from_millis(amount))),
                "ex" => Some(SetExpiration::TimeToLive(SignedDuration::from_secs(amount))),
                "pxat" => Some(SetExpiration::At(
                    Timestamp::from_millisecond(amount)
                        .map_err(|_| CommandError::InvalidSetCommandExpiration)?,
                )),
                _ => return Err(CommandError::InvalidSetCommandArgument),
            };
        }

        Ok(Self {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            expiration,
        })
    }
}

/// Handles the Redis SET command.
///
/// Stores a string under a key, replacing whatever the key held, with an
/// optional expiration.
///
/// # Returns
///
/// * `Ok(CommandResult::Response)` - `+OK`
/// * `Err(CommandError)` - If the arguments are invalid
pub async fn set(
    store: Arc<RwLock<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    store_string(store, arguments).await?;

    Ok(CommandResult::Response(RespValue::simple_string("OK")))
}

/// Runs SET and returns the absolute expiration the key was stored with.
///
/// A primary propagates this timestamp as `PXAT` so every replica expires
/// the key at the same instant regardless of replication lag.
pub async fn store_string(
    store: Arc<RwLock<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<Option<Timestamp>, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let expiration = match set_arguments.expiration {
        Some(SetExpiration::TimeToLive(time_to_live)) => Some(
            Timestamp::now()
                .checked_add(time_to_live)
                .map_err(|_| CommandError::InvalidSetCommandExpiration)?,
        ),
        Some(SetExpiration::At(timestamp)) => Some(timestamp),
        None => None,
    };

    let mut store_guard = store.write().await;
    store_guard.insert(
        set_arguments.key,
        Value {
            data: DataType::String(set_arguments.value),
            expiration,
        },
    );

    Ok(expiration)
}
