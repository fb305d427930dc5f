use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{
    commands::{
        command_error::CommandError,
        stream_utils::{keyed_stream_entries_to_resp, stream_entry_to_resp},
    },
    key_value_store::{DataType, KeyValueStore, Value},
    resp::RespValue,
    state::State,
    stream::{RequestedStreamId, Stream, StreamFields},
};

pub struct XaddArguments {
    key: String,
    requested_id: RequestedStreamId,
    fields: StreamFields,
}

impl XaddArguments {
    /// Parses `key id field value [field value ...]`.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 4 || arguments.len() % 2 != 0 {
            return Err(CommandError::InvalidXAddCommand);
        }

        let mut arguments = arguments.into_iter();
        let (Some(key), Some(requested_id)) = (arguments.next(), arguments.next()) else {
            return Err(CommandError::InvalidXAddCommand);
        };

        let requested_id = RequestedStreamId::parse(&requested_id)?;

        let mut fields = Vec::new();
        while let (Some(field), Some(value)) = (arguments.next(), arguments.next()) {
            fields.push((field, value));
        }

        Ok(Self {
            key,
            requested_id,
            fields,
        })
    }
}

/// Appends an entry to the stream at `key`, creating the stream if needed,
/// and returns the ID the entry was stored under.
///
/// Blocked `XREAD` clients watching the key are offered the new entry while
/// the store write lock is still held, so no reader can register in between.
pub async fn xadd(
    store: Arc<RwLock<KeyValueStore>>,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<String, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;
    let now_milliseconds = u64::try_from(Timestamp::now().as_millisecond()).unwrap_or(0);

    let mut store_guard = store.write().await;

    if store_guard.get_mut(&xadd_arguments.key).is_none() {
        // A rejected ID must not leave an empty stream behind.
        Stream::new().next_id(xadd_arguments.requested_id, now_milliseconds)?;

        store_guard.insert(
            xadd_arguments.key.clone(),
            Value {
                data: DataType::Stream(Stream::new()),
                expiration: None,
            },
        );
    }

    let Some(Value {
        data: DataType::Stream(stream),
        ..
    }) = store_guard.get_mut(&xadd_arguments.key)
    else {
        return Err(CommandError::InvalidDataTypeForKey);
    };

    let id = stream.add(
        xadd_arguments.requested_id,
        xadd_arguments.fields.clone(),
        now_milliseconds,
    )?;

    let response = RespValue::Array(vec![keyed_stream_entries_to_resp(
        &xadd_arguments.key,
        RespValue::Array(vec![stream_entry_to_resp(&id, &xadd_arguments.fields)]),
    )]);

    let state_guard = state.lock().await;
    let woken = state_guard.notify_stream_listeners(&xadd_arguments.key, id, &response);
    if woken > 0 {
        debug!(key = %xadd_arguments.key, %id, woken, "woke blocked stream readers");
    }

    Ok(id.to_string())
}
