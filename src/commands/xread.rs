use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::CommandResult,
        stream_utils::{keyed_stream_entries_to_resp, stream_entries_to_resp},
    },
    key_value_store::{DataType, KeyValueStore},
    resp::RespValue,
    state::{State, StreamListener},
    stream::StreamId,
};

/// How long `XREAD` may wait for new entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockDuration {
    /// No `BLOCK` option: answer with whatever is available right away.
    NonBlocking,
    /// `BLOCK 0` or a negative duration: wait until an entry arrives.
    Indefinitely,
    Timeout(Duration),
}

/// Start position requested for one stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamStart {
    /// `$`: only entries added after the command was received.
    LastEntry,
    After(StreamId),
}

/// Represents the parsed arguments for the XREAD command.
///
/// Format: `XREAD [BLOCK milliseconds] STREAMS key1 key2 ... id1 id2 ...`
pub struct XreadArguments {
    block: BlockDuration,
    /// (key, start) pairs. Entries strictly after the start are returned.
    key_stream_pairs: Vec<(String, StreamStart)>,
}

impl XreadArguments {
    /// Parses command arguments into structured XreadArguments.
    ///
    /// Handles both blocking and non-blocking variants of the XREAD command:
    /// - `XREAD STREAMS key1 key2 id1 id2` (non-blocking)
    /// - `XREAD BLOCK milliseconds STREAMS key1 key2 id1 id2` (blocking)
    ///
    /// # Returns
    ///
    /// * `Ok(XreadArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::InvalidXReadCommand)` - If there are no streams or uneven key/ID lists
    /// * `Err(CommandError::InvalidXReadBlockDuration)` - If the block duration is not an integer
    /// * `Err(CommandError::InvalidXReadOption)` - If an option other than BLOCK precedes STREAMS
    /// * `Err(CommandError::InvalidStreamId)` - If a start ID is neither `$` nor a valid ID
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let mut block = BlockDuration::NonBlocking;
        let mut index = 0;

        loop {
            let Some(option) = arguments.get(index) else {
                return Err(CommandError::InvalidXReadCommand);
            };

            match option.to_lowercase().as_str() {
                "block" => {
                    let duration = arguments
                        .get(index + 1)
                        .ok_or(CommandError::InvalidXReadCommand)?
                        .parse::<i64>()
                        .map_err(|_| CommandError::InvalidXReadBlockDuration)?;

                    block = match u64::try_from(duration) {
                        Ok(0) | Err(_) => BlockDuration::Indefinitely,
                        Ok(milliseconds) => {
                            BlockDuration::Timeout(Duration::from_millis(milliseconds))
                        }
                    };
                    index += 2;
                }
                "streams" => {
                    index += 1;
                    break;
                }
                _ => return Err(CommandError::InvalidXReadOption),
            }
        }

        let streams = &arguments[index..];
        if streams.is_empty() || streams.len() % 2 != 0 {
            return Err(CommandError::InvalidXReadCommand);
        }

        let (keys, ids) = streams.split_at(streams.len() / 2);
        let mut key_stream_pairs = Vec::with_capacity(keys.len());

        for (key, id) in keys.iter().zip(ids) {
            let start = match id.as_str() {
                "$" => StreamStart::LastEntry,
                _ => StreamStart::After(StreamId::parse(id)?),
            };

            key_stream_pairs.push((key.clone(), start));
        }

        Ok(Self {
            block,
            key_stream_pairs,
        })
    }
}

/// Reads entries newer than the given IDs from one or more streams.
///
/// Streams with nothing new and missing keys are left out of the reply. If
/// nothing is available and `BLOCK` was given, the client registers a
/// [`StreamListener`] while the store read lock is held and waits for the
/// next `XADD` to one of its keys; a timeout answers with a null bulk string.
pub async fn xread(
    store: Arc<RwLock<KeyValueStore>>,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;

    let listener = {
        let store_guard = store.read().await;

        let mut watched = Vec::with_capacity(xread_arguments.key_stream_pairs.len());
        let mut response = Vec::new();

        for (key, start) in &xread_arguments.key_stream_pairs {
            let stream = match store_guard.get(key) {
                Some(value) => match &value.data {
                    DataType::Stream(stream) => Some(stream),
                    _ => return Err(CommandError::InvalidDataTypeForKey),
                },
                None => None,
            };

            let start = match start {
                StreamStart::After(id) => *id,
                StreamStart::LastEntry => stream
                    .and_then(|stream| stream.last_id())
                    .unwrap_or(StreamId::MIN),
            };
            watched.push((key.clone(), start));

            let Some(stream) = stream else {
                continue;
            };

            let entries = stream.entries_after(start);
            if !entries.is_empty() {
                response.push(keyed_stream_entries_to_resp(
                    key,
                    stream_entries_to_resp(entries),
                ));
            }
        }

        if !response.is_empty() || xread_arguments.block == BlockDuration::NonBlocking {
            return Ok(CommandResult::Response(RespValue::Array(response)));
        }

        let listener = Arc::new(StreamListener::new(watched));
        state.lock().await.add_stream_listener(Arc::clone(&listener));

        listener
    };

    let timeout = match xread_arguments.block {
        BlockDuration::Timeout(duration) => Some(duration),
        _ => None,
    };

    debug!(?timeout, "XREAD blocking for new entries");
    let result = listener.wait(timeout).await;

    state.lock().await.remove_stream_listener(&listener);

    Ok(CommandResult::Response(
        result.unwrap_or(RespValue::NullBulkString),
    ))
}
