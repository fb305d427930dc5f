use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{
        command_error::CommandError, command_handler::CommandResult,
        stream_utils::stream_entries_to_resp,
    },
    key_value_store::{DataType, KeyValueStore},
    resp::RespValue,
    stream::StreamId,
};

pub struct XrangeArguments {
    key: String,
    start: StreamId,
    end: StreamId,
}

impl XrangeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key, start, end] =
            <[String; 3]>::try_from(arguments).map_err(|_| CommandError::InvalidXRangeCommand)?;

        Ok(Self {
            key,
            start: StreamId::parse_range_bound(&start, false)?,
            end: StreamId::parse_range_bound(&end, true)?,
        })
    }
}

/// Returns the entries of a stream with `start <= id <= end`, inclusive on
/// both ends. A missing key yields an empty array.
pub async fn xrange(
    store: Arc<RwLock<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xrange_arguments = XrangeArguments::parse(arguments)?;

    let store_guard = store.read().await;

    let Some(value) = store_guard.get(&xrange_arguments.key) else {
        return Ok(CommandResult::Response(RespValue::Array(Vec::new())));
    };

    let DataType::Stream(stream) = &value.data else {
        return Err(CommandError::InvalidDataTypeForKey);
    };

    let entries = stream.range(xrange_arguments.start, xrange_arguments.end);

    Ok(CommandResult::Response(stream_entries_to_resp(entries)))
}
