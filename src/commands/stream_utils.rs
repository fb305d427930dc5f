use crate::{
    resp::RespValue,
    stream::{StreamFields, StreamId},
};

/// Converts stream entries to the RESP shape clients expect: one
/// `[id, [field1, value1, field2, value2, ...]]` array per entry.
pub fn stream_entries_to_resp(entries: Vec<(&StreamId, &StreamFields)>) -> RespValue {
    RespValue::Array(
        entries
            .into_iter()
            .map(|(id, fields)| stream_entry_to_resp(id, fields))
            .collect(),
    )
}

pub fn stream_entry_to_resp(id: &StreamId, fields: &StreamFields) -> RespValue {
    let mut field_values = Vec::with_capacity(fields.len() * 2);

    for (field, value) in fields {
        field_values.push(RespValue::bulk_string(field));
        field_values.push(RespValue::bulk_string(value));
    }

    RespValue::Array(vec![
        RespValue::bulk_string(&id.to_string()),
        RespValue::Array(field_values),
    ])
}

/// `[[key, entries]]`, the reply shape of `XREAD` for a single stream.
pub fn keyed_stream_entries_to_resp(key: &str, entries: RespValue) -> RespValue {
    RespValue::Array(vec![RespValue::bulk_string(key), entries])
}
