use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    key_value_store::{DataType, KeyValueStore},
    rdb::{
        encoding::{write_length, write_string},
        opcode::{
            CHECKSUM_LENGTH, DATABASE_OPCODE, END_OF_FILE_OPCODE, EXPIRATION_MILLISECONDS_OPCODE,
            METADATA_OPCODE, RESIZE_DB_OPCODE, STRING_VALUE_TYPE,
        },
    },
};

const RDB_HEADER: &[u8] = b"REDIS0011";
const METADATA: [(&str, &str); 2] = [("redis-ver", "7.2.0"), ("redis-bits", "64")];

/// Serializes the live string keys of `store` into an RDB payload.
///
/// Streams have no encoding here and are left out. The checksum is written
/// as zeros, which readers treat as "not computed".
pub fn dump_rdb(store: &KeyValueStore) -> Bytes {
    let entries: Vec<_> = store
        .iter()
        .filter_map(|(key, value)| match &value.data {
            DataType::String(data) => Some((key, data, value.expiration)),
            DataType::Stream(_) => None,
        })
        .collect();

    let expiring_entries = entries
        .iter()
        .filter(|(_, _, expiration)| expiration.is_some())
        .count();

    let mut buffer = BytesMut::new();
    buffer.put_slice(RDB_HEADER);

    for (key, value) in METADATA {
        buffer.put_u8(METADATA_OPCODE);
        write_string(&mut buffer, key);
        write_string(&mut buffer, value);
    }

    buffer.put_u8(DATABASE_OPCODE);
    write_length(&mut buffer, 0);
    buffer.put_u8(RESIZE_DB_OPCODE);
    write_length(&mut buffer, entries.len());
    write_length(&mut buffer, expiring_entries);

    for (key, value, expiration) in entries {
        if let Some(expiration) = expiration {
            buffer.put_u8(EXPIRATION_MILLISECONDS_OPCODE);
            buffer.put_u64_le(u64::try_from(expiration.as_millisecond()).unwrap_or(0));
        }

        buffer.put_u8(STRING_VALUE_TYPE);
        write_string(&mut buffer, key);
        write_string(&mut buffer, value);
    }

    buffer.put_u8(END_OF_FILE_OPCODE);
    buffer.put_bytes(0, CHECKSUM_LENGTH);

    buffer.freeze()
}
