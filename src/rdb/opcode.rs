use jiff::Timestamp;

use crate::rdb::{
    encoding::{parse_length, parse_value},
    get_slice::{get_buffer_slice, get_fixed_bytes},
};

pub const MAGIC_STRING: &[u8] = b"REDIS";
pub const MAGIC_STRING_LENGTH: usize = 9;

pub const METADATA_OPCODE: u8 = 0xFA;
pub const RESIZE_DB_OPCODE: u8 = 0xFB;
pub const DATABASE_OPCODE: u8 = 0xFE;
pub const EXPIRATION_SECONDS_OPCODE: u8 = 0xFD;
pub const EXPIRATION_MILLISECONDS_OPCODE: u8 = 0xFC;
pub const END_OF_FILE_OPCODE: u8 = 0xFF;
pub const STRING_VALUE_TYPE: u8 = 0x00;

pub const CHECKSUM_LENGTH: usize = 8;

#[derive(Debug, PartialEq)]
pub enum OpCodeResponse {
    Metadata {
        key: String,
        value: String,
    },
    ResizeDb {
        hash_table_size: usize,
        expiry_hash_table_size: usize,
    },
    Database {
        database_number: usize,
    },
    Entry {
        key: String,
        value: String,
        expiration: Option<Timestamp>,
    },
    EndOfFile {
        crc64_checksum: Vec<u8>,
    },
}

fn invalid_data(message: String) -> tokio::io::Error {
    tokio::io::Error::new(tokio::io::ErrorKind::InvalidData, message)
}

/// Parses the opcode at `cursor` and returns it with the number of bytes it
/// spans. An incomplete opcode yields an `UnexpectedEof` error.
pub fn parse_opcode(bytes: &[u8], cursor: usize) -> tokio::io::Result<(OpCodeResponse, usize)> {
    let opcode = get_buffer_slice(bytes, cursor, 1)?[0];
    let mut position = cursor + 1;

    let response = match opcode {
        METADATA_OPCODE => {
            let (key, key_length) = parse_value(bytes, position)?;
            position += key_length;
            let (value, value_length) = parse_value(bytes, position)?;
            position += value_length;

            OpCodeResponse::Metadata { key, value }
        }
        RESIZE_DB_OPCODE => {
            let (hash_table_size, hash_table_size_length) = parse_length(bytes, position)?;
            position += hash_table_size_length;
            let (expiry_hash_table_size, expiry_length) = parse_length(bytes, position)?;
            position += expiry_length;

            OpCodeResponse::ResizeDb {
                hash_table_size,
                expiry_hash_table_size,
            }
        }
        DATABASE_OPCODE => {
            let (database_number, database_number_length) = parse_length(bytes, position)?;
            position += database_number_length;

            OpCodeResponse::Database { database_number }
        }
        EXPIRATION_SECONDS_OPCODE => {
            let seconds = u32::from_le_bytes(get_fixed_bytes(bytes, position)?);
            position += 4;

            let expiration = Timestamp::from_second(seconds as i64)
                .map_err(|e| invalid_data(format!("Invalid expiration timestamp: {}", e)))?;
            let (entry, entry_length) = parse_entry(bytes, position, Some(expiration))?;
            position += entry_length;

            entry
        }
        EXPIRATION_MILLISECONDS_OPCODE => {
            let milliseconds = u64::from_le_bytes(get_fixed_bytes(bytes, position)?);
            position += 8;

            let expiration = i64::try_from(milliseconds)
                .ok()
                .and_then(|milliseconds| Timestamp::from_millisecond(milliseconds).ok())
                .ok_or_else(|| {
                    invalid_data(format!("Invalid expiration timestamp: {}", milliseconds))
                })?;
            let (entry, entry_length) = parse_entry(bytes, position, Some(expiration))?;
            position += entry_length;

            entry
        }
        END_OF_FILE_OPCODE => {
            let crc64_checksum = get_buffer_slice(bytes, position, CHECKSUM_LENGTH)?.to_vec();
            position += CHECKSUM_LENGTH;

            OpCodeResponse::EndOfFile { crc64_checksum }
        }
        STRING_VALUE_TYPE => {
            let (entry, entry_length) = parse_entry(bytes, cursor, None)?;
            position = cursor + entry_length;

            entry
        }
        opcode => return Err(invalid_data(format!("Unknown OpCode: 0x{:02X}", opcode))),
    };

    Ok((response, position - cursor))
}

fn parse_entry(
    bytes: &[u8],
    cursor: usize,
    expiration: Option<Timestamp>,
) -> tokio::io::Result<(OpCodeResponse, usize)> {
    let value_type = get_buffer_slice(bytes, cursor, 1)?[0];
    if value_type != STRING_VALUE_TYPE {
        return Err(tokio::io::Error::new(
            tokio::io::ErrorKind::Unsupported,
            format!("Unsupported value type: 0x{:02X}", value_type),
        ));
    }

    let mut position = cursor + 1;
    let (key, key_length) = parse_value(bytes, position)?;
    position += key_length;
    let (value, value_length) = parse_value(bytes, position)?;
    position += value_length;

    Ok((
        OpCodeResponse::Entry {
            key,
            value,
            expiration,
        },
        position - cursor,
    ))
}

pub struct MagicStringResponse {
    pub magic_string: String,
    pub redis_version: String,
}

/// Parses the 9-byte `REDIS<version>` header.
pub fn parse_magic_string(bytes: &[u8]) -> tokio::io::Result<MagicStringResponse> {
    let header = get_buffer_slice(bytes, 0, MAGIC_STRING_LENGTH)?;

    if &header[..MAGIC_STRING.len()] != MAGIC_STRING {
        return Err(invalid_data("Invalid magic string".to_string()));
    }

    let redis_version = std::str::from_utf8(&header[MAGIC_STRING.len()..])
        .map_err(|e| invalid_data(e.to_string()))?;

    let version_number = redis_version
        .parse::<u32>()
        .map_err(|e| invalid_data(e.to_string()))?;

    if !(1..=12).contains(&version_number) {
        return Err(invalid_data("Invalid Redis version".to_string()));
    }

    Ok(MagicStringResponse {
        magic_string: "REDIS".to_string(),
        redis_version: redis_version.to_string(),
    })
}
