use std::collections::HashMap;

use tracing::debug;

use crate::rdb::{
    opcode::{parse_magic_string, parse_opcode, OpCodeResponse, MAGIC_STRING_LENGTH},
    SnapshotSink,
};

/// Incremental RDB decoder. Chunks can be fed as they arrive; entries are
/// handed to the [`SnapshotSink`] as soon as they are complete.
#[derive(Debug, Default)]
pub struct RdbParser {
    buffer: Vec<u8>,
    cursor: usize,
    loaded_entries: usize,
    pub magic_string: Option<String>,
    pub redis_version: Option<String>,
    pub metadata: HashMap<String, String>,
    pub db_number: Option<usize>,
    pub hash_table_size: Option<usize>,
    pub expiry_hash_table_size: Option<usize>,
    pub crc64_checksum: Option<Vec<u8>>,
}

impl RdbParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the end-of-file opcode has been read.
    pub fn is_complete(&self) -> bool {
        self.crc64_checksum.is_some()
    }

    pub fn loaded_entries(&self) -> usize {
        self.loaded_entries
    }

    pub fn parse<S>(&mut self, chunk: &[u8], sink: &mut S) -> tokio::io::Result<()>
    where
        S: SnapshotSink + ?Sized,
    {
        self.buffer.extend_from_slice(chunk);

        if self.magic_string.is_none() {
            if self.buffer.len() < MAGIC_STRING_LENGTH {
                return Ok(());
            }

            let magic_string_response = parse_magic_string(&self.buffer)?;
            self.cursor = MAGIC_STRING_LENGTH;
            self.magic_string = Some(magic_string_response.magic_string);
            self.redis_version = Some(magic_string_response.redis_version);

            sink.reset_with_size_hint(0);
        }

        while self.cursor < self.buffer.len() && !self.is_complete() {
            let (response, length) = match parse_opcode(&self.buffer, self.cursor) {
                Ok(response) => response,
                Err(e) if e.kind() == tokio::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            self.cursor += length;

            match response {
                OpCodeResponse::Metadata { key, value } => {
                    debug!(key = %key, value = %value, "rdb metadata");
                    self.metadata.insert(key, value);
                }
                OpCodeResponse::ResizeDb {
                    hash_table_size,
                    expiry_hash_table_size,
                } => {
                    if self.loaded_entries == 0 {
                        sink.reset_with_size_hint(hash_table_size);
                    }

                    self.hash_table_size = Some(hash_table_size);
                    self.expiry_hash_table_size = Some(expiry_hash_table_size);
                }
                OpCodeResponse::Database { database_number } => {
                    self.db_number = Some(database_number);
                }
                OpCodeResponse::Entry {
                    key,
                    value,
                    expiration,
                } => {
                    // Only database 0 is served.
                    if self.db_number.unwrap_or(0) == 0 {
                        sink.set_unchecked(key, value, expiration);
                        self.loaded_entries += 1;
                    }
                }
                OpCodeResponse::EndOfFile { crc64_checksum } => {
                    self.crc64_checksum = Some(crc64_checksum);
                }
            }
        }

        self.buffer.drain(..self.cursor);
        self.cursor = 0;

        Ok(())
    }
}
