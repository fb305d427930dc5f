//! Input handling for network connections.
//!
//! Every connection owns one [`RespReader`]: a growable read buffer layered
//! under a single [`RespParser`]. Frames that straddle socket reads are
//! finished on a later read, and the bytes each frame occupied on the wire are
//! reported alongside it so replicas can account for their offset.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::resp::{RespError, RespParser, RespValue};

const READ_CHUNK_SIZE: usize = 4096;

/// Errors that can occur while reading and parsing frames from network streams.
#[derive(Error, Debug, PartialEq)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("RESP parse error: {0}")]
    RespParseError(#[from] RespError),
    #[error("Invalid snapshot payload")]
    InvalidSnapshotPayload,
}

impl CommandReadError {
    pub fn as_resp(&self) -> RespValue {
        match self {
            CommandReadError::IoError(msg) => RespValue::Error(format!("ERR {}", msg)),
            CommandReadError::ConnectionClosed => {
                RespValue::Error("ERR connection closed".to_string())
            }
            CommandReadError::RespParseError(err) => err.as_resp(),
            CommandReadError::InvalidSnapshotPayload => {
                RespValue::Error("ERR invalid snapshot payload".to_string())
            }
        }
    }
}

#[derive(Debug)]
pub struct RespReader<R> {
    reader: R,
    buffer: BytesMut,
    parser: RespParser,
}

impl<R> RespReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            parser: RespParser::new(),
        }
    }

    /// Reads the next complete frame.
    ///
    /// # Returns
    ///
    /// * `Ok((RespValue, usize))` - The frame and the number of bytes it occupied on the wire
    /// * `Err(CommandReadError::ConnectionClosed)` - If the peer closed the connection
    /// * `Err(CommandReadError::RespParseError)` - If the bytes are not valid RESP; the
    ///   connection cannot be resynchronised after this
    pub async fn read_frame(&mut self) -> Result<(RespValue, usize), CommandReadError> {
        loop {
            if !self.buffer.is_empty() {
                let (frame, position) = self.parser.parse(&self.buffer[..], 0)?;
                self.buffer.advance(position);

                if let Some(frame) = frame {
                    return Ok((frame, self.parser.last_frame_len()));
                }
            }

            self.fill_buffer().await?;
        }
    }

    /// Reads the `$<len>\r\n<payload>` snapshot sent after `FULLRESYNC`.
    ///
    /// Bytes following the payload stay buffered for [`RespReader::read_frame`].
    pub async fn read_snapshot_payload(&mut self) -> Result<Bytes, CommandReadError> {
        let mut parser = RespParser::snapshot_payload();

        loop {
            if !self.buffer.is_empty() {
                let (frame, position) = parser.parse(&self.buffer[..], 0)?;
                self.buffer.advance(position);

                match frame {
                    Some(RespValue::BulkString(payload)) => return Ok(payload),
                    Some(_) => return Err(CommandReadError::InvalidSnapshotPayload),
                    None => (),
                }
            }

            self.fill_buffer().await?;
        }
    }

    async fn fill_buffer(&mut self) -> Result<(), CommandReadError> {
        self.buffer.reserve(READ_CHUNK_SIZE);

        let number_of_bytes = self
            .reader
            .read_buf(&mut self.buffer)
            .await
            .map_err(|e| CommandReadError::IoError(e.to_string()))?;

        if number_of_bytes == 0 {
            return Err(CommandReadError::ConnectionClosed);
        }

        Ok(())
    }
}
