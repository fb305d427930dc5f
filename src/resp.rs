//! Redis Serialization Protocol (RESP2 and RESP3) frames.
//!
//! [`RespValue`] is the decoded form of one protocol frame. Serialization lives
//! here and is pure; decoding is incremental and lives in [`RespParser`] so a
//! frame can be assembled across any number of partial socket reads.

mod parser;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

pub use parser::RespParser;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("unsupported frame type byte 0x{0:02X}")]
    UnsupportedType(u8),
    #[error("invalid frame terminator")]
    InvalidTerminator,
    #[error("invalid digit 0x{0:02X}")]
    InvalidDigit(u8),
    #[error("negative length {0}")]
    NegativeLength(i64),
    #[error("invalid integer")]
    InvalidInteger,
    #[error("invalid boolean")]
    InvalidBoolean,
    #[error("invalid double")]
    InvalidDouble,
    #[error("invalid null")]
    InvalidNull,
    #[error("invalid verbatim string")]
    InvalidVerbatimString,
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
}

impl RespError {
    pub fn as_resp(&self) -> RespValue {
        RespValue::Error(format!("ERR Protocol error: {}", self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    /// `$-1\r\n`, only ever written by the server.
    NullBulkString,
    Array(Vec<RespValue>),
    Null,
    Boolean(bool),
    Double(f64),
    /// Arbitrary precision integer kept as its decimal digits (with optional sign).
    BigNumber(String),
    BulkError(Bytes),
    VerbatimString { encoding: String, data: Bytes },
    Map(Vec<(RespValue, RespValue)>),
    Set(Vec<RespValue>),
    Push(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(value: &str) -> Self {
        RespValue::SimpleString(value.to_string())
    }

    pub fn bulk_string(value: &str) -> Self {
        RespValue::BulkString(Bytes::copy_from_slice(value.as_bytes()))
    }

    /// Builds a command array of bulk strings, e.g. `["REPLCONF", "GETACK", "*"]`.
    pub fn command(parts: &[&str]) -> Self {
        RespValue::Array(parts.iter().map(|part| RespValue::bulk_string(part)).collect())
    }

    pub fn encode(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        self.write_to(&mut buffer);
        buffer.freeze()
    }

    pub fn write_to(&self, buffer: &mut BytesMut) {
        match self {
            RespValue::SimpleString(value) => write_line(buffer, b'+', value.as_bytes()),
            RespValue::Error(value) => write_line(buffer, b'-', value.as_bytes()),
            RespValue::Integer(value) => write_line(buffer, b':', value.to_string().as_bytes()),
            RespValue::BulkString(data) => write_blob(buffer, b'$', data),
            RespValue::NullBulkString => buffer.put_slice(b"$-1\r\n"),
            RespValue::Array(elements) => write_aggregate(buffer, b'*', elements),
            RespValue::Null => buffer.put_slice(b"_\r\n"),
            RespValue::Boolean(value) => {
                write_line(buffer, b'#', if *value { b"t" } else { b"f" })
            }
            RespValue::Double(value) => write_line(buffer, b',', format_double(*value).as_bytes()),
            RespValue::BigNumber(digits) => write_line(buffer, b'(', digits.as_bytes()),
            RespValue::BulkError(data) => write_blob(buffer, b'!', data),
            RespValue::VerbatimString { encoding, data } => {
                write_line(
                    buffer,
                    b'=',
                    (encoding.len() + 1 + data.len()).to_string().as_bytes(),
                );
                buffer.put_slice(encoding.as_bytes());
                buffer.put_u8(b':');
                buffer.put_slice(data);
                buffer.put_slice(b"\r\n");
            }
            RespValue::Map(pairs) => {
                write_line(buffer, b'%', pairs.len().to_string().as_bytes());
                for (key, value) in pairs {
                    key.write_to(buffer);
                    value.write_to(buffer);
                }
            }
            RespValue::Set(elements) => write_aggregate(buffer, b'~', elements),
            RespValue::Push(elements) => write_aggregate(buffer, b'>', elements),
        }
    }

    /// Bulk and simple string payloads as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(value) => Some(value),
            RespValue::BulkString(data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }
}

fn write_line(buffer: &mut BytesMut, sigil: u8, content: &[u8]) {
    buffer.reserve(content.len() + 3);
    buffer.put_u8(sigil);
    buffer.put_slice(content);
    buffer.put_slice(b"\r\n");
}

fn write_blob(buffer: &mut BytesMut, sigil: u8, data: &[u8]) {
    write_line(buffer, sigil, data.len().to_string().as_bytes());
    buffer.put_slice(data);
    buffer.put_slice(b"\r\n");
}

fn write_aggregate(buffer: &mut BytesMut, sigil: u8, elements: &[RespValue]) {
    write_line(buffer, sigil, elements.len().to_string().as_bytes());
    for element in elements {
        element.write_to(buffer);
    }
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}
