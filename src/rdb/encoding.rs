use bytes::{BufMut, BytesMut};

use crate::rdb::get_slice::{get_buffer_slice, get_fixed_bytes};

#[derive(Debug, PartialEq)]
enum ValueEncoding {
    Length(usize),
    Int8,
    Int16,
    Int32,
    LzfCompressedString,
}

fn invalid_data(message: &str) -> tokio::io::Error {
    tokio::io::Error::new(tokio::io::ErrorKind::InvalidData, message.to_string())
}

fn parse_length_encoding(bytes: &[u8], cursor: usize) -> tokio::io::Result<(ValueEncoding, usize)> {
    let first_byte = get_buffer_slice(bytes, cursor, 1)?[0];

    // The two most significant bits select the encoding.
    match first_byte >> 6 {
        0b00 => Ok((ValueEncoding::Length((first_byte & 0b0011_1111) as usize), 1)),
        0b01 => {
            // 14-bit length: six bits of this byte are the high bits, the next byte the low ones.
            let low_bits = get_buffer_slice(bytes, cursor + 1, 1)?[0] as usize;
            let high_bits = (first_byte & 0b0011_1111) as usize;

            Ok((ValueEncoding::Length((high_bits << 8) | low_bits), 2))
        }
        0b10 => match first_byte {
            0x80 => {
                let length = u32::from_be_bytes(get_fixed_bytes(bytes, cursor + 1)?);
                Ok((ValueEncoding::Length(length as usize), 5))
            }
            0x81 => {
                let length = u64::from_be_bytes(get_fixed_bytes(bytes, cursor + 1)?);
                let length =
                    usize::try_from(length).map_err(|_| invalid_data("Length does not fit in memory"))?;
                Ok((ValueEncoding::Length(length), 9))
            }
            _ => Err(invalid_data("Invalid length encoding")),
        },
        _ => match first_byte & 0b0011_1111 {
            0 => Ok((ValueEncoding::Int8, 1)),
            1 => Ok((ValueEncoding::Int16, 1)),
            2 => Ok((ValueEncoding::Int32, 1)),
            3 => Ok((ValueEncoding::LzfCompressedString, 1)),
            _ => Err(invalid_data("Invalid length encoding")),
        },
    }
}

/// Reads a plain length (no special string encodings allowed).
pub fn parse_length(bytes: &[u8], cursor: usize) -> tokio::io::Result<(usize, usize)> {
    match parse_length_encoding(bytes, cursor)? {
        (ValueEncoding::Length(length), read) => Ok((length, read)),
        _ => Err(invalid_data("Value should be length encoded integer")),
    }
}

/// Reads a string, which may be stored as a little-endian integer.
pub fn parse_value(bytes: &[u8], cursor: usize) -> tokio::io::Result<(String, usize)> {
    let (value_encoding, header_length) = parse_length_encoding(bytes, cursor)?;
    let start = cursor + header_length;

    let (value, value_length) = match value_encoding {
        ValueEncoding::Length(length) => {
            let value = std::str::from_utf8(get_buffer_slice(bytes, start, length)?)
                .map_err(|_| invalid_data("Invalid UTF-8"))?;

            (value.to_string(), length)
        }
        ValueEncoding::Int8 => (i8::from_le_bytes(get_fixed_bytes(bytes, start)?).to_string(), 1),
        ValueEncoding::Int16 => (i16::from_le_bytes(get_fixed_bytes(bytes, start)?).to_string(), 2),
        ValueEncoding::Int32 => (i32::from_le_bytes(get_fixed_bytes(bytes, start)?).to_string(), 4),
        ValueEncoding::LzfCompressedString => {
            return Err(tokio::io::Error::new(
                tokio::io::ErrorKind::Unsupported,
                "Unsupported value encoding",
            ))
        }
    };

    Ok((value, header_length + value_length))
}

pub fn write_length(buffer: &mut BytesMut, length: usize) {
    if length < 1 << 6 {
        buffer.put_u8(length as u8);
    } else if length < 1 << 14 {
        buffer.put_u8(0b0100_0000 | (length >> 8) as u8);
        buffer.put_u8((length & 0xFF) as u8);
    } else if let Ok(length) = u32::try_from(length) {
        buffer.put_u8(0x80);
        buffer.put_u32(length);
    } else {
        buffer.put_u8(0x81);
        buffer.put_u64(length as u64);
    }
}

pub fn write_string(buffer: &mut BytesMut, value: &str) {
    write_length(buffer, value.len());
    buffer.put_slice(value.as_bytes());
}
