use bytes::Bytes;

use crate::resp::{RespError, RespValue};

/// Resumable RESP decoder.
///
/// Every call to [`RespParser::parse`] consumes all the bytes it is given into
/// the cursor of the frame currently being decoded and returns the position it
/// stopped at. A `None` frame means the input ran out before the frame ended;
/// calling `parse` again with the following bytes picks up where it left off.
#[derive(Debug, Default)]
pub struct RespParser {
    cursor: Option<FrameCursor>,
    unterminated_bulk: bool,
    consumed: usize,
    last_frame_len: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser for the `$<len>\r\n<payload>` snapshot that follows `FULLRESYNC`,
    /// which is not closed by a trailing CRLF.
    pub fn snapshot_payload() -> Self {
        Self {
            unterminated_bulk: true,
            ..Self::default()
        }
    }

    /// Number of wire bytes occupied by the last frame returned by `parse`.
    pub fn last_frame_len(&self) -> usize {
        self.last_frame_len
    }

    /// Whether a partially decoded frame is pending.
    pub fn is_mid_frame(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn parse(
        &mut self,
        buffer: &[u8],
        start: usize,
    ) -> Result<(Option<RespValue>, usize), RespError> {
        if start >= buffer.len() {
            return Ok((None, start));
        }

        let mut position = start;
        let mut cursor = match self.cursor.take() {
            Some(cursor) => cursor,
            None => {
                let cursor = FrameCursor::start(buffer[position], self.unterminated_bulk)?;
                position += 1;
                cursor
            }
        };

        match cursor.feed(buffer, position) {
            Ok((Some(frame), new_position)) => {
                self.last_frame_len = self.consumed + new_position - start;
                self.consumed = 0;
                Ok((Some(frame), new_position))
            }
            Ok((None, new_position)) => {
                self.consumed += new_position - start;
                self.cursor = Some(cursor);
                Ok((None, new_position))
            }
            Err(err) => {
                self.cursor = Some(cursor);
                Err(err)
            }
        }
    }
}

#[derive(Debug)]
enum FrameCursor {
    Line(LineKind, LineCursor),
    Bulk(BulkCursor),
    Aggregate(AggregateCursor),
}

impl FrameCursor {
    fn start(sigil: u8, unterminated_bulk: bool) -> Result<Self, RespError> {
        if unterminated_bulk && sigil != b'$' {
            return Err(RespError::UnsupportedType(sigil));
        }

        let cursor = match sigil {
            b'+' => FrameCursor::line(LineKind::SimpleString),
            b'-' => FrameCursor::line(LineKind::Error),
            b':' => FrameCursor::line(LineKind::Integer),
            b'_' => FrameCursor::line(LineKind::Null),
            b'#' => FrameCursor::line(LineKind::Boolean),
            b',' => FrameCursor::line(LineKind::Double),
            b'(' => FrameCursor::line(LineKind::BigNumber),
            b'$' => FrameCursor::Bulk(BulkCursor::new(BulkKind::String, !unterminated_bulk)),
            b'!' => FrameCursor::Bulk(BulkCursor::new(BulkKind::Error, true)),
            b'=' => FrameCursor::Bulk(BulkCursor::new(BulkKind::Verbatim, true)),
            b'*' => FrameCursor::Aggregate(AggregateCursor::new(AggregateKind::Array)),
            b'%' => FrameCursor::Aggregate(AggregateCursor::new(AggregateKind::Map)),
            b'~' => FrameCursor::Aggregate(AggregateCursor::new(AggregateKind::Set)),
            b'>' => FrameCursor::Aggregate(AggregateCursor::new(AggregateKind::Push)),
            other => return Err(RespError::UnsupportedType(other)),
        };

        Ok(cursor)
    }

    fn line(kind: LineKind) -> Self {
        FrameCursor::Line(kind, LineCursor::new(kind))
    }

    fn feed(
        &mut self,
        buffer: &[u8],
        position: usize,
    ) -> Result<(Option<RespValue>, usize), RespError> {
        match self {
            FrameCursor::Line(kind, line) => {
                let (content, position) = line.feed(buffer, position)?;

                match content {
                    Some(content) => Ok((Some(kind.finish(content)?), position)),
                    None => Ok((None, position)),
                }
            }
            FrameCursor::Bulk(bulk) => bulk.feed(buffer, position),
            FrameCursor::Aggregate(aggregate) => aggregate.feed(buffer, position),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineKind {
    SimpleString,
    Error,
    Integer,
    Null,
    Boolean,
    Double,
    BigNumber,
}

impl LineKind {
    /// Rejects a byte as soon as it is seen rather than once the line is complete.
    fn validate(&self, byte: u8, index: usize) -> Result<(), RespError> {
        match self {
            LineKind::Integer | LineKind::BigNumber => {
                if byte.is_ascii_digit() || (index == 0 && (byte == b'+' || byte == b'-')) {
                    Ok(())
                } else {
                    Err(RespError::InvalidDigit(byte))
                }
            }
            LineKind::Null => Err(RespError::InvalidNull),
            LineKind::Boolean => {
                if index == 0 && (byte == b't' || byte == b'f') {
                    Ok(())
                } else {
                    Err(RespError::InvalidBoolean)
                }
            }
            _ => Ok(()),
        }
    }

    fn finish(&self, content: Vec<u8>) -> Result<RespValue, RespError> {
        match self {
            LineKind::SimpleString => Ok(RespValue::SimpleString(into_utf8(content)?)),
            LineKind::Error => Ok(RespValue::Error(into_utf8(content)?)),
            LineKind::Integer => Ok(RespValue::Integer(parse_integer(&content)?)),
            LineKind::Null => Ok(RespValue::Null),
            LineKind::Boolean => match content.as_slice() {
                b"t" => Ok(RespValue::Boolean(true)),
                b"f" => Ok(RespValue::Boolean(false)),
                _ => Err(RespError::InvalidBoolean),
            },
            LineKind::Double => {
                let text = into_utf8(content).map_err(|_| RespError::InvalidDouble)?;
                let value = text
                    .parse::<f64>()
                    .map_err(|_| RespError::InvalidDouble)?;

                Ok(RespValue::Double(value))
            }
            LineKind::BigNumber => {
                if !content.iter().any(u8::is_ascii_digit) {
                    return Err(RespError::InvalidInteger);
                }

                Ok(RespValue::BigNumber(into_utf8(content)?))
            }
        }
    }
}

/// Accumulates the bytes of one CRLF-terminated line.
#[derive(Debug)]
struct LineCursor {
    kind: LineKind,
    content: Vec<u8>,
    seen_carriage_return: bool,
}

impl LineCursor {
    fn new(kind: LineKind) -> Self {
        Self {
            kind,
            content: Vec::new(),
            seen_carriage_return: false,
        }
    }

    fn feed(
        &mut self,
        buffer: &[u8],
        mut position: usize,
    ) -> Result<(Option<Vec<u8>>, usize), RespError> {
        while position < buffer.len() {
            let byte = buffer[position];

            if self.seen_carriage_return {
                if byte != b'\n' {
                    return Err(RespError::InvalidTerminator);
                }

                self.seen_carriage_return = false;
                return Ok((Some(std::mem::take(&mut self.content)), position + 1));
            }

            match byte {
                b'\r' => self.seen_carriage_return = true,
                b'\n' => return Err(RespError::InvalidTerminator),
                _ => {
                    self.kind.validate(byte, self.content.len())?;
                    self.content.push(byte);
                }
            }

            position += 1;
        }

        Ok((None, position))
    }
}

#[derive(Debug, Clone, Copy)]
enum BulkKind {
    String,
    Error,
    Verbatim,
}

#[derive(Debug)]
struct BulkCursor {
    kind: BulkKind,
    header: LineCursor,
    length: Option<usize>,
    data: Vec<u8>,
    terminated: bool,
    terminator_bytes_read: usize,
}

impl BulkCursor {
    fn new(kind: BulkKind, terminated: bool) -> Self {
        Self {
            kind,
            header: LineCursor::new(LineKind::Integer),
            length: None,
            data: Vec::new(),
            terminated,
            terminator_bytes_read: 0,
        }
    }

    fn feed(
        &mut self,
        buffer: &[u8],
        mut position: usize,
    ) -> Result<(Option<RespValue>, usize), RespError> {
        let length = match self.length {
            Some(length) => length,
            None => {
                let (header, next_position) = self.header.feed(buffer, position)?;
                position = next_position;

                let Some(header) = header else {
                    return Ok((None, position));
                };

                let length = parse_length(&header)?;
                self.data.reserve(length.min(MAX_PREALLOCATION));
                self.length = Some(length);
                length
            }
        };

        let missing = length - self.data.len();
        let available = missing.min(buffer.len() - position);
        self.data
            .extend_from_slice(&buffer[position..position + available]);
        position += available;

        if self.data.len() < length {
            return Ok((None, position));
        }

        if self.terminated {
            while self.terminator_bytes_read < 2 {
                let Some(&byte) = buffer.get(position) else {
                    return Ok((None, position));
                };

                let expected = if self.terminator_bytes_read == 0 {
                    b'\r'
                } else {
                    b'\n'
                };

                if byte != expected {
                    return Err(RespError::InvalidTerminator);
                }

                self.terminator_bytes_read += 1;
                position += 1;
            }
        }

        let data = std::mem::take(&mut self.data);

        let frame = match self.kind {
            BulkKind::String => RespValue::BulkString(Bytes::from(data)),
            BulkKind::Error => RespValue::BulkError(Bytes::from(data)),
            BulkKind::Verbatim => {
                if data.len() < 4 || data[3] != b':' {
                    return Err(RespError::InvalidVerbatimString);
                }

                let encoding = std::str::from_utf8(&data[..3])
                    .map_err(|_| RespError::InvalidVerbatimString)?
                    .to_string();

                RespValue::VerbatimString {
                    encoding,
                    data: Bytes::from(data).slice(4..),
                }
            }
        };

        Ok((Some(frame), position))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AggregateKind {
    Array,
    Map,
    Set,
    Push,
}

#[derive(Debug)]
struct AggregateCursor {
    kind: AggregateKind,
    header: LineCursor,
    expected_elements: Option<usize>,
    elements: Vec<RespValue>,
    child: Option<Box<FrameCursor>>,
}

impl AggregateCursor {
    fn new(kind: AggregateKind) -> Self {
        Self {
            kind,
            header: LineCursor::new(LineKind::Integer),
            expected_elements: None,
            elements: Vec::new(),
            child: None,
        }
    }

    fn feed(
        &mut self,
        buffer: &[u8],
        mut position: usize,
    ) -> Result<(Option<RespValue>, usize), RespError> {
        let expected_elements = match self.expected_elements {
            Some(expected_elements) => expected_elements,
            None => {
                let (header, next_position) = self.header.feed(buffer, position)?;
                position = next_position;

                let Some(header) = header else {
                    return Ok((None, position));
                };

                let length = parse_length(&header)?;
                let expected_elements = if self.kind == AggregateKind::Map {
                    length * 2
                } else {
                    length
                };

                self.elements
                    .reserve(expected_elements.min(MAX_PREALLOCATION));
                self.expected_elements = Some(expected_elements);
                expected_elements
            }
        };

        while self.elements.len() < expected_elements {
            let Some(&sigil) = buffer.get(position) else {
                return Ok((None, position));
            };

            // An unknown sigil leaves no child behind, so the element restarts
            // from its type byte on the next call.
            let mut child = match self.child.take() {
                Some(child) => child,
                None => {
                    let child = FrameCursor::start(sigil, false)?;
                    position += 1;
                    Box::new(child)
                }
            };

            match child.feed(buffer, position) {
                Ok((Some(element), next_position)) => {
                    self.elements.push(element);
                    position = next_position;
                }
                Ok((None, next_position)) => {
                    self.child = Some(child);
                    return Ok((None, next_position));
                }
                Err(err) => {
                    self.child = Some(child);
                    return Err(err);
                }
            }
        }

        let elements = std::mem::take(&mut self.elements);

        let frame = match self.kind {
            AggregateKind::Array => RespValue::Array(elements),
            AggregateKind::Set => RespValue::Set(elements),
            AggregateKind::Push => RespValue::Push(elements),
            AggregateKind::Map => {
                let mut pairs = Vec::with_capacity(elements.len() / 2);
                let mut iter = elements.into_iter();

                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    pairs.push((key, value));
                }

                RespValue::Map(pairs)
            }
        };

        Ok((Some(frame), position))
    }
}

const MAX_PREALLOCATION: usize = 64 * 1024;

fn into_utf8(content: Vec<u8>) -> Result<String, RespError> {
    String::from_utf8(content).map_err(|_| RespError::InvalidUtf8)
}

fn parse_integer(content: &[u8]) -> Result<i64, RespError> {
    std::str::from_utf8(content)
        .map_err(|_| RespError::InvalidInteger)?
        .parse::<i64>()
        .map_err(|_| RespError::InvalidInteger)
}

fn parse_length(content: &[u8]) -> Result<usize, RespError> {
    let length = parse_integer(content)?;

    usize::try_from(length).map_err(|_| RespError::NegativeLength(length))
}
