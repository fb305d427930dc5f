use std::{collections::BTreeMap, fmt, ops::Bound};

use thiserror::Error;

pub type StreamFields = Vec<(String, String)>;

#[derive(Error, Debug, PartialEq)]
pub enum StreamIdError {
    #[error("The ID specified in XADD must be greater than 0-0")]
    ZeroId,
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    NotGreaterThanTopItem,
    #[error("Invalid stream ID format")]
    InvalidFormat,
}

/// `<milliseconds>-<sequence>` identifier of a stream entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamId {
    pub milliseconds: u64,
    pub sequence: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId::new(0, 0);
    pub const MAX: StreamId = StreamId::new(u64::MAX, u64::MAX);

    pub const fn new(milliseconds: u64, sequence: u64) -> Self {
        Self {
            milliseconds,
            sequence,
        }
    }

    /// Parses `ms-seq`, or a bare `ms` which stands for `ms-0`.
    pub fn parse(input: &str) -> Result<Self, StreamIdError> {
        match input.split_once('-') {
            Some((milliseconds, sequence)) => Ok(Self::new(
                parse_part(milliseconds)?,
                parse_part(sequence)?,
            )),
            None => Ok(Self::new(parse_part(input)?, 0)),
        }
    }

    /// Parses an XRANGE boundary. `-` and `+` are the smallest and largest
    /// possible IDs, and a bare `ms` end boundary covers every sequence of
    /// that millisecond.
    pub fn parse_range_bound(input: &str, is_end: bool) -> Result<Self, StreamIdError> {
        match input {
            "-" => Ok(Self::MIN),
            "+" => Ok(Self::MAX),
            _ if is_end && !input.contains('-') => {
                Ok(Self::new(parse_part(input)?, u64::MAX))
            }
            _ => Self::parse(input),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.milliseconds, self.sequence)
    }
}

fn parse_part(part: &str) -> Result<u64, StreamIdError> {
    if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(StreamIdError::InvalidFormat);
    }

    part.parse::<u64>().map_err(|_| StreamIdError::InvalidFormat)
}

/// ID requested by XADD, with `*` wildcards still unresolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestedStreamId {
    Auto,
    AutoSequence(u64),
    Explicit(StreamId),
}

impl RequestedStreamId {
    pub fn parse(input: &str) -> Result<Self, StreamIdError> {
        if input == "*" {
            return Ok(RequestedStreamId::Auto);
        }

        let Some((milliseconds, sequence)) = input.split_once('-') else {
            return Err(StreamIdError::InvalidFormat);
        };

        let milliseconds = parse_part(milliseconds)?;

        if sequence == "*" {
            return Ok(RequestedStreamId::AutoSequence(milliseconds));
        }

        Ok(RequestedStreamId::Explicit(StreamId::new(
            milliseconds,
            parse_part(sequence)?,
        )))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    entries: BTreeMap<StreamId, StreamFields>,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_id(&self) -> Option<StreamId> {
        self.entries.keys().next_back().copied()
    }

    /// Resolves a requested ID against the current top item.
    ///
    /// An empty stream behaves as if its top item were `0-0`, which is why
    /// `0-*` on an empty stream yields `0-1`.
    pub fn next_id(
        &self,
        requested: RequestedStreamId,
        now_milliseconds: u64,
    ) -> Result<StreamId, StreamIdError> {
        let last = self.last_id().unwrap_or(StreamId::MIN);

        match requested {
            RequestedStreamId::Auto => {
                let milliseconds = now_milliseconds.max(last.milliseconds);
                next_in_millisecond(last, milliseconds)
            }
            RequestedStreamId::AutoSequence(milliseconds) => {
                if milliseconds < last.milliseconds {
                    return Err(StreamIdError::NotGreaterThanTopItem);
                }

                next_in_millisecond(last, milliseconds)
            }
            RequestedStreamId::Explicit(id) => {
                if id == StreamId::MIN {
                    return Err(StreamIdError::ZeroId);
                }

                if id <= last {
                    return Err(StreamIdError::NotGreaterThanTopItem);
                }

                Ok(id)
            }
        }
    }

    /// Resolves `requested` and appends the entry under the resulting ID.
    pub fn add(
        &mut self,
        requested: RequestedStreamId,
        fields: StreamFields,
        now_milliseconds: u64,
    ) -> Result<StreamId, StreamIdError> {
        let id = self.next_id(requested, now_milliseconds)?;
        self.entries.insert(id, fields);

        Ok(id)
    }

    /// Entries with `start <= id <= end`, in ascending order.
    pub fn range(&self, start: StreamId, end: StreamId) -> Vec<(&StreamId, &StreamFields)> {
        if start > end {
            return Vec::new();
        }

        self.entries.range(start..=end).collect()
    }

    /// Entries strictly after `id`, in ascending order.
    pub fn entries_after(&self, id: StreamId) -> Vec<(&StreamId, &StreamFields)> {
        self.entries
            .range((Bound::Excluded(id), Bound::Unbounded))
            .collect()
    }
}

fn next_in_millisecond(last: StreamId, milliseconds: u64) -> Result<StreamId, StreamIdError> {
    if milliseconds > last.milliseconds {
        return Ok(StreamId::new(milliseconds, 0));
    }

    let sequence = last
        .sequence
        .checked_add(1)
        .ok_or(StreamIdError::NotGreaterThanTopItem)?;

    Ok(StreamId::new(milliseconds, sequence))
}
