use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::{
    input::{CommandReadError, RespReader},
    rdb::{load_snapshot, SnapshotSink},
    replication::FullResync,
    resp::RespValue,
};

#[derive(Error, Debug, PartialEq)]
pub enum HandshakeError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("{0}")]
    ReadError(#[from] CommandReadError),
    #[error("unexpected reply to {command}: {reply:?}")]
    UnexpectedReply {
        command: &'static str,
        reply: RespValue,
    },
    #[error("invalid FULLRESYNC reply: {0}")]
    InvalidFullResync(String),
    #[error("failed to load snapshot: {0}")]
    SnapshotError(String),
}

lazy_static! {
    static ref REPLICATION_ID_PATTERN: Option<Regex> = Regex::new(r"^[a-zA-Z0-9]{40}$").ok();
}

pub fn is_valid_repl_id(repl_id: &str) -> bool {
    REPLICATION_ID_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(repl_id))
}

async fn send_command<W>(writer: &mut W, parts: &[&str]) -> Result<(), HandshakeError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = RespValue::command(parts).encode();

    writer
        .write_all(&bytes)
        .await
        .map_err(|e| HandshakeError::IoError(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| HandshakeError::IoError(e.to_string()))
}

async fn expect_simple_string<R, W>(
    reader: &mut RespReader<R>,
    writer: &mut W,
    command: &'static str,
    parts: &[&str],
    expected: &str,
) -> Result<(), HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send_command(writer, parts).await?;

    let (reply, _) = reader.read_frame().await?;
    if reply != RespValue::simple_string(expected) {
        return Err(HandshakeError::UnexpectedReply { command, reply });
    }

    debug!(command, "handshake step acknowledged");
    Ok(())
}

fn parse_full_resync(reply: &RespValue) -> Result<FullResync, HandshakeError> {
    let invalid = || HandshakeError::InvalidFullResync(format!("{:?}", reply));

    let RespValue::SimpleString(line) = reply else {
        return Err(invalid());
    };

    let parts: Vec<&str> = line.split(' ').collect();
    let [keyword, replication_id, offset] = parts.as_slice() else {
        return Err(invalid());
    };

    if *keyword != "FULLRESYNC" || !is_valid_repl_id(replication_id) {
        return Err(invalid());
    }

    let offset = offset.parse::<u64>().map_err(|_| invalid())?;

    Ok(FullResync {
        replication_id: replication_id.to_string(),
        offset,
    })
}

/// Runs the replica side of the replication handshake against a primary and
/// loads the snapshot it sends into `sink`.
///
/// The returned reader keeps any command bytes the primary sent right after
/// the snapshot; it must be used for the rest of the upstream stream.
pub async fn handshake<R, W, S>(
    reader: R,
    writer: &mut W,
    listening_port: u16,
    sink: &mut S,
) -> Result<(FullResync, RespReader<R>), HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: SnapshotSink + ?Sized,
{
    let mut reader = RespReader::new(reader);
    let listening_port = listening_port.to_string();

    expect_simple_string(&mut reader, writer, "PING", &["PING"], "PONG").await?;
    expect_simple_string(
        &mut reader,
        writer,
        "REPLCONF listening-port",
        &["REPLCONF", "listening-port", &listening_port],
        "OK",
    )
    .await?;
    expect_simple_string(
        &mut reader,
        writer,
        "REPLCONF capa",
        &["REPLCONF", "capa", "eof", "capa", "psync2"],
        "OK",
    )
    .await?;

    send_command(writer, &["PSYNC", "?", "-1"]).await?;
    let (reply, _) = reader.read_frame().await?;
    let full_resync = parse_full_resync(&reply)?;

    let payload = reader.read_snapshot_payload().await?;
    let loaded_keys = load_snapshot(&payload, sink)
        .map_err(|e| HandshakeError::SnapshotError(e.to_string()))?;

    info!(
        replication_id = %full_resync.replication_id,
        offset = full_resync.offset,
        snapshot_bytes = payload.len(),
        loaded_keys,
        "full resync completed"
    );

    Ok((full_resync, reader))
}
