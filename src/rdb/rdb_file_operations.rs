use std::path::Path;

use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, BufReader},
};
use tracing::info;

use crate::rdb::{RdbParser, SnapshotSink};

const READ_CHUNK_SIZE: usize = 4096;

fn truncated() -> tokio::io::Error {
    tokio::io::Error::new(
        tokio::io::ErrorKind::UnexpectedEof,
        "RDB payload ended before the end-of-file opcode",
    )
}

/// Loads a complete in-memory RDB payload, such as the one received after
/// `FULLRESYNC`.
pub fn load_snapshot<S>(payload: &[u8], sink: &mut S) -> tokio::io::Result<usize>
where
    S: SnapshotSink + ?Sized,
{
    let mut rdb_parser = RdbParser::new();
    rdb_parser.parse(payload, sink)?;

    if !rdb_parser.is_complete() {
        return Err(truncated());
    }

    Ok(rdb_parser.loaded_entries())
}

async fn parse_rdb_from_reader<R, S>(reader: R, sink: &mut S) -> tokio::io::Result<usize>
where
    R: AsyncRead + Unpin,
    S: SnapshotSink + ?Sized,
{
    let mut buf_reader = BufReader::new(reader);
    let mut buffer = [0; READ_CHUNK_SIZE];
    let mut rdb_parser = RdbParser::new();

    loop {
        let n = buf_reader.read(&mut buffer).await?;

        if n == 0 {
            break;
        }

        rdb_parser.parse(&buffer[..n], sink)?;
    }

    if !rdb_parser.is_complete() {
        return Err(truncated());
    }

    Ok(rdb_parser.loaded_entries())
}

/// Loads `<directory>/<filename>` into `sink`. A missing file leaves the sink
/// untouched and is not an error.
pub async fn load_rdb_file<S>(directory: &str, filename: &str, sink: &mut S) -> tokio::io::Result<usize>
where
    S: SnapshotSink + ?Sized,
{
    let file_path = Path::new(directory).join(filename);

    let file = match File::open(&file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == tokio::io::ErrorKind::NotFound => {
            info!(path = %file_path.display(), "no RDB file, starting with an empty keyspace");
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    let loaded_entries = parse_rdb_from_reader(file, sink).await?;
    info!(path = %file_path.display(), keys = loaded_entries, "RDB file loaded");

    Ok(loaded_entries)
}
