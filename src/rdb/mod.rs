mod encoding;
mod get_slice;
mod opcode;
mod rdb_file_operations;
mod rdb_parser;
mod rdb_writer;

use jiff::Timestamp;

pub use rdb_file_operations::{load_rdb_file, load_snapshot};
pub use rdb_parser::RdbParser;
pub use rdb_writer::dump_rdb;

/// Receiver of decoded snapshot entries.
pub trait SnapshotSink {
    /// Drops every existing key; `size_hint` is the expected number of keys.
    fn reset_with_size_hint(&mut self, size_hint: usize);

    /// Stores an entry as-is, without expiry or type checks.
    fn set_unchecked(&mut self, key: String, value: String, expiration: Option<Timestamp>);
}
