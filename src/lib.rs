//! A Redis-compatible server with primary/replica replication.
//!
//! - RESP2/RESP3 codec that resumes across partial reads ([`resp`], [`input`])
//! - String keys with expiry and append-only streams ([`key_value_store`], [`stream`])
//! - Replication: handshake, full resync, propagation with a byte-exact
//!   offset and `WAIT` ([`replication`])
//! - Blocking `WAIT` and `XREAD` on a shared predicate wait ([`blocking`])
//! - RDB snapshot loading and dumping ([`rdb`])

pub mod blocking;
pub mod commands;
pub mod connection;
pub mod daemon;
pub mod input;
pub mod key_value_store;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
pub mod state;
pub mod stream;
