//! PSYNC command implementation for Redis replication synchronization.
//!
//! Only full resynchronization is offered: whatever replication ID and
//! offset the replica asks for, the primary answers with `FULLRESYNC`
//! followed by a snapshot of its store.

use std::sync::Arc;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    replication::is_valid_repl_id,
    server::RedisServer,
};

/// Represents the parsed arguments for the PSYNC command.
pub struct PsyncArguments {
    /// The replication ID the replica last followed, or `?` for none.
    pub replication_id: Option<String>,
    /// The replica's offset in that history, or `-1` for none.
    pub offset: i64,
}

impl PsyncArguments {
    /// Parses and validates arguments for the PSYNC command.
    ///
    /// # Returns
    ///
    /// * `Ok(PsyncArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::InvalidPsyncCommand)` - If not exactly 2 arguments
    /// * `Err(CommandError::InvalidPsyncReplicationId)` - If the ID is neither `?` nor 40 alphanumerics
    /// * `Err(CommandError::InvalidPsyncOffset)` - If offset is not an integer of at least -1
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [replication_id, offset] =
            <[String; 2]>::try_from(arguments).map_err(|_| CommandError::InvalidPsyncCommand)?;

        let replication_id = match replication_id.as_str() {
            "?" => None,
            id if is_valid_repl_id(id) => Some(replication_id),
            _ => return Err(CommandError::InvalidPsyncReplicationId),
        };

        let offset = offset
            .parse::<i64>()
            .ok()
            .filter(|offset| *offset >= -1)
            .ok_or(CommandError::InvalidPsyncOffset)?;

        Ok(Self {
            replication_id,
            offset,
        })
    }
}

/// Handles the Redis PSYNC command.
///
/// The reply itself (`+FULLRESYNC <id> <offset>` plus the snapshot) is
/// written by the connection once it sees [`CommandResult::Sync`], since the
/// connection is the one that turns into a replica stream.
pub async fn psync(
    server: Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    PsyncArguments::parse(arguments)?;

    if !server.replication.is_master() {
        return Err(CommandError::InvalidPsyncCommandForReplica);
    }

    Ok(CommandResult::Sync)
}
