use thiserror::Error;

use crate::{resp::RespValue, state::StateError, stream::StreamIdError};

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("invalid command")]
    InvalidCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid command argument")]
    InvalidCommandArgument,
    #[error("wrong number of arguments for 'ping' command")]
    InvalidPingCommand,
    #[error("wrong number of arguments for 'echo' command")]
    InvalidEchoCommand,
    #[error("wrong number of arguments for 'get' command")]
    InvalidGetCommand,
    #[error("wrong number of arguments for 'set' command")]
    InvalidSetCommand,
    #[error("syntax error")]
    InvalidSetCommandArgument,
    #[error("invalid expire time in 'set' command")]
    InvalidSetCommandExpiration,
    #[error("wrong number of arguments for 'type' command")]
    InvalidTypeCommand,
    #[error("wrong number of arguments for 'keys' command")]
    InvalidKeysCommand,
    #[error("invalid pattern for 'keys' command")]
    InvalidKeysPattern,
    #[error("wrong number of arguments for 'xadd' command")]
    InvalidXAddCommand,
    #[error("{0}")]
    InvalidStreamId(#[from] StreamIdError),
    #[error("Operation against a key holding the wrong kind of value")]
    InvalidDataTypeForKey,
    #[error("wrong number of arguments for 'xrange' command")]
    InvalidXRangeCommand,
    #[error("wrong number of arguments for 'xread' command")]
    InvalidXReadCommand,
    #[error("syntax error in 'xread' command")]
    InvalidXReadOption,
    #[error("timeout is not an integer or out of range")]
    InvalidXReadBlockDuration,
    #[error("wrong number of arguments for 'incr' command")]
    InvalidIncrCommand,
    #[error("value is not an integer or out of range")]
    InvalidIncrValue,
    #[error("wrong number of arguments for 'multi' command")]
    InvalidMultiCommand,
    #[error("{0}")]
    TransactionError(#[from] StateError),
    #[error("wrong number of arguments for 'exec' command")]
    InvalidExecCommand,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("wrong number of arguments for 'discard' command")]
    InvalidDiscardCommand,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("wrong number of arguments for 'info' command")]
    InvalidInfoCommand,
    #[error("invalid INFO section")]
    InvalidInfoSection,
    #[error("wrong number of arguments for 'replconf' command")]
    InvalidReplconfCommand,
    #[error("invalid REPLCONF option")]
    InvalidReplconfOption,
    #[error("wrong number of arguments for 'psync' command")]
    InvalidPsyncCommand,
    #[error("invalid PSYNC replication ID")]
    InvalidPsyncReplicationId,
    #[error("invalid PSYNC offset")]
    InvalidPsyncOffset,
    #[error("PSYNC is not supported by a replica")]
    InvalidPsyncCommandForReplica,
    #[error("wrong number of arguments for 'wait' command")]
    InvalidWaitCommand,
    #[error("value is not an integer or out of range")]
    InvalidWaitCommandArgument,
    #[error("WAIT cannot be used with replica instances")]
    InvalidWaitCommandForReplica,
    #[error("You can't write against a read only replica.")]
    ReplicaReadOnlyCommands,
    #[error("wrong number of arguments for 'config|get' command")]
    InvalidConfigGetCommand,
    #[error("unknown CONFIG subcommand")]
    InvalidConfigGetCommandArgument,
}

impl CommandError {
    /// Error frame sent back to the client.
    pub fn as_resp(&self) -> RespValue {
        let prefix = match self {
            CommandError::InvalidDataTypeForKey => "WRONGTYPE",
            CommandError::ReplicaReadOnlyCommands => "READONLY",
            _ => "ERR",
        };

        RespValue::Error(format!("{} {}", prefix, self))
    }
}
