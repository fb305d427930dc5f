use std::sync::Arc;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
};

/// Only the replication section exists, so `INFO` and `INFO replication`
/// produce the same report.
pub struct InfoArguments;

impl InfoArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::InvalidInfoCommand);
        }

        match arguments.first() {
            Some(section) if !section.eq_ignore_ascii_case("replication") => {
                Err(CommandError::InvalidInfoSection)
            }
            _ => Ok(InfoArguments),
        }
    }
}

/// Replication report: role, connected replica count, replication id and
/// offset, one `field:value` per line.
pub async fn info(
    server: Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    InfoArguments::parse(arguments)?;
    let replication = &server.replication;

    let lines = [
        format!("role:{}", replication.role().as_info_role()),
        format!("connected_slaves:{}", replication.replica_count().await),
        format!("master_replid:{}", replication.replication_id()),
        format!("master_repl_offset:{}", replication.offset()),
    ];

    Ok(CommandResult::Response(RespValue::bulk_string(
        &lines.join("\r\n"),
    )))
}
