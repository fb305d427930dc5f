use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
};

pub struct WaitArguments {
    pub number_of_replicas: usize,
    /// `None` waits until enough replicas acknowledged.
    pub timeout: Option<Duration>,
}

impl WaitArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [number_of_replicas, timeout] =
            <[String; 2]>::try_from(arguments).map_err(|_| CommandError::InvalidWaitCommand)?;

        let number_of_replicas = number_of_replicas
            .parse::<usize>()
            .map_err(|_| CommandError::InvalidWaitCommandArgument)?;

        let timeout = match timeout
            .parse::<u64>()
            .map_err(|_| CommandError::InvalidWaitCommandArgument)?
        {
            0 => None,
            milliseconds => Some(Duration::from_millis(milliseconds)),
        };

        Ok(Self {
            number_of_replicas,
            timeout,
        })
    }
}

/// Waits until `numreplicas` replicas acknowledged every write propagated
/// before this call, or until the timeout elapses, and replies with the
/// number of replicas that did.
///
/// Replicas are asked for their offset with a propagated
/// `REPLCONF GETACK *`; their `ACK`s arrive on their own connections and
/// wake this wait through the acknowledgement condition.
pub async fn wait(
    server: Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let wait_arguments = WaitArguments::parse(arguments)?;
    let replication = &server.replication;

    if !replication.is_master() {
        return Err(CommandError::InvalidWaitCommandForReplica);
    }

    if wait_arguments.number_of_replicas == 0 {
        return Ok(CommandResult::Response(RespValue::Integer(0)));
    }

    let target_offset = replication.offset();

    if target_offset == 0 {
        let replica_count = replication.replica_count().await;
        return Ok(CommandResult::Response(RespValue::Integer(
            replica_count as i64,
        )));
    }

    let acknowledged = replication.acknowledged_count(target_offset);
    if acknowledged >= wait_arguments.number_of_replicas {
        return Ok(CommandResult::Response(RespValue::Integer(
            acknowledged as i64,
        )));
    }

    replication
        .lock_propagation()
        .await
        .propagate(&RespValue::command(&["REPLCONF", "GETACK", "*"]));

    debug!(
        target_offset,
        number_of_replicas = wait_arguments.number_of_replicas,
        timeout = ?wait_arguments.timeout,
        "waiting for replica acknowledgements"
    );

    let acknowledged = replication
        .wait_for_acknowledgements(
            wait_arguments.number_of_replicas,
            target_offset,
            wait_arguments.timeout,
        )
        .await;

    Ok(CommandResult::Response(RespValue::Integer(
        acknowledged as i64,
    )))
}
