//! REPLCONF command implementation for Redis replication configuration.
//!
//! Replicas send `listening-port` and `capa` during the handshake and
//! `ACK <offset>` whenever the primary asks with `GETACK *`.

use std::sync::Arc;

use tracing::debug;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
};

#[derive(Debug, PartialEq)]
enum ReplconfConfiguration {
    ListeningPort(u16),
    Capabilities(Vec<String>),
    GetAck,
    Ack(u64),
}

/// Represents the parsed arguments for the REPLCONF command.
pub struct ReplconfArguments {
    configuration: ReplconfConfiguration,
}

impl ReplconfArguments {
    /// Parses and validates arguments for the REPLCONF command.
    ///
    /// Accepted forms are `listening-port <port>`, `capa <name> [capa <name> ...]`,
    /// `getack *` and `ack <offset>`.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 2 || arguments.len() % 2 != 0 {
            return Err(CommandError::InvalidReplconfCommand);
        }

        let option = arguments[0].to_lowercase();

        let configuration = match (option.as_str(), arguments.len()) {
            ("listening-port", 2) => ReplconfConfiguration::ListeningPort(
                arguments[1]
                    .parse::<u16>()
                    .map_err(|_| CommandError::InvalidReplconfOption)?,
            ),
            ("capa", _) => {
                let mut capabilities = Vec::with_capacity(arguments.len() / 2);

                for pair in arguments.chunks(2) {
                    if pair[0].to_lowercase() != "capa" {
                        return Err(CommandError::InvalidReplconfOption);
                    }

                    capabilities.push(pair[1].clone());
                }

                ReplconfConfiguration::Capabilities(capabilities)
            }
            ("getack", 2) if arguments[1] == "*" => ReplconfConfiguration::GetAck,
            ("ack", 2) => ReplconfConfiguration::Ack(
                arguments[1]
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidReplconfOption)?,
            ),
            _ => return Err(CommandError::InvalidReplconfOption),
        };

        Ok(Self { configuration })
    }
}

/// Handles the Redis REPLCONF command.
///
/// `ACK` is recorded against the sending replica and gets no reply; ACKs
/// from connections that never completed `PSYNC` are ignored.
/// `GETACK` answers with the offset processed before the `GETACK` itself.
pub async fn replconf(
    client_address: &str,
    server: Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let replconf_arguments = ReplconfArguments::parse(arguments)?;

    match replconf_arguments.configuration {
        ReplconfConfiguration::ListeningPort(port) => {
            debug!(client = client_address, port, "replica listening port");
            Ok(CommandResult::Response(RespValue::simple_string("OK")))
        }
        ReplconfConfiguration::Capabilities(capabilities) => {
            debug!(client = client_address, ?capabilities, "replica capabilities");
            Ok(CommandResult::Response(RespValue::simple_string("OK")))
        }
        ReplconfConfiguration::GetAck => {
            let offset = server.replication.offset().to_string();

            Ok(CommandResult::Response(RespValue::command(&[
                "REPLCONF", "ACK", &offset,
            ])))
        }
        ReplconfConfiguration::Ack(offset) => {
            if !server
                .replication
                .record_acknowledgement(client_address, offset)
                .await
            {
                debug!(client = client_address, offset, "ignoring ACK from a non-replica");
            }

            Ok(CommandResult::NoResponse)
        }
    }
}
