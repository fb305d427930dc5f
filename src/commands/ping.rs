use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
};

pub struct PingArguments {
    message: Option<String>,
}

impl PingArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::InvalidPingCommand);
        }

        Ok(Self {
            message: arguments.into_iter().next(),
        })
    }
}

/// Replies `PONG`, or echoes the optional message as a bulk string.
pub fn ping(arguments: Vec<String>) -> Result<CommandResult, CommandError> {
    let ping_arguments = PingArguments::parse(arguments)?;

    let response = match ping_arguments.message {
        Some(message) => RespValue::bulk_string(&message),
        None => RespValue::simple_string("PONG"),
    };

    Ok(CommandResult::Response(response))
}
