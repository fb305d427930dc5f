use std::sync::Arc;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
};

pub struct ConfigGetArguments {
    pub parameters: Vec<String>,
}

impl ConfigGetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::InvalidConfigGetCommand);
        }

        Ok(ConfigGetArguments {
            parameters: arguments,
        })
    }
}

pub async fn config_get(
    server: Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let config_get_arguments = ConfigGetArguments::parse(arguments)?;
    let mut response = Vec::new();

    for parameter in config_get_arguments.parameters {
        let value = match parameter.to_lowercase().as_str() {
            "dir" => &server.config.dir,
            "dbfilename" => &server.config.dbfilename,
            _ => return Err(CommandError::InvalidConfigGetCommandArgument),
        };

        response.push(RespValue::bulk_string(&parameter.to_lowercase()));
        response.push(RespValue::bulk_string(value));
    }

    Ok(CommandResult::Response(RespValue::Array(response)))
}
