use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::{Mutex, RwLock};

use crate::{
    commands::{
        command_error::CommandError,
        config_get::{ConfigGetArguments, config_get},
        echo::{EchoArguments, echo},
        get::{GetArguments, get},
        incr::{IncrArguments, incr},
        info::{InfoArguments, info},
        keys::{KeysArguments, keys},
        ping::{PingArguments, ping},
        replication::{PsyncArguments, ReplconfArguments, WaitArguments, psync, replconf, wait},
        set::{SetArguments, set, store_string},
        transactions::{DiscardArguments, ExecArguments, MultiArguments, discard, exec, multi},
        type_command::{TypeArguments, type_command},
        xadd::{XaddArguments, xadd},
        xrange::{XrangeArguments, xrange},
        xread::{XreadArguments, xread},
    },
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::RedisServer,
    state::State,
};

const WRITE_COMMANDS: [&str; 3] = ["SET", "INCR", "XADD"];
const TRANSACTION_COMMANDS: [&str; 3] = ["MULTI", "EXEC", "DISCARD"];
const MASTER_CONNECTION: &str = "master";

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    NoResponse,
    Response(RespValue),
    /// `PSYNC` accepted; the connection must start a full resync.
    Sync,
    /// `EXEC` with queued commands; the connection runs them.
    Batch(Vec<CommandHandler>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
    pub input: RespValue,
}

impl CommandHandler {
    /// Builds a command from a request frame, which must be an array of bulk
    /// strings. `CONFIG GET` is recognised as a single command name.
    pub fn new(input: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = &input else {
            return Err(CommandError::InvalidCommand);
        };

        let mut parts = Vec::with_capacity(elements.len());

        for element in elements {
            let RespValue::BulkString(data) = element else {
                return Err(CommandError::InvalidCommandArgument);
            };

            let part = String::from_utf8(data.to_vec())
                .map_err(|_| CommandError::InvalidCommandArgument)?;
            parts.push(part);
        }

        let mut parts = parts.into_iter();
        let Some(name) = parts.next().map(|name| name.to_uppercase()) else {
            return Err(CommandError::InvalidCommand);
        };

        let name = match name.as_str() {
            "CONFIG" => match parts.next().map(|sub_command| sub_command.to_uppercase()) {
                Some(sub_command) if sub_command == "GET" => "CONFIG GET".to_string(),
                _ => return Err(CommandError::InvalidConfigGetCommandArgument),
            },
            _ => name,
        };

        Ok(Self {
            name,
            arguments: parts.collect(),
            input,
        })
    }

    pub fn is_write_command(&self) -> bool {
        WRITE_COMMANDS.contains(&self.name.as_str())
    }

    pub fn validate_command_arguments(&self) -> Option<CommandError> {
        match self.name.as_str() {
            "PING" => PingArguments::parse(self.arguments.clone()).err(),
            "ECHO" => EchoArguments::parse(self.arguments.clone()).err(),
            "GET" => GetArguments::parse(self.arguments.clone()).err(),
            "SET" => SetArguments::parse(self.arguments.clone()).err(),
            "INCR" => IncrArguments::parse(self.arguments.clone()).err(),
            "TYPE" => TypeArguments::parse(self.arguments.clone()).err(),
            "KEYS" => KeysArguments::parse(self.arguments.clone()).err(),
            "XADD" => XaddArguments::parse(self.arguments.clone()).err(),
            "XRANGE" => XrangeArguments::parse(self.arguments.clone()).err(),
            "XREAD" => XreadArguments::parse(self.arguments.clone()).err(),
            "MULTI" => MultiArguments::parse(self.arguments.clone()).err(),
            "EXEC" => ExecArguments::parse(self.arguments.clone()).err(),
            "DISCARD" => DiscardArguments::parse(self.arguments.clone()).err(),
            "INFO" => InfoArguments::parse(self.arguments.clone()).err(),
            "REPLCONF" => ReplconfArguments::parse(self.arguments.clone()).err(),
            "PSYNC" => PsyncArguments::parse(self.arguments.clone()).err(),
            "WAIT" => WaitArguments::parse(self.arguments.clone()).err(),
            "CONFIG GET" => ConfigGetArguments::parse(self.arguments.clone()).err(),
            _ => Some(CommandError::UnknownCommand(self.name.clone())),
        }
    }

    /// Runs a command sent by a client.
    ///
    /// Inside `MULTI` the command is validated and queued instead. Write
    /// commands are refused on a replica; on a primary they run under the
    /// propagation lock and are propagated once they succeed.
    pub async fn handle_command(
        &self,
        client_address: &str,
        server: Arc<RedisServer>,
        store: Arc<RwLock<KeyValueStore>>,
        state: Arc<Mutex<State>>,
    ) -> Result<CommandResult, CommandError> {
        if let Some(response) = self
            .queue_command_if_in_transaction(client_address, Arc::clone(&state))
            .await?
        {
            return Ok(CommandResult::Response(response));
        }

        if self.is_write_command() {
            if !server.replication.is_master() {
                return Err(CommandError::ReplicaReadOnlyCommands);
            }

            return self.run_write_command(server, store, state).await;
        }

        match self.name.as_str() {
            "PING" => ping(self.arguments.clone()),
            "ECHO" => echo(self.arguments.clone()),
            "GET" => get(store, self.arguments.clone()).await,
            "TYPE" => type_command(store, self.arguments.clone()).await,
            "KEYS" => keys(store, self.arguments.clone()).await,
            "XRANGE" => xrange(store, self.arguments.clone()).await,
            "XREAD" => xread(store, state, self.arguments.clone()).await,
            "MULTI" => multi(client_address, state, self.arguments.clone()).await,
            "EXEC" => exec(client_address, state, self.arguments.clone()).await,
            "DISCARD" => discard(client_address, state, self.arguments.clone()).await,
            "INFO" => info(server, self.arguments.clone()).await,
            "REPLCONF" => replconf(client_address, server, self.arguments.clone()).await,
            "PSYNC" => psync(server, self.arguments.clone()).await,
            "WAIT" => wait(server, self.arguments.clone()).await,
            "CONFIG GET" => config_get(server, self.arguments.clone()).await,
            _ => Err(CommandError::UnknownCommand(self.name.clone())),
        }
    }

    /// Applies a command received on a replica's upstream primary connection.
    ///
    /// Everything is applied silently except `REPLCONF GETACK`, whose
    /// `REPLCONF ACK` reply goes back to the primary.
    pub async fn handle_command_from_master(
        &self,
        server: Arc<RedisServer>,
        store: Arc<RwLock<KeyValueStore>>,
        state: Arc<Mutex<State>>,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "SET" => {
                set(store, self.arguments.clone()).await?;
            }
            "INCR" => {
                incr(store, self.arguments.clone()).await?;
            }
            "XADD" => {
                xadd(store, state, self.arguments.clone()).await?;
            }
            "REPLCONF" => {
                return replconf(MASTER_CONNECTION, server, self.arguments.clone()).await;
            }
            "PING" => {}
            _ => return Err(CommandError::UnknownCommand(self.name.clone())),
        }

        Ok(CommandResult::NoResponse)
    }

    async fn run_write_command(
        &self,
        server: Arc<RedisServer>,
        store: Arc<RwLock<KeyValueStore>>,
        state: Arc<Mutex<State>>,
    ) -> Result<CommandResult, CommandError> {
        let mut propagation = server.replication.lock_propagation().await;

        let (response, propagated) = match self.name.as_str() {
            "SET" => {
                let expiration = store_string(store, self.arguments.clone()).await?;

                (
                    CommandResult::Response(RespValue::simple_string("OK")),
                    self.propagated_set(expiration),
                )
            }
            "INCR" => (
                incr(store, self.arguments.clone()).await?,
                self.input.clone(),
            ),
            "XADD" => {
                let id = xadd(store, state, self.arguments.clone()).await?;

                // Replicas must store the entry under the ID assigned here.
                let mut parts: Vec<&str> = Vec::with_capacity(self.arguments.len() + 1);
                parts.push("XADD");
                parts.extend(self.arguments.iter().map(String::as_str));
                if let Some(requested_id) = parts.get_mut(2) {
                    *requested_id = &id;
                }

                (
                    CommandResult::Response(RespValue::bulk_string(&id)),
                    RespValue::command(&parts),
                )
            }
            _ => return Err(CommandError::UnknownCommand(self.name.clone())),
        };

        propagation.propagate(&propagated);

        Ok(response)
    }

    /// `SET` as sent to replicas: a relative `PX`/`EX` is replaced by the
    /// absolute `PXAT` the primary stored.
    fn propagated_set(&self, expiration: Option<Timestamp>) -> RespValue {
        match (expiration, self.arguments.as_slice()) {
            (Some(expiration), [key, value, ..]) => RespValue::command(&[
                "SET",
                key.as_str(),
                value.as_str(),
                "PXAT",
                &expiration.as_millisecond().to_string(),
            ]),
            _ => self.input.clone(),
        }
    }

    async fn queue_command_if_in_transaction(
        &self,
        client_address: &str,
        state: Arc<Mutex<State>>,
    ) -> Result<Option<RespValue>, CommandError> {
        if TRANSACTION_COMMANDS.contains(&self.name.as_str()) {
            return Ok(None);
        }

        let mut state_guard = state.lock().await;

        let Some(_) = state_guard.get_transaction(client_address) else {
            return Ok(None);
        };

        if let Some(err) = self.validate_command_arguments() {
            return Err(err);
        }

        state_guard.add_to_transaction(client_address, self.clone())?;

        Ok(Some(RespValue::simple_string("QUEUED")))
    }
}
