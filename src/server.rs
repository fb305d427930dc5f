use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, RwLock},
};
use tracing::{info, warn};

use crate::{
    connection::{handle_client_connection, handle_master_connection},
    daemon::run_expiry_sweeper,
    key_value_store::KeyValueStore,
    rdb::load_rdb_file,
    replication::{generate_replication_id, handshake, RedisRole, Replication},
    state::State,
};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    InvalidCommandLine(#[from] clap::Error),
}

/// Command line configuration.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, default_value_t = 6379)]
    pub port: u16,
    /// Directory holding the snapshot file
    #[arg(long, default_value = ".")]
    pub dir: String,
    /// Name of the snapshot file
    #[arg(long, default_value = "dump.rdb")]
    pub dbfilename: String,
    /// Primary to replicate from, as "<host> <port>"
    #[arg(long, value_parser = parse_replica_of)]
    pub replicaof: Option<(String, u16)>,
}

fn parse_replica_of(value: &str) -> Result<(String, u16), String> {
    let mut parts = value.split_whitespace();

    let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected \"<host> <port>\", got \"{}\"", value));
    };

    let port = port
        .parse::<u16>()
        .map_err(|_| format!("invalid primary port \"{}\"", port))?;

    Ok((host.to_string(), port))
}

#[derive(Debug)]
pub struct RedisServer {
    pub config: ServerConfig,
    pub replication: Arc<Replication>,
}

impl RedisServer {
    pub fn new<I, T>(command_line_args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = ServerConfig::try_parse_from(command_line_args)?;

        Ok(Self::from_config(config))
    }

    pub fn from_config(config: ServerConfig) -> Self {
        let role = match &config.replicaof {
            Some(primary) => RedisRole::Replica(primary.clone()),
            None => RedisRole::Master,
        };

        Self {
            config,
            replication: Arc::new(Replication::new(role, generate_replication_id(), 0)),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(("127.0.0.1", self.config.port))
            .await
            .with_context(|| format!("failed to bind port {}", self.config.port))?;

        self.serve(listener).await
    }

    /// Loads the snapshot file, replicates from the primary when configured
    /// as a replica, then accepts clients on `listener` forever.
    pub async fn serve(mut self, listener: TcpListener) -> anyhow::Result<()> {
        let store = Arc::new(RwLock::new(KeyValueStore::new()));
        let state = Arc::new(Mutex::new(State::new()));

        let loaded_keys = load_rdb_file(
            &self.config.dir,
            &self.config.dbfilename,
            &mut *store.write().await,
        )
        .await
        .context("failed to load snapshot file")?;

        let listening_port = listener.local_addr()?.port();
        info!(
            port = listening_port,
            role = self.replication.role().as_info_role(),
            loaded_keys,
            "server listening"
        );

        let upstream = match self.replication.role().clone() {
            RedisRole::Master => None,
            RedisRole::Replica((host, port)) => {
                let stream = TcpStream::connect((host.as_str(), port))
                    .await
                    .with_context(|| format!("failed to connect to primary {}:{}", host, port))?;
                let (read_half, mut write_half) = stream.into_split();

                let (full_resync, reader) = handshake(
                    read_half,
                    &mut write_half,
                    listening_port,
                    &mut *store.write().await,
                )
                .await
                .context("replication handshake failed")?;

                self.replication = Arc::new(Replication::new(
                    RedisRole::Replica((host, port)),
                    full_resync.replication_id,
                    full_resync.offset,
                ));

                Some((reader, write_half))
            }
        };

        let server = Arc::new(self);

        tokio::spawn(run_expiry_sweeper(Arc::clone(&store)));

        if let Some((reader, writer)) = upstream {
            tokio::spawn(handle_master_connection(
                reader,
                writer,
                Arc::clone(&server),
                Arc::clone(&store),
                Arc::clone(&state),
            ));
        }

        loop {
            let (stream, client_address) = match listener.accept().await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let (reader, writer) = stream.into_split();

            tokio::spawn(handle_client_connection(
                reader,
                writer,
                client_address.to_string(),
                Arc::clone(&server),
                Arc::clone(&store),
                Arc::clone(&state),
            ));
        }
    }
}
