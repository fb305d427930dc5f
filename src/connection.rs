use std::sync::Arc;

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    sync::{Mutex, RwLock},
};
use tracing::{debug, error, info, warn};

use crate::{
    commands::{CommandHandler, CommandResult, run_transaction_commands},
    input::{CommandReadError, RespReader},
    key_value_store::KeyValueStore,
    replication::start_full_resync,
    resp::RespValue,
    server::RedisServer,
    state::State,
};

/// Serves one client until it disconnects.
///
/// The writer is shared because a client that issues `PSYNC` becomes a
/// replica: its forwarding task writes propagated commands to the same
/// connection while this loop keeps reading its `REPLCONF ACK`s. From then
/// on the connection carries only the replication stream, so replies to
/// anything the replica sends are dropped.
pub async fn handle_client_connection<R, W>(
    reader: R,
    writer: W,
    client_address: String,
    server: Arc<RedisServer>,
    store: Arc<RwLock<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = RespReader::new(reader);
    let writer = Arc::new(Mutex::new(writer));
    let mut is_replica = false;

    debug!(client = %client_address, "client connected");

    loop {
        let input = match reader.read_frame().await {
            Ok((input, _)) => input,
            Err(CommandReadError::ConnectionClosed) => break,
            Err(e) => {
                warn!(client = %client_address, error = %e, "closing connection after read error");
                let _ = write_response(&writer, &e.as_resp()).await;
                break;
            }
        };

        let response = match CommandHandler::new(input) {
            Ok(command) => match command
                .handle_command(
                    &client_address,
                    Arc::clone(&server),
                    Arc::clone(&store),
                    Arc::clone(&state),
                )
                .await
            {
                Ok(CommandResult::NoResponse) => None,
                Ok(CommandResult::Response(response)) => Some(response),
                Ok(CommandResult::Sync) => {
                    if let Err(e) = start_full_resync(
                        &client_address,
                        Arc::clone(&writer),
                        Arc::clone(&server.replication),
                        Arc::clone(&store),
                    )
                    .await
                    {
                        warn!(client = %client_address, error = %e, "full resync failed");
                        break;
                    }

                    is_replica = true;
                    None
                }
                Ok(CommandResult::Batch(commands)) => Some(
                    run_transaction_commands(
                        &client_address,
                        Arc::clone(&server),
                        Arc::clone(&store),
                        Arc::clone(&state),
                        commands,
                    )
                    .await,
                ),
                Err(e) => Some(e.as_resp()),
            },
            Err(e) => Some(e.as_resp()),
        };

        if is_replica {
            if let Some(response) = response {
                debug!(replica = %client_address, ?response, "dropping reply to replica");
            }
            continue;
        }

        if let Some(response) = response {
            if let Err(e) = write_response(&writer, &response).await {
                warn!(client = %client_address, error = %e, "failed to write response");
                break;
            }
        }
    }

    if server.replication.unregister_replica(&client_address).await {
        info!(replica = %client_address, "replica disconnected");
    }

    let _ = state.lock().await.remove_transaction(&client_address);

    debug!(client = %client_address, "client disconnected");
}

/// Applies the command stream a replica receives from its primary.
///
/// The replica's offset advances by the exact wire length of every frame
/// once it has been handled, so a `REPLCONF GETACK` reports the offset
/// reached before the `GETACK` itself.
pub async fn handle_master_connection<R, W>(
    mut reader: RespReader<R>,
    mut writer: W,
    server: Arc<RedisServer>,
    store: Arc<RwLock<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let (input, frame_length) = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(CommandReadError::ConnectionClosed) => {
                info!("primary closed the replication stream");
                break;
            }
            Err(e) => {
                error!(error = %e, "replication stream is corrupt, stopping");
                break;
            }
        };

        let offset_before = server.replication.offset();

        match CommandHandler::new(input) {
            Ok(command) => match command
                .handle_command_from_master(
                    Arc::clone(&server),
                    Arc::clone(&store),
                    Arc::clone(&state),
                )
                .await
            {
                Ok(CommandResult::Response(response)) => {
                    if let Err(e) = write_to_stream(&mut writer, &response).await {
                        error!(error = %e, "failed to reply to primary");
                        break;
                    }
                }
                Ok(_) => (),
                Err(e) => warn!(command = %command.name, error = %e, "failed to apply replicated command"),
            },
            Err(e) => warn!(error = %e, "ignoring malformed replicated command"),
        }

        if let Err(actual) = server
            .replication
            .advance_offset(offset_before, frame_length as u64)
        {
            error!(
                expected = offset_before,
                actual, "replication offset moved concurrently"
            );
        }
    }
}

async fn write_response<W>(writer: &Mutex<W>, response: &RespValue) -> tokio::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer_guard = writer.lock().await;
    write_to_stream(&mut *writer_guard, response).await
}

async fn write_to_stream<W>(writer: &mut W, response: &RespValue) -> tokio::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.encode()).await?;
    writer.flush().await?;

    Ok(())
}
