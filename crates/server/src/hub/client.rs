//! Per-client transport pumps.
//!
//! Each connected client gets one reader task and one writer task. The
//! reader decodes frames into commands and hands them to the router under a
//! read deadline; the writer drains the bounded outbound queue to the
//! transport under a write deadline, interleaving heartbeats. Either task
//! exiting unregisters the client.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::hub::SessionHub;
use crate::net::{FrameReader, FrameWriter};
use crate::protocol::{self, ServerMessage};
use crate::router::CommandRouter;

/// Unique identifier for a connected client. Never a pointer or connection
/// address; always an explicit id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl ClientId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Wire up a registered client's reader and writer tasks.
pub fn spawn_client(
    hub: Arc<SessionHub>,
    router: Arc<CommandRouter>,
    client: ClientId,
    reader: Box<dyn FrameReader>,
    writer: Box<dyn FrameWriter>,
    receiver: mpsc::Receiver<ServerMessage>,
    config: &ServerConfig,
) {
    tokio::spawn(run_writer(
        Arc::clone(&hub),
        client,
        writer,
        receiver,
        config.clone(),
    ));
    tokio::spawn(run_reader(hub, router, client, reader, config.clone()));
}

/// Drain the outbound queue to the transport. Exits when the queue closes
/// (unregister dropped the sender) or a write misses its deadline.
async fn run_writer(
    hub: Arc<SessionHub>,
    client: ClientId,
    mut writer: Box<dyn FrameWriter>,
    mut receiver: mpsc::Receiver<ServerMessage>,
    config: ServerConfig,
) {
    let mut heartbeat = interval(config.heartbeat_interval);
    heartbeat.tick().await; // the first tick fires immediately

    loop {
        let message = tokio::select! {
            queued = receiver.recv() => match queued {
                Some(message) => message,
                None => break,
            },
            _ = heartbeat.tick() => ServerMessage::Heartbeat,
        };

        let payload = match protocol::encode_message(&message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(client = %client, error = %err, "failed to encode outbound message");
                continue;
            }
        };

        match timeout(config.write_deadline, writer.write_frame(&payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(client = %client, error = %err, "write failed; closing client");
                break;
            }
            Err(_) => {
                debug!(client = %client, "write deadline exceeded; closing client");
                break;
            }
        }
    }

    hub.unregister(client);
}

/// Decode inbound frames and dispatch them. The read deadline resets on
/// every frame; missing it closes the client.
async fn run_reader(
    hub: Arc<SessionHub>,
    router: Arc<CommandRouter>,
    client: ClientId,
    mut reader: Box<dyn FrameReader>,
    config: ServerConfig,
) {
    loop {
        let frame = match timeout(config.read_deadline, reader.read_frame()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                debug!(client = %client, "transport closed");
                break;
            }
            Ok(Err(err)) => {
                debug!(client = %client, error = %err, "read failed; closing client");
                break;
            }
            Err(_) => {
                debug!(client = %client, "read deadline exceeded; closing client");
                break;
            }
        };

        match protocol::decode_command(&frame) {
            Ok(command) => router.dispatch(client, command),
            Err(err) => hub.send_to_client(client, ServerMessage::error(&err)),
        }
    }

    hub.unregister(client);
}
