//! Server binary: wires the hub, router, repositories, and TCP transport.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use game_server::hub::{self, ClientId, SessionHub};
use game_server::net::{self, FrameReader};
use game_server::protocol::Hello;
use game_server::repository::{
    CharacterRepository, DungeonRepository, InMemoryCharacterRepository,
    InMemoryDungeonRepository,
};
use game_server::router::CommandRouter;
use game_server::{ServerConfig, maintenance};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("game_server=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(?config, "starting dungeon server");

    let characters: Arc<dyn CharacterRepository> = Arc::new(InMemoryCharacterRepository::new());
    let dungeons: Arc<dyn DungeonRepository> = Arc::new(InMemoryDungeonRepository::new());
    let hub = Arc::new(SessionHub::new(
        config.queue_capacity,
        Arc::clone(&characters),
        Arc::clone(&dungeons),
    ));
    let router = Arc::new(CommandRouter::new(
        Arc::clone(&hub),
        Arc::clone(&characters),
        Arc::clone(&dungeons),
    ));

    maintenance::spawn_maintenance(Arc::clone(&dungeons), &config);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening for clients");

    loop {
        let (stream, peer) = listener.accept().await?;
        let hub = Arc::clone(&hub);
        let router = Arc::clone(&router);
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(error) = accept_client(hub, router, stream, config).await {
                warn!(%peer, %error, "client setup failed");
            }
        });
    }
}

/// Read the hello frame, bind the connection to its character, and hand the
/// framed halves to the hub's pump tasks.
async fn accept_client(
    hub: Arc<SessionHub>,
    router: Arc<CommandRouter>,
    stream: TcpStream,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let (mut reader, writer) = net::split_stream(stream);

    let frame = timeout(config.read_deadline, reader.read_frame())
        .await
        .context("hello deadline exceeded")??
        .context("connection closed before hello")?;
    let hello: Hello = serde_json::from_slice(&frame).context("malformed hello frame")?;

    let client = ClientId::random();
    let receiver = hub.register(client, hello.character_id);
    hub::spawn_client(
        hub,
        router,
        client,
        Box::new(reader),
        Box::new(writer),
        receiver,
        &config,
    );
    Ok(())
}
