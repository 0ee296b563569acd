//! Server configuration, loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// TCP bind address for the client transport.
    pub bind_addr: SocketAddr,

    /// Per-client outbound queue depth; overflowing it evicts the client.
    pub queue_capacity: usize,

    /// Inbound read deadline, reset on every frame.
    pub read_deadline: Duration,

    /// Outbound write deadline per frame.
    pub write_deadline: Duration,

    /// Interval between server heartbeat frames.
    pub heartbeat_interval: Duration,

    /// How often the maintenance task scans for dead dungeons.
    pub maintenance_interval: Duration,

    /// Idle window after which an empty dungeon is collected.
    pub inactivity_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:4040".parse().expect("static address"),
            queue_capacity: 256,
            read_deadline: Duration::from_secs(60),
            write_deadline: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            maintenance_interval: Duration::from_secs(3600),
            inactivity_window: Duration::from_secs(24 * 3600),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `DELVE_*` environment variables, falling
    /// back to the defaults above.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let bind_addr = match std::env::var("DELVE_BIND_ADDR") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.bind_addr,
        };

        Ok(Self {
            bind_addr,
            queue_capacity: env_usize("DELVE_QUEUE_CAPACITY", defaults.queue_capacity)?,
            read_deadline: env_secs("DELVE_READ_TIMEOUT_SECS", defaults.read_deadline)?,
            write_deadline: env_secs("DELVE_WRITE_TIMEOUT_SECS", defaults.write_deadline)?,
            heartbeat_interval: env_secs("DELVE_HEARTBEAT_SECS", defaults.heartbeat_interval)?,
            maintenance_interval: env_secs("DELVE_MAINTENANCE_SECS", defaults.maintenance_interval)?,
            inactivity_window: env_secs("DELVE_INACTIVITY_SECS", defaults.inactivity_window)?,
        })
    }
}

fn env_usize(name: &str, default: usize) -> anyhow::Result<usize> {
    match std::env::var(name) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}

fn env_secs(name: &str, default: Duration) -> anyhow::Result<Duration> {
    match std::env::var(name) {
        Ok(value) => Ok(Duration::from_secs(value.parse()?)),
        Err(_) => Ok(default),
    }
}
