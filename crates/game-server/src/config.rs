//! Configuration for the game TCP server.
//!
//! The listen port comes from the command line; everything else can be
//! overridden via a few environment variables:
//!
//! - `GAME_BIND_ADDR`   (default: "0.0.0.0")
//! - `GAME_MAX_PLAYERS` (default: "128", clamped to 1..=128)
//! - `GAME_LOG_FILE`    (default: "logs.txt")

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::registry::REGISTRY_CAPACITY;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on. `0` picks an ephemeral port.
    pub port: u16,

    /// Number of registry slots.
    pub max_players: usize,

    /// Append-only outcome log.
    pub log_path: PathBuf,
}

impl Config {
    /// Construct a `Config` for `port`, reading the rest from environment
    /// variables with reasonable defaults.
    pub fn from_env(port: u16) -> Result<Self> {
        let bind_addr = env::var("GAME_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let max_players = read_env_or_default("GAME_MAX_PLAYERS", REGISTRY_CAPACITY)?;
        let log_path = env::var("GAME_LOG_FILE").unwrap_or_else(|_| "logs.txt".to_string());

        Ok(Config {
            bind_addr,
            port,
            max_players: max_players.clamp(1, REGISTRY_CAPACITY),
            log_path: PathBuf::from(log_path),
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, val)),
        Err(_) => Ok(default),
    }
}
