//! TCP matchmaking server for five-in-a-line.

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use game_server::config::Config;
use game_server::server;

#[derive(Parser, Debug)]
#[command(name = "game-server", about = "Five-in-a-line matchmaking server")]
struct Args {
    /// TCP port to listen on
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env(args.port)?;

    info!(
        addr = %config.socket_addr_string(),
        max_players = config.max_players,
        log = %config.log_path.display(),
        "starting game-server"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(stop_on_signal(cancel.clone()));

    server::run(config, cancel)
        .await
        .context("server terminated")
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn stop_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
                    _ = term.recv() => info!("SIGTERM received"),
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("SIGINT received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("SIGINT received");
    }

    token.cancel();
}
