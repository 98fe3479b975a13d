// crates/game-client/src/main.rs

mod network;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::network::GameConnection;

#[derive(Parser)]
#[clap(name = "game-client")]
#[clap(about = "Terminal client for the five-in-a-line server")]
struct Cli {
    /// Server host name or address
    host: String,

    /// Server port
    port: u16,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with game text.
    let filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let addr = format!("{}:{}", cli.host, cli.port);
    let connection = GameConnection::connect(&addr).await?;
    connection.run().await
}
