// crates/game-client/src/network.rs

use anyhow::{Context, Result};
use game_protocol::text_codec::encode_line;
use game_protocol::{Frame, FRAME_LEN};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info};

/// One session with the game server.
pub struct GameConnection {
    server_addr: String,
    stream: TcpStream,
}

impl GameConnection {
    pub async fn connect(server_addr: &str) -> Result<Self> {
        info!("Connecting to {}...", server_addr);

        let stream = TcpStream::connect(server_addr)
            .await
            .with_context(|| format!("cannot connect to {}", server_addr))?;
        stream.set_nodelay(true)?;

        info!("Connected successfully");
        Ok(Self {
            server_addr: server_addr.to_string(),
            stream,
        })
    }

    /// Print server frames and forward keyboard lines until either side
    /// ends the session.
    pub async fn run(self) -> Result<()> {
        let (read_half, mut write_half) = self.stream.into_split();

        // Frames are read whole on their own task; partial reads are not
        // cancel-safe inside select!.
        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        let reader = tokio::spawn(read_frames(read_half, tx));

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(frame) if frame.is_sentinel() => {
                            debug!("sentinel received");
                            break;
                        }
                        Some(frame) => println!("{}", frame.text()),
                        None => {
                            info!("{} closed the connection", self.server_addr);
                            break;
                        }
                    }
                }

                line = stdin.next_line() => {
                    match line? {
                        // An empty line would encode as the disconnect frame.
                        Some(line) if line.trim_end_matches('\r').is_empty() => {}
                        Some(line) => send(&mut write_half, encode_line(&line)).await?,
                        None => {
                            // End of input: ask the server to drop us.
                            send(&mut write_half, Frame::sentinel()).await?;
                            break;
                        }
                    }
                }
            }
        }

        reader.abort();
        let _ = write_half.shutdown().await;
        Ok(())
    }
}

async fn send(write_half: &mut OwnedWriteHalf, frame: Frame) -> Result<()> {
    write_half.write_all(frame.as_bytes()).await?;
    debug!("Sent frame: {:?}", frame);
    Ok(())
}

async fn read_frames(mut read_half: OwnedReadHalf, tx: UnboundedSender<Frame>) {
    let mut buf = [0u8; FRAME_LEN];
    loop {
        if let Err(e) = read_half.read_exact(&mut buf).await {
            debug!("Read ended: {}", e);
            break;
        }
        let frame = match Frame::decode(&buf) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Bad frame from server: {}", e);
                break;
            }
        };
        if tx.send(frame).is_err() {
            error!("Failed to hand frame to the terminal");
            break;
        }
    }
}
