//! Per-connection tasks.
//!
//! Every accepted connection gets a writer task as soon as it is
//! registered, so waiting players already receive broadcast chat. Once a
//! pairing completes, each side also gets a worker:
//!
//! ```text
//! AwaitingNickname -> Dispatching -> Terminated
//! ```

use std::io;

use game_protocol::text_codec::{board_frames, parse_nickname};
use game_protocol::wire_types::NICKNAME_PROMPT;
use game_protocol::{classify, ClientFrame, Frame, FRAME_LEN};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::game::{handle_move, release_slot};
use crate::relay::{chat_all, chat_direct};
use crate::types::{Connection, ConnectionId, OutboundRx, ReapGuard, ServerContext, WorkerId};

/// Writer task: drain queued frames onto the socket.
///
/// Ends when every sender is gone (the slot was released) or the peer
/// stops accepting data. A broken pipe only ends this connection.
pub async fn run_writer(conn: ConnectionId, mut write_half: OwnedWriteHalf, mut out_rx: OutboundRx) {
    while let Some(frame) = out_rx.recv().await {
        if let Err(e) = write_half.write_all(frame.as_bytes()).await {
            debug!(conn = conn.0, error = %e, "write failed, closing writer");
            break;
        }
    }

    let _ = write_half.shutdown().await;
    debug!(conn = conn.0, "writer finished");
}

/// Read exactly one frame. `Ok(None)` is a short read, i.e. disconnect.
pub async fn read_frame(read_half: &mut OwnedReadHalf) -> io::Result<Option<Frame>> {
    let mut buf = [0u8; FRAME_LEN];
    match read_half.read_exact(&mut buf).await {
        Ok(_) => Frame::decode(&buf)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Everything a worker owns.
pub struct Worker {
    pub ctx: ServerContext,
    pub slot: usize,
    pub id: WorkerId,
    pub conn: Connection,
    pub read_half: OwnedReadHalf,
    pub cancel: CancellationToken,
}

impl Worker {
    /// Run the worker to completion, then reclaim its slot.
    ///
    /// `guard` reports termination to the acceptor even if this future
    /// is dropped or panics before reaching the cleanup below.
    pub async fn run(mut self, guard: ReapGuard) {
        let _guard = guard;
        let slot = self.slot;

        match self.session().await {
            Ok(()) => debug!(slot, "worker session ended"),
            Err(e) => warn!(slot, error = %e, "transport failure, treating as disconnect"),
        }

        release_slot(&self.ctx, slot, self.id).await;
    }

    async fn session(&mut self) -> io::Result<()> {
        if !self.handshake().await? {
            info!(slot = self.slot, "nickname handshake failed");
            return Ok(());
        }
        self.dispatch().await
    }

    /// Next frame, or `None` on disconnect or shutdown.
    async fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        tokio::select! {
            _ = self.cancel.cancelled() => Ok(None),
            frame = read_frame(&mut self.read_half) => frame,
        }
    }

    /// Prompt for the nickname; the first side of the pair to answer
    /// claims mark X and the first move.
    async fn handshake(&mut self) -> io::Result<bool> {
        self.conn.send(Frame::from_text(NICKNAME_PROMPT));

        let Some(frame) = self.next_frame().await? else {
            return Ok(false);
        };
        let nickname = parse_nickname(&frame);

        let board = {
            let mut registry = self.ctx.registry.lock().await;
            registry.set_nickname(self.slot, nickname.clone());
            registry.claim_first_turn(self.slot)
        };

        info!(slot = self.slot, nickname = %nickname, first = board.is_some(), "nickname set");

        if let Some(board) = board {
            for frame in board_frames(&board) {
                self.conn.send(frame);
            }
        }
        Ok(true)
    }

    /// Classify and dispatch frames until the peer disconnects.
    async fn dispatch(&mut self) -> io::Result<()> {
        while let Some(frame) = self.next_frame().await? {
            match classify(&frame) {
                ClientFrame::Disconnect => break,
                ClientFrame::Move(cell) => handle_move(&self.ctx, self.slot, cell).await,
                ClientFrame::InvalidMove => debug!(slot = self.slot, "malformed move ignored"),
                ClientFrame::Broadcast(text) => chat_all(&self.ctx, self.slot, &text).await,
                ClientFrame::Direct(text) => chat_direct(&self.ctx, self.slot, &text).await,
            }
        }
        Ok(())
    }
}
