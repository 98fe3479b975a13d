//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections and registers them.
//! - Pairs waiting players and spawns one worker per side.
//! - Watches unpaired waiters and frees the slot of one that hangs up.
//! - Re-pairs players whose partner left before the game started.
//! - Drains the broadcast relay and fans frames out.
//! - Reaps terminated workers.
//! - On cancellation, drains the registry before returning.
//!
//! The per-connection logic lives in `client`, the turn protocol in
//! `game`, and chat routing in `relay`.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use game_protocol::wire_types::SERVER_FULL;
use game_protocol::Frame;
use thiserror::Error;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{run_writer, Worker};
use crate::config::Config;
use crate::game::{finish_game, release_slot};
use crate::outcome_log::OutcomeLog;
use crate::registry::{Registry, RegistryError};
use crate::relay::fan_out;
use crate::types::{
    next_connection_id, next_worker_id, Connection, ConnectionId, ReapGuard, ReapRx, ReapTx, Reaped,
    RelayRx, RequeueRx, ServerContext, Vanished, VanishedRx, VanishedTx,
};

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("failed to open outcome log {path}: {source}")]
    LogOpen { path: String, source: io::Error },

    #[error("registry invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A registered connection whose worker has not been spawned yet.
///
/// Its read half sits in `watcher` until a pairing claims it.
struct Pending {
    conn: Connection,
    claim: CancellationToken,
    watcher: JoinHandle<OwnedReadHalf>,
}

/// Hold an unpaired waiter's read half until `claim` fires, reporting the
/// waiter on `vanished` if the peer hangs up first.
///
/// Only peeks, so bytes sent early are still there for the handshake.
async fn watch_waiter(
    slot: usize,
    conn: ConnectionId,
    mut read_half: OwnedReadHalf,
    claim: CancellationToken,
    vanished: VanishedTx,
) -> OwnedReadHalf {
    let mut byte = [0u8; 1];
    let closed = tokio::select! {
        biased;
        _ = claim.cancelled() => false,
        peeked = read_half.peek(&mut byte) => matches!(peeked, Ok(0) | Err(_)),
    };

    if closed {
        debug!(slot, conn = conn.0, "waiter hung up before pairing");
        let _ = vanished.send(Vanished { slot, conn });
    } else {
        claim.cancelled().await;
    }
    read_half
}

/// Run the TCP server with the given configuration until `cancel` fires.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<(), ServerError> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, "listening");

    let log = OutcomeLog::open(&config.log_path)
        .await
        .map_err(|source| ServerError::LogOpen {
            path: config.log_path.display().to_string(),
            source,
        })?;
    info!(path = %log.path().display(), "outcome log opened");

    Server::new(listener, log, config.max_players, cancel)
        .serve()
        .await
}

/// Acceptor / lifecycle loop state.
pub struct Server {
    listener: TcpListener,
    ctx: ServerContext,
    cancel: CancellationToken,
    /// Stops workers. Fired only after the drain, so every connection
    /// still gets its final frames.
    stop_workers: CancellationToken,
    relay_rx: RelayRx,
    reap_tx: ReapTx,
    reap_rx: ReapRx,
    requeue_rx: RequeueRx,
    vanished_tx: VanishedTx,
    vanished_rx: VanishedRx,
    pending: HashMap<usize, Pending>,
    workers: JoinSet<()>,
    writers: JoinSet<()>,
}

impl Server {
    /// Wire a server around an already-bound listener.
    pub fn new(
        listener: TcpListener,
        log: OutcomeLog,
        max_players: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        let (reap_tx, reap_rx) = mpsc::unbounded_channel();
        let (requeue_tx, requeue_rx) = mpsc::unbounded_channel();
        let (vanished_tx, vanished_rx) = mpsc::unbounded_channel();

        let ctx = ServerContext {
            registry: Arc::new(Mutex::new(Registry::with_capacity(max_players))),
            log: Arc::new(log),
            relay: relay_tx,
            requeue: requeue_tx,
        };

        Server {
            listener,
            ctx,
            cancel,
            stop_workers: CancellationToken::new(),
            relay_rx,
            reap_tx,
            reap_rx,
            requeue_rx,
            vanished_tx,
            vanished_rx,
            pending: HashMap::new(),
            workers: JoinSet::new(),
            writers: JoinSet::new(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Multiplex accept, relay, and reaping until cancelled, then drain.
    pub async fn serve(mut self) -> Result<(), ServerError> {
        let result = self.accept_loop().await;
        self.shutdown().await?;
        result
    }

    async fn accept_loop(&mut self) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                biased;

                // A cancelled token stays cancelled, so a stop request
                // between iterations is seen on the next poll.
                _ = self.cancel.cancelled() => {
                    info!("shutdown requested");
                    return Ok(());
                }

                Some(reaped) = self.reap_rx.recv() => {
                    self.reap(reaped).await;
                }

                Some(vanished) = self.vanished_rx.recv() => {
                    self.reclaim_waiter(vanished).await;
                }

                Some(slot) = self.requeue_rx.recv() => {
                    self.rematch(slot).await?;
                }

                Some(joined) = self.workers.join_next(), if !self.workers.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "worker task failed");
                    }
                }

                Some(_) = self.writers.join_next(), if !self.writers.is_empty() => {}

                Some(frame) = self.relay_rx.recv() => {
                    fan_out(&self.ctx.registry, frame).await;
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.on_accept(stream, peer).await?,
                        Err(e) => {
                            // Transient (EMFILE, ECONNABORTED, ...); keep serving.
                            warn!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }
    }

    /// Register a new connection and pair it if someone is waiting.
    async fn on_accept(&mut self, stream: TcpStream, peer: SocketAddr) -> Result<(), ServerError> {
        let _ = stream.set_nodelay(true);
        let conn_id = next_connection_id();
        let (read_half, write_half) = stream.into_split();

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.writers.spawn(run_writer(conn_id, write_half, out_rx));
        let conn = Connection { id: conn_id, tx: out_tx };

        info!(conn = conn_id.0, %peer, "accepted connection");

        let registered = {
            let mut registry = self.ctx.registry.lock().await;
            registry
                .register_connection(conn.clone())
                .map(|slot| (slot, registry.find_opponent(slot)))
        };

        match registered {
            Err(RegistryError::Full(capacity)) => {
                warn!(conn = conn_id.0, %peer, capacity, "registry full, rejecting connection");
                conn.send(Frame::from_text(SERVER_FULL));
                conn.send(Frame::sentinel());
            }
            Ok((slot, None)) => {
                info!(slot, "waiting for an opponent");
                self.park(slot, conn, read_half);
            }
            Ok((slot, Some(opp))) => {
                self.launch([opp, slot], Some((slot, conn, read_half))).await?;
            }
        }

        Ok(())
    }

    /// Keep an unpaired connection until a pairing claims it.
    fn park(&mut self, slot: usize, conn: Connection, read_half: OwnedReadHalf) {
        let claim = CancellationToken::new();
        let watcher = tokio::spawn(watch_waiter(
            slot,
            conn.id,
            read_half,
            claim.clone(),
            self.vanished_tx.clone(),
        ));
        self.pending.insert(
            slot,
            Pending {
                conn,
                claim,
                watcher,
            },
        );
    }

    /// Take a parked connection back, or `None` if `slot` already has a
    /// worker (a player put back in the pool).
    async fn unpark(&mut self, slot: usize) -> Result<Option<(Connection, OwnedReadHalf)>, ServerError> {
        let Some(pending) = self.pending.remove(&slot) else {
            let has_worker = {
                let registry = self.ctx.registry.lock().await;
                registry.record(slot).is_some_and(|r| r.worker.is_some())
            };
            return if has_worker {
                Ok(None)
            } else {
                Err(ServerError::Invariant(format!(
                    "paired slot {} has neither a parked connection nor a worker",
                    slot
                )))
            };
        };

        pending.claim.cancel();
        let read_half = pending.watcher.await.map_err(|e| {
            ServerError::Invariant(format!("watcher for slot {} failed: {}", slot, e))
        })?;
        Ok(Some((pending.conn, read_half)))
    }

    /// Spawn workers for both sides of a fresh pairing, waiting side first.
    ///
    /// `fresh` is the just-accepted connection when the pairing came from
    /// `on_accept`; every other side is either parked or already served.
    async fn launch(
        &mut self,
        sides: [usize; 2],
        mut fresh: Option<(usize, Connection, OwnedReadHalf)>,
    ) -> Result<(), ServerError> {
        for side in sides {
            let parts = match fresh.take() {
                Some((slot, conn, read_half)) if slot == side => Some((conn, read_half)),
                other => {
                    fresh = other;
                    self.unpark(side).await?
                }
            };

            match parts {
                Some((conn, read_half)) => self.spawn_worker(side, conn, read_half).await,
                None => debug!(slot = side, "re-paired player keeps its worker"),
            }
        }
        Ok(())
    }

    async fn spawn_worker(&mut self, slot: usize, conn: Connection, read_half: OwnedReadHalf) {
        let id = next_worker_id();
        self.ctx.registry.lock().await.assign_worker(slot, id);

        let guard = ReapGuard::new(slot, id, self.reap_tx.clone());
        let worker = Worker {
            ctx: self.ctx.clone(),
            slot,
            id,
            conn,
            read_half,
            cancel: self.stop_workers.clone(),
        };
        self.workers.spawn(worker.run(guard));
    }

    /// Free the slot of a waiter that hung up while still unpaired.
    async fn reclaim_waiter(&mut self, vanished: Vanished) {
        let Vanished { slot, conn } = vanished;
        if self.pending.get(&slot).map(|p| p.conn.id) != Some(conn) {
            return;
        }

        if let Some(pending) = self.pending.remove(&slot) {
            pending.claim.cancel();
        }
        self.ctx.registry.lock().await.remove_player(slot);
        info!(slot, conn = conn.0, "reclaimed slot of a waiter that left before pairing");
    }

    /// Pair a player whose partner left before the game started.
    async fn rematch(&mut self, slot: usize) -> Result<(), ServerError> {
        let opponent = {
            let mut registry = self.ctx.registry.lock().await;
            if !registry.is_requeued(slot) {
                return Ok(());
            }
            registry.find_opponent(slot)
        };

        match opponent {
            Some(opp) => self.launch([opp, slot], None).await,
            None => {
                info!(slot, "back in the waiting pool");
                Ok(())
            }
        }
    }

    /// Reclaim the slot of a terminated worker if its own cleanup did not.
    async fn reap(&mut self, reaped: Reaped) {
        let Reaped { slot, worker } = reaped;
        if release_slot(&self.ctx, slot, worker).await {
            warn!(slot, worker = worker.0, "reclaimed slot of a worker that exited without cleanup");
        }
    }

    /// Drain every slot, stop workers, and wait for all tasks to finish.
    async fn shutdown(&mut self) -> Result<(), ServerError> {
        let drained = {
            let mut registry = self.ctx.registry.lock().await;
            registry.drain()
        };

        for abandonment in &drained.abandoned {
            finish_game(&self.ctx, &abandonment.outcome, &abandonment.board, &abandonment.notify).await;
        }
        for conn in &drained.connections {
            conn.send(Frame::sentinel());
        }
        info!(
            players = drained.connections.len(),
            abandoned = drained.abandoned.len(),
            "registry drained"
        );

        drop(drained);
        for (_, pending) in self.pending.drain() {
            pending.claim.cancel();
        }
        self.stop_workers.cancel();

        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task failed");
            }
        }
        while self.writers.join_next().await.is_some() {}

        self.ctx.log.close().await?;
        info!("server stopped");
        Ok(())
    }
}
