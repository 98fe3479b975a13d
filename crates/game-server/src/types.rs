//! Shared types for the game TCP server.
//!
//! This module defines:
//! - `ConnectionId` / `WorkerId`: opaque handles for sockets and worker tasks
//! - channel aliases between tasks (outbound frames, chat relay, reaping,
//!   re-pairing, vanished waiters)
//! - `ServerContext`: the state every worker shares by reference

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use game_protocol::Frame;
use tokio::sync::{mpsc, Mutex};

use crate::outcome_log::OutcomeLog;
use crate::registry::Registry;

/// Identifier for an accepted connection.
///
/// Unique over the lifetime of the process, so a handle is never reused
/// while a record referencing it is still around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Identifier for a connection worker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub u64);

/// Identifier for one pairing (and its board).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairingId(pub u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

pub fn next_worker_id() -> WorkerId {
    WorkerId(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Outbound frames for a given connection, drained by its writer task.
pub type OutboundTx = mpsc::UnboundedSender<Frame>;
pub type OutboundRx = mpsc::UnboundedReceiver<Frame>;

/// Broadcast chat relay: any worker → the acceptor's fan-out.
pub type RelayTx = mpsc::UnboundedSender<Frame>;
pub type RelayRx = mpsc::UnboundedReceiver<Frame>;

/// Worker termination notices: drop guard → acceptor.
pub type ReapTx = mpsc::UnboundedSender<Reaped>;
pub type ReapRx = mpsc::UnboundedReceiver<Reaped>;

/// Slots put back in the waiting pool: `release_slot` → acceptor.
pub type RequeueTx = mpsc::UnboundedSender<usize>;
pub type RequeueRx = mpsc::UnboundedReceiver<usize>;

/// Waiters whose socket closed before pairing: watcher → acceptor.
pub type VanishedTx = mpsc::UnboundedSender<Vanished>;
pub type VanishedRx = mpsc::UnboundedReceiver<Vanished>;

/// The player registry behind its lock.
///
/// Every read or write of a `PlayerRecord` goes through this mutex.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// A player's own endpoint as stored in the registry.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub tx: OutboundTx,
}

impl Connection {
    /// Queue a frame for the writer task. A closed writer means the peer
    /// is gone; that is reported by its own worker, not here.
    pub fn send(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// A worker task has ended (normally, with an error, or by panic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub slot: usize,
    pub worker: WorkerId,
}

/// An unpaired waiter's connection was closed by the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vanished {
    pub slot: usize,
    pub conn: ConnectionId,
}

/// Reports its worker to the acceptor when dropped.
///
/// Lives inside the worker future, so it fires on every exit path,
/// including unwinding and task abort.
#[derive(Debug)]
pub struct ReapGuard {
    reaped: Reaped,
    tx: ReapTx,
}

impl ReapGuard {
    pub fn new(slot: usize, worker: WorkerId, tx: ReapTx) -> Self {
        ReapGuard {
            reaped: Reaped { slot, worker },
            tx,
        }
    }
}

impl Drop for ReapGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(self.reaped);
    }
}

/// State shared by the acceptor and every worker.
#[derive(Clone)]
pub struct ServerContext {
    pub registry: SharedRegistry,
    pub log: Arc<OutcomeLog>,
    pub relay: RelayTx,
    pub requeue: RequeueTx,
}
