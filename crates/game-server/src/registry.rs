//! Fixed-capacity player registry and matchmaker.
//!
//! The registry is a table of [`PlayerRecord`]s. A slot's index is its
//! stable identity: pairings refer to the opponent by index, and workers
//! are mapped back to slots through [`Registry::find_by_worker`].
//!
//! Boards are stored once per pairing, not per player, so both sides of
//! a game always observe the same cells.
//!
//! The registry itself is plain data with no locking. Callers hold the
//! [`SharedRegistry`](crate::types::SharedRegistry) mutex around every
//! call and never await I/O while holding it.

use std::collections::HashMap;

use game_core::{Board, Mark};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{Connection, ConnectionId, OutboundTx, PairingId, WorkerId};

/// Default number of slots.
pub const REGISTRY_CAPACITY: usize = 128;

/// Lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Free slot.
    #[default]
    Idle,
    /// Connected; unpaired, or paired and playing mark O.
    Waiting,
    /// Paired and playing mark X (first to finish the handshake).
    Playing,
    /// The game reached a terminal state or was abandoned.
    Finished,
}

impl PlayerState {
    /// Slots that receive broadcast chat.
    pub fn is_active(self) -> bool {
        matches!(self, PlayerState::Waiting | PlayerState::Playing)
    }
}

/// One player's entry in the table.
#[derive(Debug, Default)]
pub struct PlayerRecord {
    pub state: PlayerState,

    /// This player's own endpoint.
    pub connection: Option<Connection>,

    /// The paired opponent's endpoint id.
    pub opponent: Option<ConnectionId>,

    /// Registry index of the paired opponent.
    pub opponent_index: Option<usize>,

    pub nickname: String,

    /// Key of the board this player plays on.
    pub pairing: Option<PairingId>,

    pub is_my_turn: bool,

    /// Worker task responsible for this slot.
    pub worker: Option<WorkerId>,
}

impl PlayerRecord {
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(|c| c.id)
    }

    pub fn is_idle(&self) -> bool {
        self.state == PlayerState::Idle
    }

    /// Mark ownership is derived from lifecycle state: the `Playing` side
    /// is X, the other side of the pairing is O.
    pub fn mark(&self) -> Mark {
        if self.state == PlayerState::Playing {
            Mark::X
        } else {
            Mark::O
        }
    }
}

/// Errors reported by the matchmaker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry full: all {0} slots are taken")]
    Full(usize),
}

/// The player table.
#[derive(Debug)]
pub struct Registry {
    slots: Vec<PlayerRecord>,
    boards: HashMap<PairingId, Board>,
    next_pairing: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    /// Registry with [`REGISTRY_CAPACITY`] slots.
    pub fn new() -> Self {
        Registry::with_capacity(REGISTRY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, PlayerRecord::default);
        Registry {
            slots,
            boards: HashMap::new(),
            next_pairing: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn record(&self, index: usize) -> Option<&PlayerRecord> {
        self.slots.get(index)
    }

    pub(crate) fn record_mut(&mut self, index: usize) -> Option<&mut PlayerRecord> {
        self.slots.get_mut(index)
    }

    /// All slots in table order, for snapshots and tests.
    pub fn records(&self) -> &[PlayerRecord] {
        &self.slots
    }

    /// Number of non-Idle slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|r| !r.is_idle()).count()
    }

    // -------------------------------------------------------------------------
    // Matchmaker
    // -------------------------------------------------------------------------

    /// Put a freshly accepted connection into the first Idle slot.
    ///
    /// The slot becomes `Waiting` with all pairing fields cleared. When no
    /// slot is free the registry is left untouched.
    pub fn register_connection(&mut self, connection: Connection) -> Result<usize, RegistryError> {
        let capacity = self.capacity();
        let (index, record) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, r)| r.is_idle())
            .ok_or(RegistryError::Full(capacity))?;

        *record = PlayerRecord {
            state: PlayerState::Waiting,
            connection: Some(connection),
            ..PlayerRecord::default()
        };

        info!(slot = index, "player registered");
        Ok(index)
    }

    /// Pair `index` with the first other non-Idle, unpaired slot in table order.
    ///
    /// Both records are linked symmetrically and get a fresh empty board.
    /// Returns `None` and leaves `index` waiting when nobody is available.
    pub fn find_opponent(&mut self, index: usize) -> Option<usize> {
        let own = self.record(index).filter(|r| !r.is_idle() && r.opponent.is_none())?;
        let own_id = own.connection_id()?;

        let (other, _) = self.slots.iter().enumerate().find(|(i, r)| {
            *i != index && !r.is_idle() && r.opponent.is_none() && r.connection.is_some()
        })?;
        let other_id = self.slots[other].connection_id()?;

        let pairing = PairingId(self.next_pairing);
        self.next_pairing += 1;
        self.boards.insert(pairing, Board::new());

        for (me, them, them_id) in [(index, other, other_id), (other, index, own_id)] {
            let record = &mut self.slots[me];
            record.opponent = Some(them_id);
            record.opponent_index = Some(them);
            record.pairing = Some(pairing);
            record.is_my_turn = false;
        }

        info!(slot = index, opponent = other, "players paired");
        Some(other)
    }

    /// Record the worker responsible for `index`.
    pub fn assign_worker(&mut self, index: usize, worker: WorkerId) {
        if let Some(record) = self.record_mut(index) {
            record.worker = Some(worker);
        }
    }

    /// Slot currently owned by `worker`, if it has not been reclaimed.
    pub fn find_by_worker(&self, worker: WorkerId) -> Option<usize> {
        self.slots
            .iter()
            .position(|r| !r.is_idle() && r.worker == Some(worker))
    }

    /// True while `index` is still occupied by `worker`.
    pub fn is_owned_by(&self, index: usize, worker: WorkerId) -> bool {
        self.find_by_worker(worker) == Some(index)
    }

    /// Reclaim a slot back to Idle, releasing its connection.
    ///
    /// Returns false if the slot was already Idle.
    pub fn remove_player(&mut self, index: usize) -> bool {
        let Some(record) = self.slots.get_mut(index) else {
            return false;
        };
        if record.is_idle() {
            return false;
        }

        let pairing = record.pairing;
        let old = std::mem::take(record);
        info!(slot = index, nickname = %old.nickname, "player left the game");

        if let Some(pairing) = pairing {
            self.release_board_if_unused(pairing);
        }
        true
    }

    /// Drop the board of `pairing` once no occupied slot references it.
    pub(crate) fn release_board_if_unused(&mut self, pairing: PairingId) {
        let still_used = self
            .slots
            .iter()
            .any(|r| !r.is_idle() && r.pairing == Some(pairing));
        if !still_used && self.boards.remove(&pairing).is_some() {
            debug!(pairing = pairing.0, "board released");
        }
    }

    /// True if `index` is occupied, unpaired and already served by a worker.
    ///
    /// Such a slot was put back in the pool after its partner left before
    /// the game started.
    pub fn is_requeued(&self, index: usize) -> bool {
        self.record(index)
            .map(|r| !r.is_idle() && r.opponent.is_none() && r.worker.is_some())
            .unwrap_or(false)
    }

    /// Index of `index`'s opponent, validated against the stored handle
    /// so a reclaimed and reused slot is never mistaken for the opponent.
    pub fn opponent_of(&self, index: usize) -> Option<usize> {
        let record = self.record(index)?;
        let opp_index = record.opponent_index?;
        let opp = self.record(opp_index)?;

        if !opp.is_idle() && opp.connection_id() == record.opponent {
            Some(opp_index)
        } else {
            None
        }
    }

    /// The opponent's outbound sender, if the opponent is still connected.
    pub fn opponent_connection(&self, index: usize) -> Option<Connection> {
        let opp = self.opponent_of(index)?;
        self.slots[opp].connection.clone()
    }

    /// The board `index` plays on.
    pub fn board(&self, index: usize) -> Option<&Board> {
        let pairing = self.record(index)?.pairing?;
        self.boards.get(&pairing)
    }

    pub(crate) fn board_mut(&mut self, pairing: PairingId) -> Option<&mut Board> {
        self.boards.get_mut(&pairing)
    }

    pub fn set_nickname(&mut self, index: usize, nickname: String) {
        if let Some(record) = self.record_mut(index) {
            record.nickname = nickname;
        }
    }

    pub fn nickname(&self, index: usize) -> Option<&str> {
        self.record(index).map(|r| r.nickname.as_str())
    }

    /// Outbound senders of every Waiting or Playing slot, one per slot.
    pub fn broadcast_targets(&self) -> Vec<OutboundTx> {
        self.slots
            .iter()
            .filter(|r| r.state.is_active())
            .filter_map(|r| r.connection.as_ref().map(|c| c.tx.clone()))
            .collect()
    }
}
