//! Turn/ownership protocol on top of the registry.
//!
//! State transitions happen in `impl Registry` blocks below and run under
//! the registry lock. The async handlers take a snapshot under the lock,
//! release it, and only then log and queue frames.
//!
//! Routing policy:
//! - board after a move: opponent only
//! - "waiting for opponent": mover only
//! - outcome line + sentinel: both sides (survivor only when abandoned)

use game_core::{Board, BoardState, MoveError, Outcome};
use game_protocol::text_codec::board_frames;
use game_protocol::wire_types::WAITING_FOR_OPPONENT;
use game_protocol::Frame;
use tracing::{debug, error, info, warn};

use crate::registry::{PlayerState, Registry};
use crate::types::{Connection, ServerContext, WorkerId};

/// Why a move frame was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejected {
    /// The slot is not in a live pairing.
    NotPaired,
    /// It is the opponent's turn.
    NotYourTurn,
    /// The game already ended.
    GameOver,
    /// The board refused the cell.
    Board(MoveError),
}

/// Snapshot taken after an accepted move.
#[derive(Debug)]
pub struct MoveApplied {
    pub board: Board,
    pub state: BoardState,
    pub mover: String,
    pub opponent: String,
    pub mover_conn: Option<Connection>,
    pub opponent_conn: Option<Connection>,
}

/// Snapshot of a game forced into `Finished` without a result.
#[derive(Debug)]
pub struct Abandonment {
    pub outcome: Outcome,
    pub board: Board,
    /// Connections that should receive the outcome line and the sentinel.
    pub notify: Vec<Connection>,
}

/// What the shutdown drain collected.
#[derive(Debug, Default)]
pub struct Drained {
    pub abandoned: Vec<Abandonment>,
    pub connections: Vec<Connection>,
}

impl Registry {
    /// First side of a pairing to finish the handshake becomes X and moves first.
    ///
    /// Returns the board to show the new X player, or `None` if the other
    /// side already claimed it.
    pub fn claim_first_turn(&mut self, index: usize) -> Option<Board> {
        let opp = self.opponent_of(index)?;
        if self.records()[index].state != PlayerState::Waiting
            || self.records()[opp].state != PlayerState::Waiting
        {
            return None;
        }

        if let Some(me) = self.record_mut(index) {
            me.state = PlayerState::Playing;
            me.is_my_turn = true;
        }
        if let Some(them) = self.record_mut(opp) {
            them.is_my_turn = false;
        }

        self.board(index).cloned()
    }

    /// Validate and apply a move by `index` on cell `cell`.
    ///
    /// On success the turn flips across the pair, and a terminal board
    /// moves both records to `Finished`. On rejection nothing changes.
    pub fn apply_move(&mut self, index: usize, cell: usize) -> Result<MoveApplied, MoveRejected> {
        let opp = self.opponent_of(index).ok_or(MoveRejected::NotPaired)?;

        let me = &self.records()[index];
        let them = &self.records()[opp];
        if me.state == PlayerState::Finished || them.state == PlayerState::Finished {
            return Err(MoveRejected::GameOver);
        }
        if !me.is_my_turn {
            return Err(MoveRejected::NotYourTurn);
        }

        let mark = me.mark();
        let pairing = me.pairing.ok_or(MoveRejected::NotPaired)?;
        let board = self.board_mut(pairing).ok_or(MoveRejected::NotPaired)?;
        board.place(cell, mark).map_err(MoveRejected::Board)?;

        let board = board.clone();
        let state = board.state();

        for (slot, turn) in [(index, false), (opp, true)] {
            if let Some(record) = self.record_mut(slot) {
                record.is_my_turn = turn;
                if state.is_terminal() {
                    record.state = PlayerState::Finished;
                }
            }
        }

        let me = &self.records()[index];
        let them = &self.records()[opp];
        Ok(MoveApplied {
            board,
            state,
            mover: me.nickname.clone(),
            opponent: them.nickname.clone(),
            mover_conn: me.connection.clone(),
            opponent_conn: them.connection.clone(),
        })
    }

    /// True once either side of the pairing has claimed the first turn.
    fn game_started(&self, index: usize, opp: usize) -> bool {
        [index, opp]
            .iter()
            .any(|&i| matches!(self.records()[i].state, PlayerState::Playing | PlayerState::Finished))
    }

    /// Force the pairing of `index` into `Finished` because `index` is leaving.
    ///
    /// Returns `None` when there is nothing to abandon: the slot is free,
    /// unpaired, its game already finished, or the game never started
    /// because neither side got through the nickname handshake.
    pub fn abandon(&mut self, index: usize) -> Option<Abandonment> {
        let opp = self.opponent_of(index)?;
        if !self.game_started(index, opp) {
            return None;
        }
        let me = &self.records()[index];
        let them = &self.records()[opp];
        if me.state == PlayerState::Finished || them.state == PlayerState::Finished {
            return None;
        }

        let outcome = Outcome::abandoned(me.nickname.clone(), them.nickname.clone());
        let board = self.board(index).cloned().unwrap_or_default();
        let notify = them.connection.clone().into_iter().collect();

        for slot in [index, opp] {
            if let Some(record) = self.record_mut(slot) {
                record.state = PlayerState::Finished;
                record.is_my_turn = false;
            }
        }

        Some(Abandonment {
            outcome,
            board,
            notify,
        })
    }

    /// Dissolve a pairing whose game never started, returning the partner
    /// of `index` to the waiting pool.
    ///
    /// Returns the partner's slot, or `None` if `index` is unpaired or its
    /// game is already under way.
    pub fn unpair(&mut self, index: usize) -> Option<usize> {
        let opp = self.opponent_of(index)?;
        if self.game_started(index, opp) {
            return None;
        }

        let pairing = self.records()[index].pairing;
        for slot in [index, opp] {
            if let Some(record) = self.record_mut(slot) {
                record.opponent = None;
                record.opponent_index = None;
                record.pairing = None;
                record.is_my_turn = false;
            }
        }
        if let Some(pairing) = pairing {
            self.release_board_if_unused(pairing);
        }

        info!(slot = index, partner = opp, "pairing dissolved before the game started");
        Some(opp)
    }

    /// Empty the whole table for shutdown.
    ///
    /// Every game still in progress is abandoned exactly once (both sides
    /// are notified), and every connection is returned so the caller can
    /// send it the sentinel.
    pub fn drain(&mut self) -> Drained {
        let mut drained = Drained::default();

        for index in 0..self.capacity() {
            if self.records()[index].is_idle() {
                continue;
            }

            if let Some(mut abandonment) = self.abandon(index) {
                if let Some(own) = self.records()[index].connection.clone() {
                    abandonment.notify.push(own);
                }
                drained.abandoned.push(abandonment);
            }

            if let Some(conn) = self.records()[index].connection.clone() {
                drained.connections.push(conn);
            }
            self.remove_player(index);
        }

        drained
    }
}

/// Handle a classified move frame from `slot`.
pub async fn handle_move(ctx: &ServerContext, slot: usize, cell: usize) {
    let applied = {
        let mut registry = ctx.registry.lock().await;
        registry.apply_move(slot, cell)
    };

    let applied = match applied {
        Ok(applied) => applied,
        Err(reason) => {
            debug!(slot, cell, ?reason, "move discarded");
            return;
        }
    };

    if let Some(opp) = &applied.opponent_conn {
        for frame in board_frames(&applied.board) {
            opp.send(frame);
        }
    }

    match Outcome::after_move(applied.state, &applied.mover, &applied.opponent) {
        Some(outcome) => {
            let notify = applied
                .mover_conn
                .iter()
                .chain(applied.opponent_conn.iter());
            finish_game(ctx, &outcome, &applied.board, notify).await;
        }
        None => {
            if let Some(mover) = &applied.mover_conn {
                mover.send(Frame::from_text(WAITING_FOR_OPPONENT));
            }
        }
    }
}

/// Persist a terminal outcome and tell `notify` the game is over.
pub async fn finish_game<'a>(
    ctx: &ServerContext,
    outcome: &Outcome,
    board: &Board,
    notify: impl IntoIterator<Item = &'a Connection>,
) {
    let line = match ctx.log.record(outcome, board).await {
        Ok(line) => line,
        Err(e) => {
            error!(error = %e, "failed to append outcome record");
            ctx.log.format_line(outcome)
        }
    };

    for conn in notify {
        conn.send(Frame::from_text(&line));
        conn.send(Frame::sentinel());
    }
}

/// Reclaim `slot` on behalf of `worker`, abandoning its game if needed.
///
/// Used both by the worker's own exit path and by the acceptor's reaper;
/// whichever runs second finds the slot no longer owned and does nothing.
/// A partner left behind before the game started goes back to the
/// acceptor for re-pairing instead of being disconnected.
pub async fn release_slot(ctx: &ServerContext, slot: usize, worker: WorkerId) -> bool {
    let (abandonment, partner) = {
        let mut registry = ctx.registry.lock().await;
        if !registry.is_owned_by(slot, worker) {
            return false;
        }
        let abandonment = registry.abandon(slot);
        let partner = registry.unpair(slot);
        registry.remove_player(slot);
        (abandonment, partner)
    };

    if let Some(a) = abandonment {
        info!(slot, "game abandoned");
        finish_game(ctx, &a.outcome, &a.board, &a.notify).await;
    }
    if let Some(partner) = partner {
        if ctx.requeue.send(partner).is_err() {
            warn!(slot = partner, "acceptor gone, partner not re-paired");
        }
    }
    true
}
