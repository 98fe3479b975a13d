//! Chat routing.
//!
//! Routing policy:
//! - direct chat: unicast to the paired opponent, written by the sender's
//!   worker right away.
//! - broadcast chat: pushed into the shared relay; the acceptor loop drains
//!   it and fans each frame out to every Waiting/Playing connection.
//!
//! This keeps the O(n) traversal out of the workers. Recipient lists are
//! snapshotted under the registry lock; frames are queued after it is
//! released.

use game_protocol::text_codec::format_chat;
use game_protocol::Frame;
use tracing::{debug, info, warn};

use crate::types::{ServerContext, SharedRegistry};

/// `[nickname]: text` to the opponent of `slot`.
///
/// Silently dropped when `slot` has no live opponent.
pub async fn chat_direct(ctx: &ServerContext, slot: usize, text: &str) {
    let (line, opponent) = {
        let registry = ctx.registry.lock().await;
        let nickname = registry.nickname(slot).unwrap_or_default();
        (format_chat(nickname, text), registry.opponent_connection(slot))
    };

    info!(slot, "{}", line);

    match opponent {
        Some(opp) => {
            opp.send(Frame::from_text(&line));
        }
        None => debug!(slot, "direct chat with no opponent dropped"),
    }
}

/// `[nickname]: text` to everybody, via the relay.
pub async fn chat_all(ctx: &ServerContext, slot: usize, text: &str) {
    let line = {
        let registry = ctx.registry.lock().await;
        format_chat(registry.nickname(slot).unwrap_or_default(), text)
    };

    info!(slot, broadcast = true, "{}", line);

    if ctx.relay.send(Frame::from_text(&line)).is_err() {
        warn!(slot, "chat relay closed, broadcast dropped");
    }
}

/// Deliver one relayed frame to every Waiting or Playing connection.
///
/// Returns the number of connections the frame was queued for.
pub async fn fan_out(registry: &SharedRegistry, frame: Frame) -> usize {
    // Snapshot of current recipients to minimize lock hold time.
    let targets = {
        let guard = registry.lock().await;
        guard.broadcast_targets()
    };

    let mut delivered = 0;
    for tx in targets {
        if tx.send(frame.clone()).is_ok() {
            delivered += 1;
        }
    }

    debug!(delivered, "broadcast fanned out");
    delivered
}
