//! Inbound frame decoding and routing. Every known message type has exactly
//! one handler; everything else is a protocol fault that is logged and dropped.

use crate::engine::ClientSyncEngine;
use holdem_sync_protocol::{decode, Inbound, ServerToClient};
use tracing::{debug, warn};

/// Outcome of one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied(&'static str),
    /// Older than the last applied sequence number.
    Stale(&'static str),
    Rejected,
}

pub fn handle_frame(engine: &mut ClientSyncEngine, text: &str) -> Dispatch {
    match decode(text) {
        Ok(inbound) => route(engine, inbound),
        Err(error) => {
            warn!(%error, "dropping invalid frame");
            engine
                .notices_mut()
                .warn(format!("invalid message from server: {error}"));
            Dispatch::Rejected
        }
    }
}

pub fn route(engine: &mut ClientSyncEngine, inbound: Inbound) -> Dispatch {
    let Inbound { message, player_id, seq } = inbound;
    let tag = message.tag();
    debug!(tag, ?seq, "routing message");

    if let Some(id) = player_id.as_deref() {
        engine.adopt_player_id(id);
    }
    if mutates_state(&message) && !engine.accept_seq(seq) {
        debug!(tag, ?seq, "stale message dropped");
        return Dispatch::Stale(tag);
    }

    match message {
        ServerToClient::RoomCreated(created) => {
            engine.set_room_id(&created.room_id);
            engine.notices_mut().info(format!("room {} created", created.room_id));
            if let Some(room) = created.room {
                engine.apply_room(room);
            }
        }
        ServerToClient::RoomJoined(joined) => {
            engine.set_forced_waiting(joined.is_waiting && !joined.is_spectating);
            if joined.is_waiting {
                engine
                    .notices_mut()
                    .info("a hand is in progress, you will be dealt in next hand");
            }
            engine.apply_room(joined.room);
        }
        ServerToClient::PlayerJoinedTable(update)
        | ServerToClient::PlayerMovedToSpectating(update)
        | ServerToClient::RoomUpdated(update)
        | ServerToClient::PlayerJoined(update)
        | ServerToClient::PlayerLeft(update) => {
            if let Some(room) = update.room {
                engine.apply_room(room);
            }
        }
        ServerToClient::GameStarted(room) => {
            engine.begin_hand();
            engine.apply_room(room);
        }
        ServerToClient::GameWaiting(update) => {
            engine.set_forced_waiting(true);
            if let Some(message) = update.message.filter(|m| !m.is_empty()) {
                engine.notices_mut().info(message);
            }
            if let Some(room) = update.room {
                engine.apply_room(room);
            }
        }
        ServerToClient::ActionTaken(room) => engine.apply_room(room),
        ServerToClient::GameEnded(record) => engine.enter_settlement(record),
        ServerToClient::BuyHandSuccess(update) => engine.apply_chip_update(update.chips),
        ServerToClient::BuyHandStats(stats) => engine.apply_buy_hand_stats(stats.stats),
        ServerToClient::Error(error) => engine.on_server_error(error.message()),
    }
    Dispatch::Applied(tag)
}

fn mutates_state(message: &ServerToClient) -> bool {
    message.snapshot().is_some() || matches!(message, ServerToClient::GameEnded(_))
}
