//! The owned client state: one per connection lifetime, no globals.

use crate::action::{ActionGate, ActionRejected};
use crate::config::ClientConfig;
use crate::notice::NoticeLog;
use crate::session::{Role, Session};
use crate::store::{GameStateStore, RaiseSuggestions, SeatView};
use crate::timer::{TimerPhase, TurnTimer, Urgency};
use crate::transport::TransportError;
use holdem_sync_protocol::{ClientToServer, RoomSnapshot, SettlementRecord};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const NORMAL_CLOSE: u16 = 1000;

/// Which control surface the client should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// No room snapshot received yet.
    Lobby,
    Settlement,
    Spectating,
    Waiting,
    /// Self holds the turn; actions are evaluable.
    Actions,
    AwaitingTurn,
    /// In a room but not found in any list.
    Unseated,
}

#[derive(Debug)]
pub struct ClientSyncEngine {
    session: Session,
    store: GameStateStore,
    timer: TurnTimer,
    gate: ActionGate,
    notices: NoticeLog,
    requested_room: Option<String>,
    room_id: Option<String>,
    forced_waiting: bool,
    self_turn: bool,
}

impl ClientSyncEngine {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            session: Session::new(config.player_name.trim()),
            store: GameStateStore::new(),
            timer: TurnTimer::new(config.turn_seconds),
            gate: ActionGate::default(),
            notices: NoticeLog::default(),
            requested_room: config.room_id.clone(),
            room_id: None,
            forced_waiting: false,
            self_turn: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &GameStateStore {
        &self.store
    }

    pub fn timer(&self) -> &TurnTimer {
        &self.timer
    }

    pub fn notices(&self) -> &NoticeLog {
        &self.notices
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    pub fn is_self_turn(&self) -> bool {
        self.store.is_self_turn(&self.session)
    }

    pub fn call_amount(&self) -> u64 {
        self.store.call_amount(&self.session)
    }

    pub fn raise_suggestions(&self) -> RaiseSuggestions {
        self.store.raise_suggestions()
    }

    pub fn seats(&self) -> Vec<SeatView> {
        self.store.seats(&self.session)
    }

    pub fn displayed_chips(&self) -> Option<u64> {
        self.store.displayed_chips(&self.session)
    }

    pub fn action_pending(&self) -> bool {
        self.gate.is_pending()
    }

    pub fn panel(&self) -> Panel {
        if self.store.room().is_none() {
            return Panel::Lobby;
        }
        if self.store.in_settlement() {
            return Panel::Settlement;
        }
        match self.session.role() {
            Role::Spectator => Panel::Spectating,
            Role::WaitingPlayer => Panel::Waiting,
            _ if self.forced_waiting => Panel::Waiting,
            Role::Player if self.is_self_turn() => Panel::Actions,
            Role::Player => Panel::AwaitingTurn,
            Role::Unset => Panel::Unseated,
        }
    }

    /// `joinRoom` when a room id was configured, `createRoom` otherwise.
    pub fn join_message(&self) -> ClientToServer {
        let player_name = self.session.display_name().to_string();
        match self.requested_room.as_ref().or(self.room_id.as_ref()) {
            Some(room_id) => ClientToServer::JoinRoom {
                room_id: room_id.clone(),
                player_name,
            },
            None => ClientToServer::CreateRoom { player_name },
        }
    }

    /// Validates an action and, when legal, returns the envelope to send.
    /// Rejections are logged as notices and nothing is produced for the wire.
    pub fn request_action(
        &mut self,
        kind: &str,
        amount: Option<&str>,
    ) -> Result<ClientToServer, ActionRejected> {
        let verdict = self.gate.evaluate(
            kind,
            amount,
            self.turn_is_live(),
            self.store.min_raise(),
        );
        match verdict {
            Ok(request) => {
                info!(kind = %request.kind, amount = request.amount, "action accepted");
                self.gate.mark_sent();
                // The turn is relinquished until a snapshot hands it back.
                self.timer.stop();
                self.self_turn = false;
                Ok(request.to_message())
            }
            Err(rejected) => {
                warn!(%rejected, "action rejected locally");
                self.notices.warn(rejected.to_string());
                Err(rejected)
            }
        }
    }

    pub fn half_pot(&mut self) -> Result<ClientToServer, ActionRejected> {
        let amount = self.store.half_pot_raise().to_string();
        self.request_action("raise", Some(&amount))
    }

    pub fn full_pot(&mut self) -> Result<ClientToServer, ActionRejected> {
        let amount = self.store.full_pot_raise().to_string();
        self.request_action("raise", Some(&amount))
    }

    /// One second of the turn countdown.
    pub fn tick(&mut self) -> Option<Urgency> {
        let urgency = self.timer.tick()?;
        if self.timer.phase() == TimerPhase::Expired {
            info!("turn timer expired");
            self.notices.warn("turn time is up");
        }
        Some(urgency)
    }

    pub fn on_connected(&mut self) {
        info!("connected");
        self.notices.info("connected to server");
    }

    pub fn on_disconnect(&mut self, code: Option<u16>, reason: &str) {
        self.timer.stop();
        self.gate.clear();
        self.self_turn = false;
        if code == Some(NORMAL_CLOSE) {
            info!("connection closed normally");
            self.notices.info("disconnected");
        } else {
            warn!(?code, reason, "connection lost");
            let code = code.map_or_else(|| "none".to_string(), |c| c.to_string());
            self.notices.error(format!(
                "connection lost (code {code}{}); use `connect` to reconnect",
                if reason.is_empty() { String::new() } else { format!(": {reason}") }
            ));
        }
    }

    pub fn on_transport_error(&mut self, error: &TransportError) {
        warn!(%error, "transport fault");
        self.notices.error(error.to_string());
    }

    pub(crate) fn notices_mut(&mut self) -> &mut NoticeLog {
        &mut self.notices
    }

    pub(crate) fn adopt_player_id(&mut self, id: &str) {
        self.session.assign_id(id);
    }

    pub(crate) fn accept_seq(&mut self, seq: Option<u64>) -> bool {
        self.store.accept_seq(seq)
    }

    pub(crate) fn set_room_id(&mut self, room_id: &str) {
        if !room_id.is_empty() && self.room_id.as_deref() != Some(room_id) {
            info!(room_id, "entered room");
            self.room_id = Some(room_id.to_string());
        }
    }

    pub(crate) fn set_forced_waiting(&mut self, waiting: bool) {
        self.forced_waiting = waiting;
        self.sync_turn();
    }

    /// A server `error` answers the last action, so the gate reopens and a
    /// still-live turn gets its countdown back.
    pub(crate) fn on_server_error(&mut self, message: &str) {
        warn!(error = message, "server reported error");
        self.notices.error(message.to_string());
        self.gate.clear();
        self.sync_turn();
    }

    /// Role resolution, store replacement and turn-edge handling for one
    /// snapshot-bearing message.
    pub(crate) fn apply_room(&mut self, room: RoomSnapshot) {
        self.set_room_id(&room.id);
        self.session.resolve(&room);
        self.store.apply_snapshot(room, self.session.self_id());
        self.gate.clear();
        self.sync_turn();
    }

    pub(crate) fn begin_hand(&mut self) {
        debug!("new hand, settlement cleared");
        self.store.begin_hand();
        self.forced_waiting = false;
    }

    pub(crate) fn enter_settlement(&mut self, record: SettlementRecord) {
        match record.winner.as_ref() {
            Some(winner) => {
                let hand = record.winning_hand.as_deref().unwrap_or("uncontested");
                self.notices.info(format!(
                    "{} wins {} ({hand})",
                    winner.display_name(),
                    record.pot
                ));
            }
            None => self.notices.info("hand ended"),
        }
        self.store.enter_settlement(record);
        self.gate.clear();
        self.sync_turn();
    }

    pub(crate) fn apply_chip_update(&mut self, chips: u64) {
        self.store.apply_chip_update(chips);
        self.notices.info(format!("bought a hand, chips now {chips}"));
    }

    pub(crate) fn apply_buy_hand_stats(&mut self, stats: BTreeMap<String, u32>) {
        self.store.apply_buy_hand_stats(stats);
    }

    fn turn_is_live(&self) -> bool {
        self.is_self_turn() && !self.forced_waiting && !self.store.in_settlement()
    }

    /// Starts the timer only on a false→true edge, stops it on true→false.
    fn sync_turn(&mut self) {
        let now = self.turn_is_live();
        match (self.self_turn, now) {
            (false, true) => {
                debug!("self turn began");
                self.timer.start();
            }
            (true, false) => {
                debug!("self turn ended");
                self.timer.stop();
            }
            _ => {}
        }
        self.self_turn = now;
    }
}
