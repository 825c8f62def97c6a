//! Latest authoritative snapshot plus the fields derived from it locally.

use crate::session::{Role, Session};
use crate::settlement;
use holdem_sync_protocol::{Card, ParticipantView, Phase, RoomSnapshot, SettlementRecord};
use std::collections::{BTreeMap, HashSet};

/// Smallest raise the gate lets onto the wire.
pub const MIN_RAISE: u64 = 5;
const RAISE_STEP: u64 = 5;

/// What the client may show of one seat's hole cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandDisplay {
    Hidden,
    /// Another seat holds two cards; their faces are withheld.
    FaceDown,
    Revealed([Card; 2]),
}

impl HandDisplay {
    /// Only a complete two-card hand is ever shown.
    pub fn from_cards(cards: &[Card]) -> Self {
        match cards {
            [a, b] => HandDisplay::Revealed([*a, *b]),
            _ => HandDisplay::Hidden,
        }
    }

    pub fn cards(&self) -> &[Card] {
        match self {
            HandDisplay::Revealed(cards) => cards.as_slice(),
            _ => &[],
        }
    }

    pub fn has_cards(&self) -> bool {
        !matches!(self, HandDisplay::Hidden)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatView {
    pub participant: ParticipantView,
    pub hand: HandDisplay,
    pub is_turn: bool,
    pub is_dealer_seat: bool,
    pub is_winner: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaiseSuggestions {
    pub min: u64,
    pub half_pot: u64,
    pub full_pot: u64,
}

/// Pot halved, rounded up to the next multiple of five.
pub fn half_pot_raise(pot: u64) -> u64 {
    pot.div_ceil(2 * RAISE_STEP) * RAISE_STEP
}

pub fn full_pot_raise(pot: u64) -> u64 {
    pot
}

#[derive(Debug, Clone, Default)]
pub struct GameStateStore {
    room: Option<RoomSnapshot>,
    /// Ids of other seats known to hold two concealed cards.
    concealed: HashSet<String>,
    settlement: Option<SettlementRecord>,
    community: Vec<Card>,
    last_seq: Option<u64>,
    chip_override: Option<u64>,
    buy_hand_stats: Option<Vec<(String, u32)>>,
}

impl GameStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all room state. Every hole card not belonging to `self_id` is
    /// dropped here, so private data of other seats is never retained.
    pub fn apply_snapshot(&mut self, mut room: RoomSnapshot, self_id: Option<&str>) {
        if self.settlement.is_none() || !room.community_cards.is_empty() {
            self.community = room.community_cards.clone();
        }

        self.concealed.clear();
        for p in &mut room.players {
            let mine = self_id == Some(p.id.as_str());
            if p.hand.len() == 2 && mine {
                continue;
            }
            if p.hand.len() == 2 && !p.folded {
                self.concealed.insert(p.id.clone());
            }
            p.hand.clear();
        }
        for p in room.waiting_players.iter_mut().chain(room.spectators.iter_mut()) {
            p.hand.clear();
        }

        self.chip_override = None;
        self.room = Some(room);
    }

    /// A new hand is starting: drop settlement and the board.
    pub fn begin_hand(&mut self) {
        self.settlement = None;
        self.community.clear();
    }

    pub fn enter_settlement(&mut self, record: SettlementRecord) {
        self.community = settlement::community_cards(&record, self.room.as_ref());
        self.settlement = Some(record);
    }

    /// False when `seq` is older than the last applied one.
    pub fn accept_seq(&mut self, seq: Option<u64>) -> bool {
        match (seq, self.last_seq) {
            (Some(seq), Some(last)) if seq < last => false,
            (Some(seq), _) => {
                self.last_seq = Some(seq);
                true
            }
            (None, _) => true,
        }
    }

    pub fn apply_chip_update(&mut self, chips: u64) {
        self.chip_override = Some(chips);
    }

    pub fn apply_buy_hand_stats(&mut self, stats: BTreeMap<String, u32>) {
        let mut rows: Vec<(String, u32)> = stats.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        self.buy_hand_stats = Some(rows);
    }

    pub fn room(&self) -> Option<&RoomSnapshot> {
        self.room.as_ref()
    }

    pub fn settlement(&self) -> Option<&SettlementRecord> {
        self.settlement.as_ref()
    }

    pub fn in_settlement(&self) -> bool {
        self.settlement.is_some()
    }

    pub fn community_cards(&self) -> &[Card] {
        &self.community
    }

    pub fn buy_hand_stats(&self) -> Option<&[(String, u32)]> {
        self.buy_hand_stats.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.room.as_ref().map_or(Phase::Waiting, |r| r.phase)
    }

    pub fn pot(&self) -> u64 {
        self.room.as_ref().map_or(0, |r| r.pot)
    }

    /// Self's seat in `players`.
    pub fn self_seat(&self, session: &Session) -> Option<&ParticipantView> {
        let room = self.room.as_ref()?;
        session.seat_in(room).map(|(_, p)| p)
    }

    /// Self's entry in whichever list currently holds it.
    pub fn self_entry(&self, session: &Session) -> Option<&ParticipantView> {
        let room = self.room.as_ref()?;
        room.players
            .iter()
            .chain(&room.waiting_players)
            .chain(&room.spectators)
            .find(|p| session.is_self(p))
    }

    pub fn displayed_chips(&self, session: &Session) -> Option<u64> {
        self.chip_override
            .or_else(|| self.self_entry(session).map(|p| p.chips))
    }

    pub fn is_self_turn(&self, session: &Session) -> bool {
        if session.role() != Role::Player {
            return false;
        }
        let Some(room) = self.room.as_ref() else {
            return false;
        };
        if room.phase == Phase::Waiting {
            return false;
        }
        let Some(seat) = room.current_turn_seat() else {
            return false;
        };
        let p = &room.players[seat];
        session.is_self(p) && !p.folded && !p.all_in
    }

    pub fn call_amount(&self, session: &Session) -> u64 {
        let current_bet = self.room.as_ref().map_or(0, |r| r.current_bet);
        let self_bet = self.self_seat(session).map_or(0, |p| p.bet);
        current_bet.saturating_sub(self_bet)
    }

    pub fn min_raise(&self) -> u64 {
        MIN_RAISE
    }

    pub fn half_pot_raise(&self) -> u64 {
        half_pot_raise(self.pot())
    }

    pub fn full_pot_raise(&self) -> u64 {
        full_pot_raise(self.pot())
    }

    pub fn raise_suggestions(&self) -> RaiseSuggestions {
        RaiseSuggestions {
            min: self.min_raise(),
            half_pot: self.half_pot_raise(),
            full_pot: self.full_pot_raise(),
        }
    }

    /// Per-seat rows for display. While settled this is the resolver's output
    /// over the current roster.
    pub fn seats(&self, session: &Session) -> Vec<SeatView> {
        let room = self.room.as_ref();
        let dealer = room.and_then(RoomSnapshot::dealer_seat);
        if let Some(record) = &self.settlement {
            return settlement::resolve(record, room.map(|r| r.players.as_slice()), dealer);
        }
        let Some(room) = room else {
            return Vec::new();
        };
        let turn = room.turn_is_live().then(|| room.current_turn_seat()).flatten();
        room.players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let hand = if session.is_self(p) {
                    HandDisplay::from_cards(&p.hand)
                } else if self.concealed.contains(&p.id) {
                    HandDisplay::FaceDown
                } else {
                    HandDisplay::Hidden
                };
                SeatView {
                    participant: p.clone(),
                    hand,
                    is_turn: turn == Some(i),
                    is_dealer_seat: dealer == Some(i),
                    is_winner: false,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdem_sync_protocol::{Rank, Suit};

    fn seat(id: &str, bet: u64, hand: Vec<Card>) -> ParticipantView {
        ParticipantView {
            id: id.into(),
            name: id.into(),
            chips: 1000 - bet,
            bet,
            hand,
            ..Default::default()
        }
    }

    fn two(rank: Rank) -> Vec<Card> {
        vec![Card::new(rank, Suit::Clubs), Card::new(rank, Suit::Diamonds)]
    }

    fn session_for(id: &str, room: &RoomSnapshot) -> Session {
        let mut session = Session::new(id);
        session.assign_id(id);
        session.resolve(room);
        session
    }

    #[test]
    fn test_half_pot_rounds_up_to_five() {
        assert_eq!(half_pot_raise(0), 0);
        assert_eq!(half_pot_raise(15), 10);
        assert_eq!(half_pot_raise(10), 5);
        assert_eq!(half_pot_raise(11), 10);
        assert_eq!(half_pot_raise(100), 50);
        assert_eq!(full_pot_raise(85), 85);
    }

    #[test]
    fn test_other_hands_are_dropped_on_ingestion() {
        let room = RoomSnapshot {
            phase: Phase::Flop,
            current_turn: Some(0),
            players: vec![seat("p1", 10, two(Rank::Ace)), seat("p2", 10, two(Rank::King))],
            ..Default::default()
        };
        let session = session_for("p1", &room);
        let mut store = GameStateStore::new();
        store.apply_snapshot(room, session.self_id());

        let stored = store.room().unwrap();
        assert_eq!(stored.players[0].hand.len(), 2);
        assert!(stored.players[1].hand.is_empty());

        let seats = store.seats(&session);
        assert_eq!(seats[0].hand.cards().len(), 2);
        assert_eq!(seats[1].hand, HandDisplay::FaceDown);
        assert!(seats[0].is_turn);
    }

    #[test]
    fn test_call_amount_never_negative() {
        let room = RoomSnapshot {
            phase: Phase::Turn,
            current_bet: 20,
            current_turn: Some(0),
            players: vec![seat("p1", 30, vec![])],
            ..Default::default()
        };
        let session = session_for("p1", &room);
        let mut store = GameStateStore::new();
        store.apply_snapshot(room.clone(), session.self_id());
        assert_eq!(store.call_amount(&session), 0);

        let behind = RoomSnapshot { current_bet: 50, ..room };
        store.apply_snapshot(behind, session.self_id());
        assert_eq!(store.call_amount(&session), 20);
    }

    #[test]
    fn test_settlement_keeps_board_until_snapshot_brings_cards() {
        let flop = two(Rank::Nine);
        let room = RoomSnapshot {
            phase: Phase::Flop,
            community_cards: flop.clone(),
            ..Default::default()
        };
        let mut store = GameStateStore::new();
        store.apply_snapshot(room.clone(), None);
        store.enter_settlement(SettlementRecord::default());
        assert_eq!(store.community_cards(), flop.as_slice());

        store.apply_snapshot(RoomSnapshot { community_cards: vec![], ..room.clone() }, None);
        assert_eq!(store.community_cards(), flop.as_slice());

        let turn_board = two(Rank::Four);
        store.apply_snapshot(RoomSnapshot { community_cards: turn_board.clone(), ..room.clone() }, None);
        assert_eq!(store.community_cards(), turn_board.as_slice());

        store.begin_hand();
        store.apply_snapshot(RoomSnapshot { community_cards: vec![], ..room }, None);
        assert!(store.community_cards().is_empty());
    }

    #[test]
    fn test_stale_sequence_numbers_are_refused() {
        let mut store = GameStateStore::new();
        assert!(store.accept_seq(None));
        assert!(store.accept_seq(Some(4)));
        assert!(store.accept_seq(Some(4)));
        assert!(!store.accept_seq(Some(3)));
        assert!(store.accept_seq(Some(9)));
        assert!(store.accept_seq(None));
    }

    #[test]
    fn test_buy_hand_stats_sorted_by_count() {
        let mut store = GameStateStore::new();
        store.apply_buy_hand_stats(BTreeMap::from([
            ("ann".to_string(), 1),
            ("bob".to_string(), 4),
            ("cid".to_string(), 1),
        ]));
        let rows = store.buy_hand_stats().unwrap();
        assert_eq!(rows[0], ("bob".to_string(), 4));
        assert_eq!(rows[1].0, "ann");
        assert_eq!(rows[2].0, "cid");
    }
}
