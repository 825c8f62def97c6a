//! Hand-end reveal rules.
//!
//! The resolver is a pure function of the settlement record and the last known
//! roster. Only the record's own `folded` flag decides a reveal; the live
//! snapshot's flag may be a hand behind.

use crate::store::{HandDisplay, SeatView};
use holdem_sync_protocol::{Card, ParticipantView, RoomSnapshot, SeatFlags, SettledHand, SettlementRecord};

const UNNAMED_PLAYER: &str = "Player";

pub fn resolve(
    record: &SettlementRecord,
    roster: Option<&[ParticipantView]>,
    dealer_seat: Option<usize>,
) -> Vec<SeatView> {
    match roster.filter(|r| !r.is_empty()) {
        Some(roster) => roster
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.id.is_empty())
            .map(|(i, p)| {
                let settled = record.hand_of(&p.id);
                let mut participant = p.clone();
                participant.hand.clear();
                if let Some(h) = settled {
                    participant.folded = h.folded;
                    participant.chips = h.chips;
                }
                SeatView {
                    hand: settled.map_or(HandDisplay::Hidden, reveal),
                    is_turn: false,
                    is_dealer_seat: dealer_seat == Some(i),
                    is_winner: record.is_winner(&p.id),
                    participant,
                }
            })
            .collect(),
        None => record
            .all_hands
            .iter()
            .filter(|h| !h.id.is_empty())
            .map(|h| SeatView {
                participant: synthesize(h),
                hand: reveal(h),
                is_turn: false,
                is_dealer_seat: false,
                is_winner: record.is_winner(&h.id),
            })
            .collect(),
    }
}

/// Community cards to show while settled: the record's own, else the last
/// snapshot's, else none.
pub fn community_cards(record: &SettlementRecord, last: Option<&RoomSnapshot>) -> Vec<Card> {
    record
        .community_cards
        .clone()
        .or_else(|| last.map(|room| room.community_cards.clone()))
        .unwrap_or_default()
}

fn reveal(settled: &SettledHand) -> HandDisplay {
    if settled.folded {
        return HandDisplay::Hidden;
    }
    HandDisplay::from_cards(&settled.hand)
}

fn synthesize(settled: &SettledHand) -> ParticipantView {
    ParticipantView {
        id: settled.id.clone(),
        name: if settled.name.is_empty() {
            UNNAMED_PLAYER.to_string()
        } else {
            settled.name.clone()
        },
        chips: settled.chips,
        bet: 0,
        folded: settled.folded,
        all_in: false,
        flags: SeatFlags::default(),
        hand: Vec::new(),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdem_sync_protocol::{Rank, Suit, WinnerView};

    fn pair(rank: Rank) -> Vec<Card> {
        vec![Card::new(rank, Suit::Hearts), Card::new(rank, Suit::Spades)]
    }

    fn settled(id: &str, folded: bool, hand: Vec<Card>) -> SettledHand {
        SettledHand {
            id: id.into(),
            name: id.to_uppercase(),
            hand,
            folded,
            chips: 500,
        }
    }

    fn record() -> SettlementRecord {
        SettlementRecord {
            winner: Some(WinnerView { id: "p2".into(), name: "P2".into(), chips: 560 }),
            pot: 60,
            all_hands: vec![
                settled("p1", true, pair(Rank::Seven)),
                settled("p2", false, pair(Rank::King)),
                settled("p3", false, vec![Card::new(Rank::Two, Suit::Clubs)]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_folded_in_record_hides_cards_even_if_roster_disagrees() {
        let roster = vec![
            ParticipantView { id: "p1".into(), name: "Ann".into(), folded: false, hand: pair(Rank::Ace), ..Default::default() },
            ParticipantView { id: "p2".into(), name: "Bob".into(), ..Default::default() },
            ParticipantView { id: "p3".into(), name: "Cid".into(), ..Default::default() },
        ];
        let seats = resolve(&record(), Some(roster.as_slice()), Some(0));
        assert_eq!(seats[0].hand, HandDisplay::Hidden);
        assert!(seats[0].participant.folded);
        assert!(seats[0].participant.hand.is_empty());
        assert_eq!(seats[1].hand.cards(), pair(Rank::King).as_slice());
        assert!(seats[1].is_winner);
        // A malformed one-card hand is never shown.
        assert_eq!(seats[2].hand, HandDisplay::Hidden);
        assert!(seats[0].is_dealer_seat);
        assert!(seats.iter().all(|s| !s.is_turn));
    }

    #[test]
    fn test_roster_seat_missing_from_record_stays_hidden() {
        let roster = vec![ParticipantView { id: "p9".into(), name: "Late".into(), hand: pair(Rank::Ace), ..Default::default() }];
        let seats = resolve(&record(), Some(roster.as_slice()), None);
        assert_eq!(seats.len(), 1);
        assert_eq!(seats[0].hand, HandDisplay::Hidden);
    }

    #[test]
    fn test_missing_roster_is_synthesized_from_record() {
        let seats = resolve(&record(), None, None);
        assert_eq!(seats.len(), 3);
        assert_eq!(seats[0].participant.name, "P1");
        assert_eq!(seats[0].participant.bet, 0);
        assert_eq!(seats[1].hand.cards().len(), 2);
        assert_eq!(resolve(&record(), Some(Vec::new().as_slice()), None).len(), 3);
    }

    #[test]
    fn test_community_card_fallbacks() {
        let flop = vec![
            Card::new(Rank::Two, Suit::Clubs),
            Card::new(Rank::Five, Suit::Hearts),
            Card::new(Rank::Nine, Suit::Spades),
        ];
        let last = RoomSnapshot { community_cards: flop.clone(), ..Default::default() };

        let mut rec = record();
        assert_eq!(community_cards(&rec, Some(&last)), flop);
        assert!(community_cards(&rec, None).is_empty());

        rec.community_cards = Some(flop[..1].to_vec());
        assert_eq!(community_cards(&rec, Some(&last)), flop[..1].to_vec());
    }
}
