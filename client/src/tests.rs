use crate::config::ClientConfig;
use crate::dispatch::{handle_frame, route};
use crate::engine::{ClientSyncEngine, Panel};
use crate::session::Role;
use crate::store::{half_pot_raise, HandDisplay};
use crate::timer::Urgency;
use holdem_sync_protocol::*;

#[cfg(test)]
mod sync_tests {
    use super::*;
    use serde_json::json;

    /// Creates a seated player with the given id and chips
    pub fn create_test_player(id: &str, name: &str, chips: u64) -> ParticipantView {
        ParticipantView {
            id: id.to_string(),
            name: name.to_string(),
            chips,
            status: Some("playing".to_string()),
            ..Default::default()
        }
    }

    /// Creates a flop-phase room with three players, p1 to act
    pub fn create_test_room() -> RoomSnapshot {
        let mut players = vec![
            create_test_player("p1", "John", 1000),
            create_test_player("p2", "Joe", 1000),
            create_test_player("p3", "Frank", 1000),
        ];
        players[0].flags.is_dealer = true;
        players[1].flags.is_small_blind = true;
        players[2].flags.is_big_blind = true;
        for (p, ranks) in players.iter_mut().zip([
            [Rank::Ace, Rank::King],
            [Rank::Two, Rank::Seven],
            [Rank::Queen, Rank::Queen],
        ]) {
            p.hand = vec![Card::new(ranks[0], Suit::Spades), Card::new(ranks[1], Suit::Hearts)];
        }
        RoomSnapshot {
            id: "room-1".to_string(),
            phase: Phase::Flop,
            pot: 60,
            current_bet: 20,
            current_turn: Some(0),
            dealer_index: 0,
            community_cards: vec![
                Card::new(Rank::Three, Suit::Clubs),
                Card::new(Rank::Nine, Suit::Diamonds),
                Card::new(Rank::Jack, Suit::Clubs),
            ],
            players,
            waiting_players: vec![],
            spectators: vec![],
        }
    }

    fn engine_as(name: &str) -> ClientSyncEngine {
        ClientSyncEngine::new(&ClientConfig::new("ws://127.0.0.1:8080/ws", name))
    }

    fn frame(kind: &str, data: serde_json::Value) -> String {
        json!({ "type": kind, "data": data }).to_string()
    }

    fn joined(room: &RoomSnapshot) -> String {
        frame("roomJoined", json!({ "room": room, "isSpectating": false, "isWaiting": false }))
    }

    /// roomJoined with self in players makes the action gate evaluable
    #[test]
    fn test_room_joined_seats_self() {
        let mut engine = engine_as("John");
        handle_frame(&mut engine, &joined(&create_test_room()));

        assert_eq!(engine.role(), Role::Player);
        assert_eq!(engine.session().self_id(), Some("p1"));
        assert!(engine.is_self_turn());
        assert_eq!(engine.panel(), Panel::Actions);
        assert!(engine.request_action("raise", Some("5")).is_ok());
    }

    /// Only self's hole cards survive outside settlement
    #[test]
    fn test_private_hands_are_never_retained() {
        let mut engine = engine_as("Joe");
        handle_frame(&mut engine, &joined(&create_test_room()));

        let seats = engine.seats();
        assert_eq!(seats[0].hand, HandDisplay::FaceDown);
        assert_eq!(seats[1].hand.cards().len(), 2);
        assert_eq!(seats[2].hand, HandDisplay::FaceDown);

        let stored = engine.store().room().unwrap();
        assert!(stored.players[0].hand.is_empty());
        assert!(stored.players[2].hand.is_empty());
        assert!(!seats[1].is_turn);
        assert!(seats[0].is_turn && seats[0].is_dealer_seat);
    }

    /// A folded hand stays hidden at settlement even though the live snapshot
    /// still carried two cards for it
    #[test]
    fn test_settlement_reveals_only_live_hands() {
        let mut engine = engine_as("John");
        handle_frame(&mut engine, &joined(&create_test_room()));

        let ended = frame(
            "gameEnded",
            json!({
                "winner": {"id": "p2", "name": "Joe", "chips": 1060},
                "winners": [{"id": "p2", "name": "Joe", "chips": 1060}],
                "isTie": false,
                "pot": 60,
                "winningHand": "Pair",
                "allHands": [
                    {"id": "p1", "name": "John", "folded": true, "chips": 980,
                     "hand": [{"suit": "spades", "rank": "A"}, {"suit": "hearts", "rank": "K"}]},
                    {"id": "p2", "name": "Joe", "folded": false, "chips": 1060,
                     "hand": [{"suit": "spades", "rank": "2"}, {"suit": "hearts", "rank": "7"}]},
                    {"id": "p3", "name": "Frank", "folded": true, "chips": 960, "hand": null}
                ]
            }),
        );
        handle_frame(&mut engine, &ended);
        assert_eq!(engine.panel(), Panel::Settlement);
        assert!(engine.timer().is_idle());

        let seats = engine.seats();
        assert_eq!(seats[0].hand, HandDisplay::Hidden);
        assert_eq!(seats[1].hand.cards().len(), 2);
        assert!(seats[1].is_winner);
        assert_eq!(seats[2].hand, HandDisplay::Hidden);
        assert!(seats.iter().all(|s| !s.is_turn));
        assert_eq!(engine.store().community_cards().len(), 3);
        assert!(engine.notices().latest().unwrap().text.contains("Joe wins 60 (Pair)"));

        // Settlement survives ordinary updates until the next hand starts.
        let mut idle = create_test_room();
        idle.phase = Phase::Waiting;
        idle.community_cards.clear();
        handle_frame(&mut engine, &frame("roomUpdated", json!({ "room": idle })));
        assert_eq!(engine.panel(), Panel::Settlement);
        assert_eq!(engine.store().community_cards().len(), 3);

        let mut next = create_test_room();
        next.phase = Phase::PreFlop;
        next.community_cards.clear();
        handle_frame(&mut engine, &frame("gameStarted", json!(next)));
        assert_eq!(engine.panel(), Panel::Actions);
        assert!(engine.store().community_cards().is_empty());
        assert!(engine.timer().is_running());
    }

    /// Acting while the countdown runs forces it back to idle
    #[test]
    fn test_action_resets_running_timer() {
        let mut engine = engine_as("John");
        handle_frame(&mut engine, &joined(&create_test_room()));
        for _ in 0..50 {
            engine.tick();
        }
        assert_eq!(engine.timer().remaining(), 10);
        assert_eq!(engine.timer().urgency(), Urgency::Warning);

        engine.request_action("call", None).unwrap();
        let state = engine.timer().state();
        assert_eq!(state.remaining, 60);
        assert!(!state.running);
    }

    #[test]
    fn test_rejected_actions_produce_no_message() {
        let mut engine = engine_as("Joe");
        handle_frame(&mut engine, &joined(&create_test_room()));
        assert_eq!(engine.panel(), Panel::AwaitingTurn);
        assert!(engine.request_action("fold", None).is_err());
        assert_eq!(engine.notices().latest().unwrap().text, "it is not your turn");
    }

    #[test]
    fn test_spectator_and_waiting_roles() {
        let mut room = create_test_room();
        room.spectators.push(create_test_player("s1", "Watcher", 1000));
        room.waiting_players.push(create_test_player("w1", "Late", 1000));

        let mut watcher = engine_as("Watcher");
        handle_frame(&mut watcher, &joined(&room));
        assert_eq!(watcher.role(), Role::Spectator);
        assert_eq!(watcher.panel(), Panel::Spectating);
        assert!(watcher.seats().iter().all(|s| s.hand.cards().is_empty()));

        let mut late = engine_as("Late");
        handle_frame(&mut late, &joined(&room));
        assert_eq!(late.role(), Role::WaitingPlayer);
        assert_eq!(late.panel(), Panel::Waiting);
        assert!(!late.is_self_turn());

        let mut stranger = engine_as("Nobody");
        handle_frame(&mut stranger, &joined(&room));
        assert_eq!(stranger.role(), Role::Unset);
        assert_eq!(stranger.panel(), Panel::Unseated);
    }

    #[test]
    fn test_route_accepts_decoded_messages() {
        let mut engine = engine_as("John");
        let inbound = Inbound {
            message: ServerToClient::ActionTaken(create_test_room()),
            player_id: Some("p3".to_string()),
            seq: Some(1),
        };
        route(&mut engine, inbound);
        assert_eq!(engine.session().self_id(), Some("p3"));
        assert_eq!(engine.call_amount(), 20);
        assert_eq!(half_pot_raise(engine.store().pot()), 30);
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn arb_card() -> impl Strategy<Value = Card> {
        let suits = prop_oneof![Just(Suit::Spades), Just(Suit::Hearts), Just(Suit::Diamonds), Just(Suit::Clubs)];
        let ranks = prop_oneof![
            Just(Rank::Two), Just(Rank::Five), Just(Rank::Ten), Just(Rank::Jack), Just(Rank::Ace)
        ];
        (ranks, suits).prop_map(|(r, s)| Card::new(r, s))
    }

    fn arb_participant(id: usize) -> impl Strategy<Value = ParticipantView> {
        (0u64..5000, 0u64..200, any::<bool>(), prop::collection::vec(arb_card(), 0..=2)).prop_map(
            move |(chips, bet, folded, hand)| ParticipantView {
                id: format!("p{id}"),
                name: format!("name{id}"),
                chips,
                bet,
                folded,
                hand,
                ..Default::default()
            },
        )
    }

    /// Ids are unique across the three lists; each list draws from its own range.
    fn arb_room() -> impl Strategy<Value = RoomSnapshot> {
        (
            prop::collection::vec(any::<bool>(), 0..6),
            0u8..6,
            0u64..1000,
            0u64..200,
            prop::option::of(-1i64..7),
        )
            .prop_flat_map(|(placement, phase, pot, current_bet, current_turn)| {
                let people: Vec<_> = (0..placement.len()).map(arb_participant).collect();
                (Just(placement), people, Just((phase, pot, current_bet, current_turn)))
            })
            .prop_map(|(placement, people, (phase, pot, current_bet, current_turn))| {
                let mut room = RoomSnapshot {
                    phase: [Phase::Waiting, Phase::PreFlop, Phase::Flop, Phase::Turn, Phase::River, Phase::Showdown]
                        [phase as usize],
                    pot,
                    current_bet,
                    current_turn,
                    ..Default::default()
                };
                for (i, (seated, p)) in placement.into_iter().zip(people).enumerate() {
                    match (seated, i % 3) {
                        (true, _) => room.players.push(p),
                        (false, 0) => room.waiting_players.push(p),
                        (false, _) => room.spectators.push(p),
                    }
                }
                room
            })
    }

    fn engine_with_id(id: &str) -> ClientSyncEngine {
        let mut engine = ClientSyncEngine::new(&ClientConfig::new("ws://h/ws", "unused"));
        route(
            &mut engine,
            Inbound {
                message: ServerToClient::Error(ServerError::Bare("hello".into())),
                player_id: Some(id.to_string()),
                seq: None,
            },
        );
        engine
    }

    proptest! {
        #[test]
        fn role_matches_membership(room in arb_room(), pick in 0usize..6) {
            let id = format!("p{pick}");
            let mut engine = engine_with_id(&id);
            route(&mut engine, Inbound { message: ServerToClient::ActionTaken(room.clone()), player_id: None, seq: None });

            let expected = if room.players.iter().any(|p| p.id == id) {
                Role::Player
            } else if room.waiting_players.iter().any(|p| p.id == id) {
                Role::WaitingPlayer
            } else if room.spectators.iter().any(|p| p.id == id) {
                Role::Spectator
            } else {
                Role::Unset
            };
            prop_assert_eq!(engine.role(), expected);
        }

        #[test]
        fn only_self_hand_is_visible_outside_settlement(room in arb_room(), pick in 0usize..6) {
            let id = format!("p{pick}");
            let mut engine = engine_with_id(&id);
            route(&mut engine, Inbound { message: ServerToClient::ActionTaken(room), player_id: None, seq: None });

            for seat in engine.seats() {
                if !seat.hand.cards().is_empty() {
                    prop_assert_eq!(&seat.participant.id, &id);
                }
                prop_assert!(seat.hand.cards().is_empty() || seat.hand.cards().len() == 2);
            }
            let stored = engine.store().room().unwrap();
            for p in stored.players.iter().chain(&stored.waiting_players).chain(&stored.spectators) {
                prop_assert!(p.hand.is_empty() || p.id == id);
            }
        }

        #[test]
        fn settlement_hides_folded_hands(room in arb_room(), folded in prop::collection::vec(any::<bool>(), 6)) {
            let mut engine = engine_with_id("p0");
            route(&mut engine, Inbound { message: ServerToClient::ActionTaken(room.clone()), player_id: None, seq: None });
            let record = SettlementRecord {
                all_hands: room
                    .players
                    .iter()
                    .enumerate()
                    .map(|(i, p)| SettledHand {
                        id: p.id.clone(),
                        name: p.name.clone(),
                        hand: vec![Card::new(Rank::Ace, Suit::Spades), Card::new(Rank::Ace, Suit::Hearts)],
                        folded: folded[i],
                        chips: p.chips,
                    })
                    .collect(),
                ..Default::default()
            };
            route(&mut engine, Inbound { message: ServerToClient::GameEnded(record.clone()), player_id: None, seq: None });

            for seat in engine.seats() {
                let settled = record.hand_of(&seat.participant.id).unwrap();
                prop_assert_eq!(seat.hand.cards().is_empty(), settled.folded);
            }
        }

        #[test]
        fn half_pot_is_smallest_multiple_of_five_covering_half(pot in 0u64..1_000_000) {
            let raise = half_pot_raise(pot);
            prop_assert_eq!(raise % 5, 0);
            prop_assert!(raise * 2 >= pot);
            prop_assert!(raise < 5 || (raise - 5) * 2 < pot);
        }

        #[test]
        fn applying_same_snapshot_twice_is_idempotent(room in arb_room(), pick in 0usize..6) {
            let mut engine = engine_with_id(&format!("p{pick}"));
            let msg = || Inbound { message: ServerToClient::ActionTaken(room.clone()), player_id: None, seq: None };

            route(&mut engine, msg());
            let first = (engine.is_self_turn(), engine.call_amount(), engine.role(), engine.seats());
            route(&mut engine, msg());
            let second = (engine.is_self_turn(), engine.call_amount(), engine.role(), engine.seats());
            prop_assert_eq!(first, second);
        }
    }
}
