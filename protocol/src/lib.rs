use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// ---- Cards ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
        }
    }

    pub fn is_red(self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    #[serde(rename = "2")]
    Two = 2,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl Rank {
    pub fn label(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::King => "K",
            Rank::Queen => "Q",
            Rank::Jack => "J",
            Rank::Ten => "10",
            Rank::Nine => "9",
            Rank::Eight => "8",
            Rank::Seven => "7",
            Rank::Six => "6",
            Rank::Five => "5",
            Rank::Four => "4",
            Rank::Three => "3",
            Rank::Two => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

/// ---- Room snapshots ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Waiting,
    #[serde(rename = "preflop")]
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Waiting => write!(f, "waiting"),
            Phase::PreFlop => write!(f, "pre-flop"),
            Phase::Flop => write!(f, "flop"),
            Phase::Turn => write!(f, "turn"),
            Phase::River => write!(f, "river"),
            Phase::Showdown => write!(f, "showdown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SeatFlags {
    #[serde(rename = "isDealer", default)]
    pub is_dealer: bool,
    #[serde(rename = "isSmall", default)]
    pub is_small_blind: bool,
    #[serde(rename = "isBig", default)]
    pub is_big_blind: bool,
}

/// One entry of `players`, `waitingPlayers` or `spectators`. Waiting players
/// and spectators only carry id, name, chips and status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ParticipantView {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chips: u64,
    #[serde(default)]
    pub bet: u64,
    #[serde(default)]
    pub folded: bool,
    #[serde(rename = "allIn", default)]
    pub all_in: bool,
    #[serde(flatten)]
    pub flags: SeatFlags,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hand: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Complete room state at one instant. Never a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "gamePhase", default)]
    pub phase: Phase,
    #[serde(default)]
    pub pot: u64,
    #[serde(default)]
    pub current_bet: u64,
    #[serde(rename = "currentTurn", default)]
    pub current_turn: Option<i64>,
    #[serde(default)]
    pub dealer_index: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub community_cards: Vec<Card>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: Vec<ParticipantView>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub waiting_players: Vec<ParticipantView>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spectators: Vec<ParticipantView>,
}

impl RoomSnapshot {
    /// Seat whose action the rule engine awaits, if `currentTurn` indexes `players`.
    pub fn current_turn_seat(&self) -> Option<usize> {
        let idx = usize::try_from(self.current_turn?).ok()?;
        (idx < self.players.len()).then_some(idx)
    }

    /// Turn-dependent behaviour is only meaningful while a hand is running.
    pub fn turn_is_live(&self) -> bool {
        self.phase != Phase::Waiting && self.current_turn_seat().is_some()
    }

    pub fn dealer_seat(&self) -> Option<usize> {
        let idx = usize::try_from(self.dealer_index).ok()?;
        (idx < self.players.len()).then_some(idx)
    }
}

/// ---- Settlement ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WinnerView {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chips: u64,
}

impl WinnerView {
    /// Server names can be blank; fall back to a short id tag.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Player {}", self.id.chars().take(4).collect::<String>())
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SettledHand {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub folded: bool,
    #[serde(default)]
    pub chips: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    #[serde(default)]
    pub winner: Option<WinnerView>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub winners: Vec<WinnerView>,
    #[serde(default)]
    pub is_tie: bool,
    #[serde(default)]
    pub pot: u64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub winning_hand: Option<String>,
    #[serde(default)]
    pub community_cards: Option<Vec<Card>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub all_hands: Vec<SettledHand>,
}

impl SettlementRecord {
    pub fn winner_id(&self) -> Option<&str> {
        self.winner.as_ref().map(|w| w.id.as_str())
    }

    /// True for the primary winner and for every split-pot co-winner.
    pub fn is_winner(&self, id: &str) -> bool {
        self.winner_id() == Some(id) || self.winners.iter().any(|w| w.id == id)
    }

    pub fn hand_of(&self, id: &str) -> Option<&SettledHand> {
        self.all_hands.iter().find(|h| h.id == id)
    }
}

/// ---- Inbound payloads ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_id: String,
    #[serde(default)]
    pub room: Option<RoomSnapshot>,
    #[serde(default)]
    pub is_spectating: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    pub room: RoomSnapshot,
    #[serde(default)]
    pub is_spectating: bool,
    #[serde(default)]
    pub is_waiting: bool,
}

/// Shared payload of the messages that only carry a refreshed room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    #[serde(default)]
    pub room: Option<RoomSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<ParticipantView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChipUpdate {
    pub chips: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BuyHandStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: BTreeMap<String, u32>,
}

/// `error.data` arrives either as `{message}` or as a bare string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServerError {
    Detailed { message: String },
    Bare(String),
}

impl ServerError {
    pub fn message(&self) -> &str {
        match self {
            ServerError::Detailed { message } | ServerError::Bare(message) => message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerToClient {
    RoomCreated(RoomCreated),
    RoomJoined(RoomJoined),
    PlayerJoinedTable(RoomUpdate),
    PlayerMovedToSpectating(RoomUpdate),
    RoomUpdated(RoomUpdate),
    PlayerJoined(RoomUpdate),
    GameStarted(RoomSnapshot),
    GameWaiting(RoomUpdate),
    ActionTaken(RoomSnapshot),
    GameEnded(SettlementRecord),
    BuyHandSuccess(ChipUpdate),
    BuyHandStats(BuyHandStats),
    Error(ServerError),
    PlayerLeft(RoomUpdate),
}

/// Every inbound `type` tag this client understands.
pub const INBOUND_TYPES: &[&str] = &[
    "roomCreated",
    "roomJoined",
    "playerJoinedTable",
    "playerMovedToSpectating",
    "roomUpdated",
    "playerJoined",
    "gameStarted",
    "gameWaiting",
    "actionTaken",
    "gameEnded",
    "buyHandSuccess",
    "buyHandStats",
    "error",
    "playerLeft",
];

impl ServerToClient {
    pub fn tag(&self) -> &'static str {
        match self {
            ServerToClient::RoomCreated(_) => "roomCreated",
            ServerToClient::RoomJoined(_) => "roomJoined",
            ServerToClient::PlayerJoinedTable(_) => "playerJoinedTable",
            ServerToClient::PlayerMovedToSpectating(_) => "playerMovedToSpectating",
            ServerToClient::RoomUpdated(_) => "roomUpdated",
            ServerToClient::PlayerJoined(_) => "playerJoined",
            ServerToClient::GameStarted(_) => "gameStarted",
            ServerToClient::GameWaiting(_) => "gameWaiting",
            ServerToClient::ActionTaken(_) => "actionTaken",
            ServerToClient::GameEnded(_) => "gameEnded",
            ServerToClient::BuyHandSuccess(_) => "buyHandSuccess",
            ServerToClient::BuyHandStats(_) => "buyHandStats",
            ServerToClient::Error(_) => "error",
            ServerToClient::PlayerLeft(_) => "playerLeft",
        }
    }

    /// The room snapshot this message carries, if any.
    pub fn snapshot(&self) -> Option<&RoomSnapshot> {
        match self {
            ServerToClient::RoomCreated(c) => c.room.as_ref(),
            ServerToClient::RoomJoined(j) => Some(&j.room),
            ServerToClient::PlayerJoinedTable(u)
            | ServerToClient::PlayerMovedToSpectating(u)
            | ServerToClient::RoomUpdated(u)
            | ServerToClient::PlayerJoined(u)
            | ServerToClient::GameWaiting(u)
            | ServerToClient::PlayerLeft(u) => u.room.as_ref(),
            ServerToClient::GameStarted(s) | ServerToClient::ActionTaken(s) => Some(s),
            ServerToClient::GameEnded(_)
            | ServerToClient::BuyHandSuccess(_)
            | ServerToClient::BuyHandStats(_)
            | ServerToClient::Error(_) => None,
        }
    }
}

/// ---- Outbound ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fold" => Ok(ActionKind::Fold),
            "check" => Ok(ActionKind::Check),
            "call" => Ok(ActionKind::Call),
            "raise" => Ok(ActionKind::Raise),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Fold => write!(f, "fold"),
            ActionKind::Check => write!(f, "check"),
            ActionKind::Call => write!(f, "call"),
            ActionKind::Raise => write!(f, "raise"),
        }
    }
}

// Empty struct variants keep `"data": {}` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientToServer {
    #[serde(rename_all = "camelCase")]
    CreateRoom { player_name: String },
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String, player_name: String },
    StartGame {},
    JoinTable {},
    BuyHand {},
    GetBuyHandStats {},
    Action { action: ActionKind, amount: i64 },
    Heartbeat {},
}

/// ---- Envelope codec ----
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    Json(#[source] serde_json::Error),
    #[error("frame is not a {{type, data}} envelope")]
    NotAnEnvelope,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("malformed `{kind}` payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("refusing to send invalid envelope: {0}")]
    InvalidOutbound(String),
}

/// A decoded inbound frame plus the optional envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub message: ServerToClient,
    /// Stable id the server assigned to this connection, when echoed.
    pub player_id: Option<String>,
    /// Monotonic sequence number, when the server provides one.
    pub seq: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default)]
    seq: Option<u64>,
}

pub fn decode(text: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Json)?;
    let raw: RawEnvelope =
        serde_json::from_value(value).map_err(|_| ProtocolError::NotAnEnvelope)?;
    if !INBOUND_TYPES.contains(&raw.kind.as_str()) {
        return Err(ProtocolError::UnknownType(raw.kind));
    }
    let tagged = serde_json::json!({ "type": raw.kind, "data": raw.data });
    let message = serde_json::from_value(tagged).map_err(|source| ProtocolError::Malformed {
        kind: raw.kind.clone(),
        source,
    })?;
    Ok(Inbound {
        message,
        player_id: raw.player_id.filter(|id| !id.is_empty()),
        seq: raw.seq,
    })
}

/// Serializes an outbound message, refusing anything that is not a
/// `{type: string, data: object}` envelope.
pub fn encode(msg: &ClientToServer) -> Result<String, ProtocolError> {
    let value = serde_json::to_value(msg)
        .map_err(|e| ProtocolError::InvalidOutbound(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ProtocolError::InvalidOutbound("not an object".into()))?;
    if !obj.get("type").is_some_and(Value::is_string) {
        return Err(ProtocolError::InvalidOutbound("missing string `type`".into()));
    }
    if !obj.get("data").is_some_and(Value::is_object) {
        return Err(ProtocolError::InvalidOutbound("missing object `data`".into()));
    }
    Ok(value.to_string())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.filter(|s| !s.trim().is_empty()))
}
