//! Local validation of player actions before anything reaches the wire.

use holdem_sync_protocol::{ActionKind, ClientToServer};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ActionRejected {
    #[error("unknown action `{0}`")]
    UnknownKind(String),
    #[error("raise amount `{0}` is not a whole number")]
    InvalidAmount(String),
    #[error("raise of {amount} is below the minimum of {min}")]
    BelowMinimum { amount: i64, min: u64 },
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("waiting for the server to apply your last action")]
    ActionPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRequest {
    pub kind: ActionKind,
    /// Zero for everything except raises.
    pub amount: i64,
}

impl ActionRequest {
    pub fn to_message(self) -> ClientToServer {
        ClientToServer::Action {
            action: self.kind,
            amount: self.amount,
        }
    }
}

/// Tracks whether an action is in flight. The pending flag is cleared by the
/// next applied snapshot, whatever it says.
#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    pending: bool,
}

impl ActionGate {
    pub fn evaluate(
        &self,
        kind: &str,
        amount: Option<&str>,
        is_self_turn: bool,
        min_raise: u64,
    ) -> Result<ActionRequest, ActionRejected> {
        let kind = kind
            .parse::<ActionKind>()
            .map_err(ActionRejected::UnknownKind)?;
        if !is_self_turn {
            return Err(ActionRejected::NotYourTurn);
        }
        if self.pending {
            return Err(ActionRejected::ActionPending);
        }
        let amount = match kind {
            ActionKind::Raise => parse_raise(amount.unwrap_or_default(), min_raise)?,
            _ => 0,
        };
        Ok(ActionRequest { kind, amount })
    }

    pub fn mark_sent(&mut self) {
        self.pending = true;
    }

    pub fn clear(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

fn parse_raise(raw: &str, min_raise: u64) -> Result<i64, ActionRejected> {
    let raw = raw.trim();
    let amount = raw
        .parse::<i64>()
        .map_err(|_| ActionRejected::InvalidAmount(raw.to_string()))?;
    if u64::try_from(amount).map_or(true, |a| a < min_raise) {
        return Err(ActionRejected::BelowMinimum { amount, min: min_raise });
    }
    Ok(amount)
}
