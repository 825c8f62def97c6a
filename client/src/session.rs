//! Session identity: which participant in a snapshot is "self", and in what role.

use holdem_sync_protocol::{ParticipantView, RoomSnapshot};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Player,
    Spectator,
    WaitingPlayer,
    #[default]
    Unset,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player => write!(f, "player"),
            Role::Spectator => write!(f, "spectator"),
            Role::WaitingPlayer => write!(f, "waiting for next hand"),
            Role::Unset => write!(f, "unseated"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    self_id: Option<String>,
    display_name: String,
    role: Role,
}

impl Session {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            self_id: None,
            display_name: display_name.into(),
            role: Role::Unset,
        }
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_self(&self, participant: &ParticipantView) -> bool {
        self.self_id.as_deref() == Some(participant.id.as_str())
    }

    /// Adopts a server-assigned id. Once set, name matching is never used again.
    pub fn assign_id(&mut self, id: &str) {
        if self.self_id.as_deref() != Some(id) {
            tracing::info!(id, "server assigned session id");
            self.self_id = Some(id.to_string());
        }
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Recomputes the role from list membership, `players` first, then
    /// `waitingPlayers`, then `spectators`. Without a known id the display name
    /// bridges the join handshake, and a name hit adopts that entry's id.
    pub fn resolve(&mut self, room: &RoomSnapshot) -> Role {
        let lists = [
            (Role::Player, &room.players),
            (Role::WaitingPlayer, &room.waiting_players),
            (Role::Spectator, &room.spectators),
        ];

        let found = match self.self_id.as_deref() {
            Some(id) => lists
                .iter()
                .find(|(_, list)| list.iter().any(|p| p.id == id))
                .map(|(role, _)| (*role, None)),
            None => lists.iter().find_map(|(role, list)| {
                list.iter()
                    .find(|p| !self.display_name.is_empty() && p.name == self.display_name)
                    .map(|p| (*role, Some(p.id.clone())))
            }),
        };

        let role = match found {
            Some((role, adopted)) => {
                if let Some(id) = adopted.filter(|id| !id.is_empty()) {
                    tracing::debug!(%id, name = %self.display_name, "identity resolved by name");
                    self.self_id = Some(id);
                }
                role
            }
            None => {
                tracing::debug!(
                    id = ?self.self_id,
                    name = %self.display_name,
                    "self not present in snapshot"
                );
                Role::Unset
            }
        };
        if role != self.role {
            tracing::info!(from = %self.role, to = %role, "role changed");
        }
        self.role = role;
        role
    }

    /// Seat index of self in `players`, if seated.
    pub fn seat_in<'a>(&self, room: &'a RoomSnapshot) -> Option<(usize, &'a ParticipantView)> {
        let id = self.self_id.as_deref()?;
        room.players.iter().enumerate().find(|(_, p)| p.id == id)
    }

    pub fn clear_role(&mut self) {
        self.role = Role::Unset;
    }
}
