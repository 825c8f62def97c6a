//! Client-side state synchronizer for a server-authoritative Hold'em table.
//!
//! [`Client`] owns a [`TransportSession`] and a [`ClientSyncEngine`] and runs
//! them on one task. The engine can also be driven directly by feeding frames
//! to [`dispatch::handle_frame`].

pub mod action;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod messages;
pub mod notice;
pub mod runtime;
pub mod session;
pub mod settlement;
pub mod store;
pub mod timer;
pub mod transport;

#[cfg(test)]
mod tests;

pub use action::{ActionGate, ActionRejected, ActionRequest};
pub use config::{ClientConfig, ConfigError};
pub use engine::{ClientSyncEngine, Panel};
pub use messages::Command;
pub use notice::{Notice, NoticeLevel, NoticeLog};
pub use runtime::{Client, Observer};
pub use session::{Role, Session};
pub use store::{GameStateStore, HandDisplay, RaiseSuggestions, SeatView};
pub use timer::{TurnTimer, TurnTimerState, Urgency};
pub use transport::{LinkState, TransportError, TransportEvent, TransportSession};
