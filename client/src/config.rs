//! Connection settings for one client process.

use crate::timer::DEFAULT_TURN_SECONDS;
use std::time::Duration;
use url::Url;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080/ws";
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid server url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported url scheme `{0}`, expected ws or wss")]
    UnsupportedScheme(String),
    #[error("player name must not be empty")]
    EmptyName,
}

/// Client settings.
///
/// ```
/// use holdem_sync::ClientConfig;
///
/// let config = ClientConfig::new("ws://localhost:8080/ws", "Ann").with_room("r1");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub player_name: String,
    /// Room to join; `None` creates a new one.
    pub room_id: Option<String>,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub turn_seconds: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            player_name: String::new(),
            room_id: None,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            turn_seconds: DEFAULT_TURN_SECONDS,
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, player_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            player_name: player_name.into(),
            ..Default::default()
        }
    }

    /// Blank room ids are treated as "create a room".
    #[must_use]
    pub fn with_room(mut self, room_id: impl Into<String>) -> Self {
        let room_id = room_id.into();
        self.room_id = (!room_id.trim().is_empty()).then(|| room_id.trim().to_string());
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_turn_seconds(mut self, seconds: u32) -> Self {
        self.turn_seconds = seconds;
        self
    }

    pub fn validate(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        if self.player_name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(url)
    }
}
