//! One WebSocket connection at a time, driven by a background task.
//!
//! The task owns the socket halves and the heartbeat interval. Callers talk to
//! it over an unbounded channel and learn about frames and closes through
//! [`TransportEvent`]s; connection state is published on a `watch` channel.

use crate::config::ClientConfig;
use futures_util::{SinkExt, StreamExt};
use holdem_sync_protocol::{encode, ClientToServer, ProtocolError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Open,
    Closed { code: Option<u16> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    /// `code` is `None` when the stream ended without a close frame.
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("connection attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("not connected")]
    NotOpen,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

enum Outgoing {
    Text(String),
    Close,
}

pub struct TransportSession {
    url: String,
    heartbeat_interval: Duration,
    connect_timeout: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
    state_tx: Arc<watch::Sender<LinkState>>,
    state_rx: watch::Receiver<LinkState>,
    outbound: Option<mpsc::UnboundedSender<Outgoing>>,
    task: Option<JoinHandle<()>>,
}

impl TransportSession {
    pub fn new(config: &ClientConfig) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::Idle);
        let session = Self {
            url: config.url.clone(),
            heartbeat_interval: config.heartbeat_interval,
            connect_timeout: config.connect_timeout,
            events,
            state_tx: Arc::new(state_tx),
            state_rx,
            outbound: None,
            task: None,
        };
        (session, events_rx)
    }

    pub fn state(&self) -> LinkState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state_rx.clone()
    }

    pub fn is_open(&self) -> bool {
        *self.state_rx.borrow() == LinkState::Open
    }

    /// Starts a connection attempt unless one is already in flight or open.
    /// Returns whether a new attempt was started.
    pub fn begin_connect(&mut self) -> bool {
        if matches!(self.state(), LinkState::Connecting | LinkState::Open) {
            debug!("connect ignored, link already active");
            return false;
        }
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.state_tx.send_replace(LinkState::Connecting);
        info!(url = %self.url, "connecting");
        self.task = Some(tokio::spawn(run_connection(
            self.url.clone(),
            self.heartbeat_interval,
            self.connect_timeout,
            out_rx,
            self.events.clone(),
            Arc::clone(&self.state_tx),
        )));
        self.outbound = Some(out_tx);
        true
    }

    /// Starts an attempt if needed and waits until it resolves.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        self.begin_connect();
        let mut state = self.subscribe();
        let wait = state.wait_for(|s| !matches!(s, LinkState::Connecting));
        // The task enforces connect_timeout itself; this bound only guards
        // against a task that never reports back.
        let resolved = match timeout(self.connect_timeout + CLOSE_GRACE, wait).await {
            Ok(Ok(s)) => s.clone(),
            _ => return Err(TransportError::Timeout(self.connect_timeout)),
        };
        match resolved {
            LinkState::Open => Ok(()),
            _ => Err(TransportError::Connect {
                url: self.url.clone(),
                reason: "connection closed before opening".into(),
            }),
        }
    }

    pub fn send(&self, msg: &ClientToServer) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let text = encode(msg)?;
        let tx = self.outbound.as_ref().ok_or(TransportError::NotOpen)?;
        tx.send(Outgoing::Text(text))
            .map_err(|_| TransportError::NotOpen)
    }

    /// Sends a normal-closure frame and waits briefly for the task to finish.
    /// An attempt that has not opened yet is aborted outright.
    pub async fn close(&mut self) {
        if self.state() == LinkState::Connecting {
            self.outbound = None;
            if let Some(task) = self.task.take() {
                task.abort();
                let _ = task.await;
            }
            let code = u16::from(CloseCode::Normal);
            info!(url = %self.url, "connection attempt cancelled");
            self.state_tx.send_replace(LinkState::Closed { code: Some(code) });
            let _ = self.events.send(TransportEvent::Closed {
                code: Some(code),
                reason: "connection attempt cancelled".to_string(),
            });
            return;
        }
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Outgoing::Close);
        }
        if let Some(task) = self.task.take() {
            if timeout(CLOSE_GRACE * 2, task).await.is_err() {
                warn!("connection task did not stop in time");
            }
        }
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_connection(
    url: String,
    heartbeat_every: Duration,
    connect_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<watch::Sender<LinkState>>,
) {
    let stream = match timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(e)) => {
            error!(%url, error = %e, "connect failed");
            state.send_replace(LinkState::Closed { code: None });
            let _ = events.send(TransportEvent::Error(
                TransportError::Connect { url, reason: e.to_string() }.to_string(),
            ));
            return;
        }
        Err(_) => {
            error!(%url, "connect timed out");
            state.send_replace(LinkState::Closed { code: None });
            let _ = events.send(TransportEvent::Error(
                TransportError::Timeout(connect_timeout).to_string(),
            ));
            return;
        }
    };

    info!(%url, "connection open");
    state.send_replace(LinkState::Open);
    let _ = events.send(TransportEvent::Opened);

    let (mut write, mut read) = stream.split();
    let mut heartbeat = interval_at(Instant::now() + heartbeat_every, heartbeat_every);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (code, reason) = loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let Ok(text) = encode(&ClientToServer::Heartbeat {}) else {
                    continue;
                };
                debug!("heartbeat");
                if let Err(e) = write.send(Message::Text(text)).await {
                    error!(error = %e, "heartbeat send failed");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break (None, e.to_string());
                }
            }
            out = outbound.recv() => match out {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        error!(error = %e, "send failed");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break (None, e.to_string());
                    }
                }
                Some(Outgoing::Close) | None => {
                    let frame = CloseFrame { code: CloseCode::Normal, reason: "".into() };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    // Drain until the peer acknowledges the close.
                    let _ = timeout(CLOSE_GRACE, async {
                        while let Some(Ok(msg)) = read.next().await {
                            if msg.is_close() {
                                break;
                            }
                        }
                    })
                    .await;
                    break (Some(u16::from(CloseCode::Normal)), "closed by client".to_string());
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Frame(text));
                }
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.as_ref().map(|f| u16::from(f.code));
                    let reason = frame.map(|f| f.reason.into_owned()).unwrap_or_default();
                    break (code, reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "read failed");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break (None, e.to_string());
                }
                None => break (None, "stream ended".to_string()),
            },
        }
    };

    info!(?code, %reason, "connection closed");
    state.send_replace(LinkState::Closed { code });
    let _ = events.send(TransportEvent::Closed { code, reason });
}
