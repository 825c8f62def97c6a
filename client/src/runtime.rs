//! Single-task event loop tying the transport to the engine.

use crate::config::{ClientConfig, ConfigError};
use crate::dispatch::{handle_frame, Dispatch};
use crate::engine::ClientSyncEngine;
use crate::messages::Command;
use crate::notice::Notice;
use crate::timer::{TurnTimerState, Urgency};
use crate::transport::{TransportEvent, TransportSession};
use holdem_sync_protocol::ClientToServer;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

const TICK: Duration = Duration::from_secs(1);

/// Hooks for whoever renders the engine state.
pub trait Observer {
    fn on_state(&mut self, _engine: &ClientSyncEngine) {}
    fn on_notice(&mut self, _notice: &Notice) {}
    fn on_tick(&mut self, _state: TurnTimerState, _urgency: Urgency) {}
}

impl Observer for () {}

pub struct Client {
    engine: ClientSyncEngine,
    transport: TransportSession,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    ticker: Option<Interval>,
    ticker_run: u64,
    seen: u64,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (transport, events) = TransportSession::new(&config);
        Ok(Self {
            engine: ClientSyncEngine::new(&config),
            transport,
            events,
            ticker: None,
            ticker_run: 0,
            seen: 0,
        })
    }

    pub fn engine(&self) -> &ClientSyncEngine {
        &self.engine
    }

    /// Runs until `Quit` or until the command channel closes, then returns
    /// the engine for inspection.
    pub async fn run<O: Observer>(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        observer: &mut O,
    ) -> ClientSyncEngine {
        self.transport.begin_connect();
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => {
                    let state_changed = self.on_transport(event);
                    if state_changed {
                        observer.on_state(&self.engine);
                    }
                }
                cmd = commands.recv() => match cmd {
                    None | Some(Command::Quit) => break,
                    Some(cmd) => {
                        self.on_command(cmd).await;
                        observer.on_state(&self.engine);
                    }
                },
                _ = next_tick(&mut self.ticker) => {
                    if let Some(urgency) = self.engine.tick() {
                        observer.on_tick(self.engine.timer().state(), urgency);
                    }
                }
            }
            self.sync_ticker();
            self.flush_notices(observer);
        }

        info!("shutting down");
        self.transport.close().await;
        while let Ok(event) = self.events.try_recv() {
            self.on_transport(event);
        }
        self.flush_notices(observer);
        self.engine
    }

    /// Returns whether the engine state changed.
    fn on_transport(&mut self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Opened => {
                self.engine.on_connected();
                let join = self.engine.join_message();
                self.send(&join);
                true
            }
            TransportEvent::Frame(text) => {
                matches!(handle_frame(&mut self.engine, &text), Dispatch::Applied(_))
            }
            TransportEvent::Closed { code, reason } => {
                self.engine.on_disconnect(code, &reason);
                true
            }
            TransportEvent::Error(message) => {
                debug!(%message, "transport error event");
                self.engine.notices_mut().error(message);
                false
            }
        }
    }

    async fn on_command(&mut self, cmd: Command) {
        let outbound = match cmd {
            Command::Connect => {
                if !self.transport.begin_connect() {
                    self.engine.notices_mut().info("already connected");
                }
                None
            }
            Command::Disconnect => {
                self.transport.close().await;
                None
            }
            Command::Join => Some(self.engine.join_message()),
            Command::StartGame => Some(ClientToServer::StartGame {}),
            Command::JoinTable => Some(ClientToServer::JoinTable {}),
            Command::BuyHand => Some(ClientToServer::BuyHand {}),
            Command::BuyHandStats => Some(ClientToServer::GetBuyHandStats {}),
            Command::Act { kind, amount } => {
                self.engine.request_action(&kind, amount.as_deref()).ok()
            }
            Command::HalfPot => self.engine.half_pot().ok(),
            Command::FullPot => self.engine.full_pot().ok(),
            Command::Quit => None,
        };
        if let Some(msg) = outbound {
            self.send(&msg);
        }
    }

    fn send(&mut self, msg: &ClientToServer) {
        if let Err(error) = self.transport.send(msg) {
            self.engine.on_transport_error(&error);
        }
    }

    /// The 1 s interval exists only while the countdown runs, and is rebuilt
    /// on every restart so the first tick lands a full second after it.
    fn sync_ticker(&mut self) {
        let timer = self.engine.timer();
        if !timer.is_running() {
            self.ticker = None;
            return;
        }
        if self.ticker.is_none() || self.ticker_run != timer.run() {
            self.ticker_run = timer.run();
            self.ticker = Some(new_ticker());
        }
    }

    fn flush_notices<O: Observer>(&mut self, observer: &mut O) {
        for notice in self.engine.notices().since(self.seen) {
            observer.on_notice(notice);
        }
        self.seen = self.engine.notices().mark();
    }
}

fn new_ticker() -> Interval {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
