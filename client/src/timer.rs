//! Turn countdown as a pure state machine. The runtime owns the 1 s interval
//! that calls [`TurnTimer::tick`]; nothing here touches the clock.

pub const DEFAULT_TURN_SECONDS: u32 = 60;
const URGENT_AT: u32 = 30;
const WARNING_AT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    /// Reached zero; holds there until the next stop/start.
    Expired,
}

/// Display-only urgency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Normal,
    Urgent,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimerState {
    pub remaining: u32,
    pub running: bool,
}

#[derive(Debug, Clone)]
pub struct TurnTimer {
    duration: u32,
    remaining: u32,
    phase: TimerPhase,
    /// Bumped by every `start`, so a driver can tell a restart from a
    /// countdown that simply kept running.
    run: u64,
}

impl Default for TurnTimer {
    fn default() -> Self {
        Self::new(DEFAULT_TURN_SECONDS)
    }
}

impl TurnTimer {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            remaining: duration,
            phase: TimerPhase::Idle,
            run: 0,
        }
    }

    pub fn start(&mut self) {
        self.stop();
        self.remaining = self.duration;
        self.phase = TimerPhase::Running;
        self.run += 1;
    }

    pub fn stop(&mut self) {
        self.remaining = self.duration;
        self.phase = TimerPhase::Idle;
    }

    /// One second elapsed. No-op unless running.
    pub fn tick(&mut self) -> Option<Urgency> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.phase = TimerPhase::Expired;
        }
        Some(self.urgency())
    }

    pub fn urgency(&self) -> Urgency {
        if self.phase == TimerPhase::Idle {
            Urgency::Normal
        } else if self.remaining <= WARNING_AT {
            Urgency::Warning
        } else if self.remaining <= URGENT_AT {
            Urgency::Urgent
        } else {
            Urgency::Normal
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_idle(&self) -> bool {
        self.phase == TimerPhase::Idle
    }

    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn state(&self) -> TurnTimerState {
        TurnTimerState {
            remaining: self.remaining,
            running: self.is_running(),
        }
    }
}
