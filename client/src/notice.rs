use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;

pub const NOTICE_CAPACITY: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{} {}] {}", self.at.format("%H:%M:%S"), tag, self.text)
    }
}

/// User-visible message log, oldest entries dropped first.
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    entries: VecDeque<Notice>,
    pushed: u64,
}

impl NoticeLog {
    pub fn push<S: Into<String>>(&mut self, level: NoticeLevel, text: S) {
        self.entries.push_back(Notice {
            level,
            text: text.into(),
            at: Utc::now(),
        });
        self.pushed += 1;
        if self.entries.len() > NOTICE_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn info<S: Into<String>>(&mut self, text: S) {
        self.push(NoticeLevel::Info, text);
    }

    pub fn warn<S: Into<String>>(&mut self, text: S) {
        self.push(NoticeLevel::Warning, text);
    }

    pub fn error<S: Into<String>>(&mut self, text: S) {
        self.push(NoticeLevel::Error, text);
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position after the newest entry; pass it to [`NoticeLog::since`] later.
    pub fn mark(&self) -> u64 {
        self.pushed
    }

    /// Entries pushed at or after `mark` that are still retained.
    pub fn since(&self, mark: u64) -> impl Iterator<Item = &Notice> {
        let first = self.pushed - self.entries.len() as u64;
        let skip = mark.saturating_sub(first).min(self.entries.len() as u64) as usize;
        self.entries.iter().skip(skip)
    }
}
