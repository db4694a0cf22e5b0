//! Session state record and the streak law.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::Signal;

/// Round phase.
///
/// `Success` and `Failed` only mark the round that just ended; no input is
/// accepted until the session moves on to `Memorizing`, `Idle` or `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Memorizing,
    Playing,
    Success,
    Failed,
    Paused,
}

impl Phase {
    /// Whether this phase marks a completed round.
    pub fn is_round_over(self) -> bool {
        matches!(self, Phase::Success | Phase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Memorizing => "memorizing",
            Phase::Playing => "playing",
            Phase::Success => "success",
            Phase::Failed => "failed",
            Phase::Paused => "paused",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single in-progress game session.
///
/// Field names on the wire match the status surface consumed by the
/// frontend: `user_input`, `errors` and `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub level: u8,
    pub pattern: Vec<Signal>,
    pub user_input: Vec<Signal>,
    #[serde(rename = "errors")]
    pub error_count: u32,
    pub streak: i32,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "status")]
    pub phase: Phase,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            level: 1,
            pattern: Vec::new(),
            user_input: Vec::new(),
            error_count: 0,
            streak: 0,
            start_time: None,
            phase: Phase::Idle,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Streak after a round: runs extend, a flip restarts at ±1.
pub fn next_streak(streak: i32, success: bool) -> i32 {
    match (success, streak) {
        (true, s) if s >= 0 => s.saturating_add(1),
        (true, _) => 1,
        (false, s) if s <= 0 => s.saturating_sub(1),
        (false, _) => -1,
    }
}
