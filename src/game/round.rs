//! Round state machine.
//!
//! `RoundController` owns the session record and the pattern generator and
//! applies one transition at a time. It has no notion of locking or time
//! beyond the timestamps it is handed; the coordinator provides both.
//!
//! ```text
//! idle ─start_game─> memorizing ─start_turn─> playing ─press─> success | failed
//!                        ^                                          │
//!                        └──────────────── next_round ──────────────┘
//! ```
//! `pause` and `reset` are accepted from every phase.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_chacha::ChaCha20Rng;

use super::features::{extract, Decision, RoundFeatures, RoundStats};
use super::pattern::{clamp_level, PatternGenerator, Signal};
use super::state::{next_streak, Phase, SessionState};
use super::validator::{validate, Validation};
use crate::error::{LedpanelError, Result};

/// Effect of a single button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PressEffect {
    /// Matched and appended; more elements remain.
    Accepted,
    /// Matched the last element; the round is won.
    Completed,
    /// Did not match; the round is lost.
    Mismatch,
    /// Dropped without touching state (wrong phase or stale press).
    Ignored,
}

/// Level and streak after a round's adjustment was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub previous_level: u8,
    pub level: u8,
    pub streak: i32,
}

pub struct RoundController<R = ChaCha20Rng> {
    state: SessionState,
    generator: PatternGenerator<R>,
    finalized: bool,
}

impl<R: Rng> RoundController<R> {
    pub fn new(generator: PatternGenerator<R>) -> Self {
        Self {
            state: SessionState::new(),
            generator,
            finalized: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Whether the current round has been claimed by a finalize.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Begin a fresh game at `level` (clamped). Accepted from any phase.
    pub fn start_game(&mut self, level: i64) -> &[Signal] {
        self.state.level = clamp_level(level);
        self.enter_memorizing()
    }

    /// Open the input window. Only valid while memorizing.
    pub fn start_turn(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state.phase != Phase::Memorizing {
            return Err(LedpanelError::InvalidTransition {
                operation: "start turn",
                phase: self.state.phase,
            });
        }
        self.state.start_time = Some(now);
        self.state.phase = Phase::Playing;
        Ok(())
    }

    /// Apply a hardware button press. Never fails; presses the current phase
    /// cannot use are ignored.
    pub fn press(&mut self, signal: Signal) -> PressEffect {
        if self.state.phase != Phase::Playing {
            return PressEffect::Ignored;
        }
        match validate(&self.state.pattern, &self.state.user_input, signal) {
            Validation::OutOfRange => PressEffect::Ignored,
            Validation::Mismatch => {
                self.state.error_count += 1;
                self.state.phase = Phase::Failed;
                PressEffect::Mismatch
            }
            Validation::Accepted => {
                self.state.user_input.push(signal);
                if self.state.user_input.len() == self.state.pattern.len() {
                    self.state.phase = Phase::Success;
                    PressEffect::Completed
                } else {
                    PressEffect::Accepted
                }
            }
        }
    }

    /// Claim the completed round for adjustment and summarise it from the
    /// session's own counters. Returns the features and whether it was won.
    pub fn finalize_autonomous(&mut self, now: DateTime<Utc>) -> Result<(RoundFeatures, bool)> {
        if !self.state.phase.is_round_over() {
            return Err(self.refuse_finalize());
        }
        self.claim_finalize()?;
        let success = self.state.phase == Phase::Success;
        Ok((extract(&self.state, now), success))
    }

    /// Claim the active round for adjustment using stats computed elsewhere.
    ///
    /// A round still being memorized or played is closed, so late presses are
    /// ignored. Once the round is over the session's own outcome wins over
    /// the supplied one.
    pub fn finalize_supplied(&mut self, stats: &RoundStats) -> Result<(RoundFeatures, bool)> {
        if matches!(self.state.phase, Phase::Idle | Phase::Paused) {
            return Err(self.refuse_finalize());
        }
        self.claim_finalize()?;
        let pattern_length = stats.pattern_length.unwrap_or(self.state.pattern.len());
        let success = match self.state.phase {
            Phase::Success => true,
            Phase::Failed => false,
            _ => {
                let success = stats.is_success(pattern_length);
                self.state.phase = if success { Phase::Success } else { Phase::Failed };
                success
            }
        };
        Ok((RoundFeatures::from_stats(stats, pattern_length), success))
    }

    /// Apply `decision` to `base_level` and advance the streak from `streak_in`.
    pub fn apply_adjustment(
        &mut self,
        base_level: i64,
        decision: Decision,
        success: bool,
        streak_in: i32,
    ) -> Adjustment {
        let previous_level = self.state.level;
        self.state.level = decision.apply(base_level);
        self.state.streak = next_streak(streak_in, success);
        Adjustment {
            previous_level,
            level: self.state.level,
            streak: self.state.streak,
        }
    }

    /// Move on to the next round at the current level.
    pub fn next_round(&mut self) -> &[Signal] {
        self.enter_memorizing()
    }

    pub fn pause(&mut self) {
        self.state.phase = Phase::Paused;
    }

    /// Leave the pause with a freshly generated round.
    pub fn resume(&mut self) -> Result<&[Signal]> {
        if self.state.phase != Phase::Paused {
            return Err(LedpanelError::InvalidTransition {
                operation: "resume",
                phase: self.state.phase,
            });
        }
        Ok(self.enter_memorizing())
    }

    pub fn reset(&mut self) {
        self.state = SessionState::new();
        self.finalized = false;
    }

    fn claim_finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(self.refuse_finalize());
        }
        self.finalized = true;
        Ok(())
    }

    fn refuse_finalize(&self) -> LedpanelError {
        LedpanelError::InvalidTransition {
            operation: "finalize round",
            phase: self.state.phase,
        }
    }

    fn enter_memorizing(&mut self) -> &[Signal] {
        self.state.pattern = self.generator.generate(self.state.level as i64);
        self.state.user_input.clear();
        self.state.error_count = 0;
        self.state.start_time = None;
        self.state.phase = Phase::Memorizing;
        self.finalized = false;
        &self.state.pattern
    }
}
