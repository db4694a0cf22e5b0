//! Session coordinator.
//!
//! `SessionCoordinator` is the single owner of the game session. Every
//! operation takes the write lock once, applies its transition through the
//! `RoundController` and releases the lock before anything slow happens:
//! hardware dispatch, the decision call and the inter-round delay all run
//! unlocked.
//!
//! Two counters keep late work from touching a newer session:
//! - `generation` is captured by the next-round timer; `start_game`, `pause`,
//!   `resume` and `reset` bump it so a pending timer finds a mismatch
//! - `round` identifies the current pattern; a finalize whose round changed
//!   while the decision was running is rejected as superseded
//!
//! ```text
//! listener ──submit_button──┐
//!                           v
//! handlers ──────────> SessionCoordinator ──send──> HardwareSink
//!                       │        │
//!                       │        └──decide──> DecisionModel
//!                       └──record──> RoundLogger
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;

use crate::decision::{decide_bounded, DecisionModel};
use crate::error::{LedpanelError, Result};
use crate::game::{
    Decision, PatternGenerator, Phase, PressEffect, RoundController, RoundFeatures, RoundStats,
    SessionState, Signal,
};
use crate::hardware::HardwareSink;
use crate::outcome_log::{RoundLogger, RoundRecord};

pub const DEFAULT_INTER_ROUND_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Pause between a finalized round and the next pattern.
    pub inter_round_delay: Duration,
    /// Budget for one decision call before falling back to `Hold`.
    pub decision_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            inter_round_delay: DEFAULT_INTER_ROUND_DELAY,
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
        }
    }
}

/// How a round is summarised for the decision function.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionInput {
    /// Use the session's own counters. Requires a finished round.
    Autonomous,
    /// Use stats computed by a collaborator.
    Supplied(RoundStats),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameStarted {
    pub phase: Phase,
    pub level: u8,
    pub pattern_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonOutcome {
    pub phase: Phase,
    pub effect: PressEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub decision: Decision,
    pub previous_level: u8,
    pub level: u8,
    pub streak: i32,
    pub features: RoundFeatures,
    /// Delay before the next pattern, or `None` when no round was scheduled
    /// (the session was paused while deciding).
    pub next_round_in_ms: Option<u64>,
}

struct Inner {
    controller: RoundController,
    generation: u64,
    round: u64,
    next_round_task: Option<JoinHandle<()>>,
}

impl Inner {
    fn cancel_next_round(&mut self) {
        self.generation += 1;
        if let Some(task) = self.next_round_task.take() {
            task.abort();
        }
    }

    fn new_round(&mut self) -> u64 {
        self.round += 1;
        self.round
    }
}

struct Shared {
    inner: RwLock<Inner>,
    /// Round id of the last pattern handed to the sink; older patterns are
    /// never sent after newer ones.
    last_dispatched: TokioMutex<u64>,
    sink: Arc<dyn HardwareSink>,
    model: Arc<dyn DecisionModel>,
    logger: Option<Arc<dyn RoundLogger>>,
    config: CoordinatorConfig,
}

/// Cheap-to-clone handle shared by the listener, the HTTP handlers and the
/// next-round timer.
#[derive(Clone)]
pub struct SessionCoordinator {
    shared: Arc<Shared>,
}

impl SessionCoordinator {
    pub fn new(
        generator: PatternGenerator,
        sink: Arc<dyn HardwareSink>,
        model: Arc<dyn DecisionModel>,
        logger: Option<Arc<dyn RoundLogger>>,
        config: CoordinatorConfig,
    ) -> Self {
        tracing::debug!(
            "Session coordinator using decision model {}",
            model.description()
        );
        Self {
            shared: Arc::new(Shared {
                inner: RwLock::new(Inner {
                    controller: RoundController::new(generator),
                    generation: 0,
                    round: 0,
                    next_round_task: None,
                }),
                last_dispatched: TokioMutex::new(0),
                sink,
                model,
                logger,
                config,
            }),
        }
    }

    // ========================================================================
    // Round lifecycle
    // ========================================================================

    /// Start a new game at `level` (clamped) from any phase and light the
    /// first pattern.
    pub async fn start_game(&self, level: i64) -> GameStarted {
        let (round, pattern, started) = {
            let mut inner = self.shared.inner.write();
            inner.cancel_next_round();
            let pattern = inner.controller.start_game(level).to_vec();
            let started = GameStarted {
                phase: inner.controller.phase(),
                level: inner.controller.state().level,
                pattern_length: pattern.len(),
            };
            (inner.new_round(), pattern, started)
        };

        tracing::info!(
            "Game started at level {} ({} signals, round {})",
            started.level,
            started.pattern_length,
            round
        );
        self.dispatch(round, pattern).await;
        started
    }

    /// Open the input window once the player has seen the pattern.
    pub fn start_turn(&self) -> Result<Phase> {
        let mut inner = self.shared.inner.write();
        inner.controller.start_turn(Utc::now())?;
        tracing::debug!("Turn started for round {}", inner.round);
        Ok(inner.controller.phase())
    }

    /// Feed one button press. Presses the session cannot use are no-ops.
    pub fn submit_button(&self, signal: Signal) -> ButtonOutcome {
        let mut inner = self.shared.inner.write();
        let effect = inner.controller.press(signal);
        let phase = inner.controller.phase();
        match effect {
            PressEffect::Accepted => tracing::debug!("Accepted button {}", signal),
            PressEffect::Completed => tracing::info!("Round {} completed", inner.round),
            PressEffect::Mismatch => {
                tracing::info!("Round {} failed on button {}", inner.round, signal)
            }
            PressEffect::Ignored => tracing::trace!("Ignored button {} while {}", signal, phase),
        }
        ButtonOutcome { phase, effect }
    }

    /// Summarise the round, ask the decision model, apply the level change
    /// and schedule the next round.
    ///
    /// The lock is released while the model runs. If the round is replaced
    /// in the meantime (new game, resume or reset) nothing is applied and
    /// `Superseded` is returned.
    pub async fn finalize_and_adjust(&self, input: DecisionInput) -> Result<FinalizeResponse> {
        let (features, success, base_level, streak_in, round) = {
            let mut inner = self.shared.inner.write();
            let state = inner.controller.state();
            let (base_level, streak_in) = match &input {
                DecisionInput::Autonomous => (i64::from(state.level), state.streak),
                DecisionInput::Supplied(stats) => (stats.level, stats.streak),
            };
            let (features, success) = match &input {
                DecisionInput::Autonomous => inner.controller.finalize_autonomous(Utc::now())?,
                DecisionInput::Supplied(stats) => inner.controller.finalize_supplied(stats)?,
            };
            (features, success, base_level, streak_in, inner.round)
        };

        let decision = decide_bounded(
            self.shared.model.as_ref(),
            &features,
            self.shared.config.decision_timeout,
        )
        .await;

        let (adjustment, next_round_in) = {
            let mut inner = self.shared.inner.write();
            if inner.round != round {
                tracing::warn!(
                    "Round {} was replaced by round {} while deciding; dropping {}",
                    round,
                    inner.round,
                    decision
                );
                return Err(LedpanelError::Superseded("deciding"));
            }

            let adjustment = inner
                .controller
                .apply_adjustment(base_level, decision, success, streak_in);
            let next_round_in = if inner.controller.phase().is_round_over() {
                self.schedule_next_round(&mut inner);
                Some(self.shared.config.inter_round_delay)
            } else {
                None
            };
            (adjustment, next_round_in)
        };

        tracing::info!(
            "Round {} finalized: {} (level {} -> {}, streak {})",
            round,
            decision,
            adjustment.previous_level,
            adjustment.level,
            adjustment.streak
        );

        if let Some(logger) = &self.shared.logger {
            logger.record(RoundRecord::new(features.clone(), decision));
        }

        Ok(FinalizeResponse {
            decision,
            previous_level: adjustment.previous_level,
            level: adjustment.level,
            streak: adjustment.streak,
            features,
            next_round_in_ms: next_round_in.map(|d| d.as_millis() as u64),
        })
    }

    // ========================================================================
    // Direct transitions
    // ========================================================================

    /// Pause from any phase. A scheduled next round is cancelled.
    pub fn pause(&self) -> Phase {
        let mut inner = self.shared.inner.write();
        inner.cancel_next_round();
        inner.controller.pause();
        tracing::info!("Session paused");
        inner.controller.phase()
    }

    /// Leave a pause with a fresh pattern at the current level.
    pub async fn resume(&self) -> Result<GameStarted> {
        let (round, pattern, started) = {
            let mut inner = self.shared.inner.write();
            let pattern = inner.controller.resume()?.to_vec();
            inner.cancel_next_round();
            let started = GameStarted {
                phase: inner.controller.phase(),
                level: inner.controller.state().level,
                pattern_length: pattern.len(),
            };
            (inner.new_round(), pattern, started)
        };

        tracing::info!("Session resumed at level {}", started.level);
        self.dispatch(round, pattern).await;
        Ok(started)
    }

    /// Back to `Idle` with default state.
    pub fn reset(&self) {
        let mut inner = self.shared.inner.write();
        inner.cancel_next_round();
        inner.controller.reset();
        inner.new_round();
        tracing::info!("Session reset");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of the session record.
    pub fn status(&self) -> SessionState {
        self.shared.inner.read().controller.state().clone()
    }

    /// Evaluate the decision model on caller-supplied stats without touching
    /// the session.
    pub async fn predict(&self, stats: &RoundStats) -> Decision {
        let fallback_length = self.shared.inner.read().controller.state().pattern.len();
        let features = RoundFeatures::from_stats(stats, fallback_length);
        decide_bounded(
            self.shared.model.as_ref(),
            &features,
            self.shared.config.decision_timeout,
        )
        .await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn schedule_next_round(&self, inner: &mut Inner) {
        inner.cancel_next_round();
        let generation = inner.generation;
        let delay = self.shared.config.inter_round_delay;
        let coordinator = self.clone();
        inner.next_round_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.begin_next_round(generation).await;
        }));
    }

    async fn begin_next_round(&self, generation: u64) {
        let (round, pattern) = {
            let mut inner = self.shared.inner.write();
            if inner.generation != generation {
                tracing::debug!("Discarding stale next-round timer");
                return;
            }
            inner.next_round_task = None;
            if !inner.controller.phase().is_round_over() {
                tracing::debug!(
                    "Not starting next round while {}",
                    inner.controller.phase()
                );
                return;
            }
            let pattern = inner.controller.next_round().to_vec();
            (inner.new_round(), pattern)
        };

        tracing::info!("Next round {} ({} signals)", round, pattern.len());
        self.dispatch(round, pattern).await;
    }

    /// Light `pattern` on the panel. Failures are logged and never fail the
    /// transition that produced the pattern. A pattern whose round was
    /// replaced while it waited (by a reset or a newer round) is dropped.
    async fn dispatch(&self, round: u64, pattern: Vec<Signal>) {
        let mut last = self.shared.last_dispatched.lock().await;
        if round <= *last {
            tracing::debug!(
                "Skipping pattern for round {}; round {} already sent",
                round,
                *last
            );
            return;
        }
        let current = self.shared.inner.read().round;
        if round != current {
            tracing::debug!(
                "Skipping pattern for round {}; session moved on to round {}",
                round,
                current
            );
            return;
        }
        *last = round;
        if let Err(e) = self.shared.sink.send(&pattern).await {
            tracing::warn!("Failed to send pattern for round {}: {}", round, e);
        }
    }
}
