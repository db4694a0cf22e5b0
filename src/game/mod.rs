//! Core game model: signals, session record, validation, round state
//! machine and round features.

pub mod features;
pub mod pattern;
pub mod round;
pub mod state;
pub mod validator;

pub use features::{extract, Decision, RoundFeatures, RoundStats};
pub use pattern::{clamp_level, LevelTable, PatternGenerator, Signal, ALPHABET_SIZE, MAX_LEVEL};
pub use round::{Adjustment, PressEffect, RoundController};
pub use state::{next_streak, Phase, SessionState};
pub use validator::{validate, Validation};
