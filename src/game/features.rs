//! Round summary handed to the decision function and the outcome log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::clamp_level;
use super::state::SessionState;

/// Difficulty adjustment produced at the end of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    #[serde(alias = "SUBIR")]
    Raise,
    #[serde(alias = "MANTENER")]
    Hold,
    #[serde(alias = "BAJAR")]
    Lower,
}

impl Decision {
    pub fn delta(self) -> i64 {
        match self {
            Decision::Raise => 1,
            Decision::Hold => 0,
            Decision::Lower => -1,
        }
    }

    /// Apply to `level`, clamped into the playable range.
    pub fn apply(self, level: i64) -> u8 {
        clamp_level(level.saturating_add(self.delta()))
    }

    /// Label used by the prediction model and the round dataset.
    pub fn model_label(self) -> &'static str {
        match self {
            Decision::Raise => "SUBIR",
            Decision::Hold => "MANTENER",
            Decision::Lower => "BAJAR",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Raise => "RAISE",
            Decision::Hold => "HOLD",
            Decision::Lower => "LOWER",
        })
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RAISE" | "SUBIR" => Ok(Decision::Raise),
            "HOLD" | "MANTENER" => Ok(Decision::Hold),
            "LOWER" | "BAJAR" => Ok(Decision::Lower),
            other => Err(format!("unknown decision label '{}'", other)),
        }
    }
}

/// Aggregate stats computed by a collaborator instead of the session itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStats {
    pub level: i64,
    pub correct_count: usize,
    pub error_count: u32,
    /// Seconds from turn start to round end.
    pub elapsed: f64,
    pub streak: i32,
    /// Defaults to the current pattern's length when omitted.
    #[serde(default)]
    pub pattern_length: Option<usize>,
}

impl RoundStats {
    /// A supplied round counts as won when every element was matched cleanly.
    /// An empty pattern has nothing to match and is never a win.
    pub fn is_success(&self, pattern_length: usize) -> bool {
        pattern_length > 0 && self.error_count == 0 && self.correct_count == pattern_length
    }
}

/// Fixed feature vector summarising one finished round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundFeatures {
    pub level: u8,
    pub pattern_length: usize,
    pub correct_count: usize,
    pub error_count: u32,
    pub accuracy: f64,
    pub time_per_correct: f64,
    pub elapsed: f64,
    pub streak: i32,
}

impl RoundFeatures {
    pub fn compute(
        level: u8,
        pattern_length: usize,
        correct_count: usize,
        error_count: u32,
        elapsed: f64,
        streak: i32,
    ) -> Self {
        let elapsed = elapsed.max(0.0);
        let accuracy = if pattern_length == 0 {
            0.0
        } else {
            correct_count as f64 / pattern_length as f64
        };
        let time_per_correct = if correct_count > 0 {
            elapsed / correct_count as f64
        } else {
            elapsed
        };
        Self {
            level,
            pattern_length,
            correct_count,
            error_count,
            accuracy,
            time_per_correct,
            elapsed,
            streak,
        }
    }

    /// Features from caller-supplied stats; `fallback_length` fills a missing
    /// pattern length.
    pub fn from_stats(stats: &RoundStats, fallback_length: usize) -> Self {
        Self::compute(
            clamp_level(stats.level),
            stats.pattern_length.unwrap_or(fallback_length),
            stats.correct_count,
            stats.error_count,
            stats.elapsed,
            stats.streak,
        )
    }
}

/// Summarise the round held in `state` as of `now`.
///
/// Must run before the round's input and error count are cleared. A missing
/// start time counts as zero elapsed.
pub fn extract(state: &SessionState, now: DateTime<Utc>) -> RoundFeatures {
    let elapsed = state
        .start_time
        .map(|start| (now - start).num_milliseconds() as f64 / 1000.0)
        .unwrap_or(0.0);
    RoundFeatures::compute(
        state.level,
        state.pattern.len(),
        state.user_input.len(),
        state.error_count,
        elapsed,
        state.streak,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::pattern::{Signal, MAX_LEVEL};
    use crate::game::state::Phase;
    use chrono::Duration;

    fn sig(v: i64) -> Signal {
        Signal::new(v).unwrap()
    }

    mod decision_tests {
        use super::*;

        #[test]
        fn parses_both_label_sets() {
            assert_eq!("SUBIR".parse::<Decision>(), Ok(Decision::Raise));
            assert_eq!("hold".parse::<Decision>(), Ok(Decision::Hold));
            assert_eq!(" Bajar ".parse::<Decision>(), Ok(Decision::Lower));
            assert!("JUMP".parse::<Decision>().is_err());
        }

        #[test]
        fn deserializes_model_aliases() {
            let d: Decision = serde_json::from_str("\"MANTENER\"").unwrap();
            assert_eq!(d, Decision::Hold);
            assert_eq!(serde_json::to_string(&Decision::Raise).unwrap(), "\"RAISE\"");
        }

        #[test]
        fn repeated_raise_never_exceeds_max() {
            let mut level = 1u8;
            for _ in 0..20 {
                level = Decision::Raise.apply(level as i64);
            }
            assert_eq!(level, MAX_LEVEL);
        }

        #[test]
        fn repeated_lower_never_goes_below_one() {
            let mut level = MAX_LEVEL;
            for _ in 0..20 {
                level = Decision::Lower.apply(level as i64);
            }
            assert_eq!(level, 1);
        }
    }

    mod extract_tests {
        use super::*;

        #[test]
        fn perfect_round() {
            let now = Utc::now();
            let state = SessionState {
                level: 1,
                pattern: vec![sig(2), sig(4)],
                user_input: vec![sig(2), sig(4)],
                error_count: 0,
                streak: 0,
                start_time: Some(now - Duration::seconds(4)),
                phase: Phase::Success,
            };
            let features = extract(&state, now);
            assert_eq!(features.correct_count, 2);
            assert_eq!(features.accuracy, 1.0);
            assert_eq!(features.time_per_correct, 2.0);
            assert_eq!(features.elapsed, 4.0);
        }

        #[test]
        fn no_correct_presses_uses_elapsed() {
            let now = Utc::now();
            let state = SessionState {
                pattern: vec![sig(1), sig(1), sig(1)],
                error_count: 1,
                start_time: Some(now - Duration::seconds(3)),
                phase: Phase::Failed,
                ..SessionState::new()
            };
            let features = extract(&state, now);
            assert_eq!(features.accuracy, 0.0);
            assert_eq!(features.time_per_correct, 3.0);
            assert_eq!(features.error_count, 1);
        }

        #[test]
        fn missing_start_time_is_zero_elapsed() {
            let state = SessionState {
                pattern: vec![sig(1)],
                user_input: vec![sig(1)],
                phase: Phase::Success,
                ..SessionState::new()
            };
            let features = extract(&state, Utc::now());
            assert_eq!(features.elapsed, 0.0);
            assert_eq!(features.time_per_correct, 0.0);
        }

        #[test]
        fn empty_pattern_has_zero_accuracy() {
            let features = RoundFeatures::compute(1, 0, 0, 0, 5.0, 0);
            assert_eq!(features.accuracy, 0.0);
            assert_eq!(features.time_per_correct, 5.0);
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn pattern_length_falls_back() {
            let stats = RoundStats {
                level: 1,
                correct_count: 2,
                error_count: 0,
                elapsed: 4.0,
                streak: 0,
                pattern_length: None,
            };
            let features = RoundFeatures::from_stats(&stats, 2);
            assert_eq!(features.accuracy, 1.0);
            assert_eq!(features.time_per_correct, 2.0);
            assert!(stats.is_success(2));
            assert!(!stats.is_success(3));
        }

        #[test]
        fn empty_pattern_is_never_a_win() {
            let stats = RoundStats {
                level: 1,
                correct_count: 0,
                error_count: 0,
                elapsed: 1.0,
                streak: 0,
                pattern_length: Some(0),
            };
            assert!(!stats.is_success(0));
            assert_eq!(RoundFeatures::from_stats(&stats, 0).accuracy, 0.0);
        }

        #[test]
        fn level_is_clamped() {
            let stats = RoundStats {
                level: 42,
                correct_count: 0,
                error_count: 2,
                elapsed: 1.0,
                streak: -1,
                pattern_length: Some(6),
            };
            assert_eq!(RoundFeatures::from_stats(&stats, 0).level, MAX_LEVEL);
        }
    }
}
