//! Signal alphabet, level table and pattern generation.
//!
//! A pattern is a sequence of independent uniform draws from the panel
//! alphabet. Its length comes from the level table; levels are always
//! clamped into `[1, MAX_LEVEL]` before the lookup.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LedpanelError, Result};

/// Highest playable level.
pub const MAX_LEVEL: u8 = 5;

/// Number of distinct signals (one per LED colour).
pub const ALPHABET_SIZE: u8 = 5;

/// Pattern length for levels `1..=MAX_LEVEL`.
pub const DEFAULT_LEVEL_LENGTHS: [usize; MAX_LEVEL as usize] = [2, 3, 4, 5, 6];

/// One element of the pattern alphabet, always in `1..=ALPHABET_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Signal(u8);

impl Signal {
    /// Build a signal from a raw value, rejecting anything outside the alphabet.
    pub fn new(value: i64) -> Option<Self> {
        if (1..=ALPHABET_SIZE as i64).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Every signal in the alphabet, in ascending order.
    pub fn all() -> impl Iterator<Item = Signal> {
        (1..=ALPHABET_SIZE).map(Signal)
    }
}

impl TryFrom<u8> for Signal {
    type Error = LedpanelError;

    fn try_from(value: u8) -> Result<Self> {
        Signal::new(value as i64).ok_or(LedpanelError::InvalidSignal(value as i64))
    }
}

impl From<Signal> for u8 {
    fn from(signal: Signal) -> u8 {
        signal.0
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clamp an arbitrary requested level into `[1, MAX_LEVEL]`.
pub fn clamp_level(level: i64) -> u8 {
    level.clamp(1, MAX_LEVEL as i64) as u8
}

/// Static level → pattern length mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    lengths: Vec<usize>,
}

impl LevelTable {
    /// Validate a configured table. It must have exactly one entry per level.
    ///
    /// A zero entry is accepted and produces an empty pattern; such a round
    /// ignores every button and can only be closed by a supplied finalize.
    pub fn new(lengths: Vec<usize>) -> Result<Self> {
        if lengths.len() != MAX_LEVEL as usize {
            return Err(LedpanelError::ConfigurationFault(format!(
                "level table has {} entries, expected {}",
                lengths.len(),
                MAX_LEVEL
            )));
        }
        Ok(Self { lengths })
    }

    /// Pattern length for `level`, after clamping.
    pub fn length_for(&self, level: i64) -> usize {
        self.lengths[clamp_level(level) as usize - 1]
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            lengths: DEFAULT_LEVEL_LENGTHS.to_vec(),
        }
    }
}

/// Random pattern source. Deterministic when built from a seeded RNG.
#[derive(Debug, Clone)]
pub struct PatternGenerator<R = ChaCha20Rng> {
    table: LevelTable,
    rng: R,
}

impl PatternGenerator<ChaCha20Rng> {
    /// Seeded when `seed` is given, entropy-backed otherwise.
    pub fn new(table: LevelTable, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Self::with_rng(table, rng)
    }
}

impl<R: Rng> PatternGenerator<R> {
    pub fn with_rng(table: LevelTable, rng: R) -> Self {
        Self { table, rng }
    }

    /// Produce a fresh pattern for `level` (clamped).
    pub fn generate(&mut self, level: i64) -> Vec<Signal> {
        let len = self.table.length_for(level);
        (0..len)
            .map(|_| Signal(self.rng.gen_range(1..=ALPHABET_SIZE)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod signal_tests {
        use super::*;

        #[test]
        fn accepts_alphabet_values() {
            for v in 1..=5 {
                assert_eq!(Signal::new(v).map(Signal::value), Some(v as u8));
            }
        }

        #[test]
        fn rejects_out_of_alphabet() {
            assert!(Signal::new(0).is_none());
            assert!(Signal::new(6).is_none());
            assert!(Signal::new(-1).is_none());
        }

        #[test]
        fn deserializing_out_of_range_fails() {
            assert!(serde_json::from_str::<Signal>("3").is_ok());
            assert!(serde_json::from_str::<Signal>("7").is_err());
        }
    }

    mod table_tests {
        use super::*;

        #[test]
        fn level_one_has_two_signals() {
            assert_eq!(LevelTable::default().length_for(1), 2);
        }

        #[test]
        fn out_of_range_levels_are_clamped() {
            let table = LevelTable::default();
            assert_eq!(table.length_for(0), 2);
            assert_eq!(table.length_for(-4), 2);
            assert_eq!(table.length_for(99), 6);
        }

        #[test]
        fn wrong_size_is_configuration_fault() {
            let err = LevelTable::new(vec![2, 3]).unwrap_err();
            assert!(matches!(err, LedpanelError::ConfigurationFault(_)));
        }
    }

    mod generator_tests {
        use super::*;

        #[test]
        fn same_seed_same_pattern() {
            let mut a = PatternGenerator::new(LevelTable::default(), Some(7));
            let mut b = PatternGenerator::new(LevelTable::default(), Some(7));
            for level in 1..=5 {
                assert_eq!(a.generate(level), b.generate(level));
            }
        }

        #[test]
        fn zero_length_entry_gives_empty_pattern() {
            let table = LevelTable::new(vec![0, 3, 4, 5, 6]).unwrap();
            let mut generator = PatternGenerator::new(table, Some(1));
            assert!(generator.generate(1).is_empty());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn generated_length_matches_table(level in -3i64..10, seed in any::<u64>()) {
            let mut generator = PatternGenerator::new(LevelTable::default(), Some(seed));
            let pattern = generator.generate(level);
            prop_assert_eq!(pattern.len(), LevelTable::default().length_for(level));
            prop_assert!(pattern.iter().all(|s| (1..=ALPHABET_SIZE).contains(&s.value())));
        }

        #[test]
        fn clamp_stays_in_range(level in any::<i64>()) {
            let clamped = clamp_level(level);
            prop_assert!((1..=MAX_LEVEL).contains(&clamped));
        }
    }
}
