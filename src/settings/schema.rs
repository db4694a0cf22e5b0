//! Settings schema definitions for the panel server.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::decision::ThresholdRules;
use crate::game::pattern::DEFAULT_LEVEL_LENGTHS;
use crate::game::Decision;

/// Root settings structure.
///
/// Loaded from `~/.ledpanel/settings.toml` with environment variable interpolation support.
/// Version field enables future migrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedpanelSettings {
    /// Schema version for migrations
    pub version: u32,

    /// HTTP listener
    pub server: ServerSettings,

    /// Round rules
    pub game: GameSettings,

    /// Button panel connection
    pub hardware: HardwareSettings,

    /// Difficulty decision model
    pub decision: DecisionSettings,

    /// Round outcome log
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Pattern length for each level, starting at level 1
    pub level_lengths: Vec<usize>,

    /// Pause between a finalized round and the next pattern
    pub inter_round_delay_ms: u64,

    /// Fixed RNG seed for reproducible patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HardwareSettings {
    /// Serial device of the panel (supports $ENV_VAR syntax). Unset runs
    /// without hardware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// Which decision model to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBackend {
    Fixed,
    Threshold,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionSettings {
    pub backend: DecisionBackend,

    /// Prediction service URL for the remote backend (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Time budget per decision; a late model counts as HOLD
    pub timeout_ms: u64,

    /// Answer of the fixed backend
    pub fixed: Decision,

    /// Thresholds of the local backend
    pub rules: ThresholdRules,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSettings {
    /// CSV file receiving one row per finalized round (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds_csv: Option<String>,
}

impl Default for LedpanelSettings {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSettings::default(),
            game: GameSettings::default(),
            hardware: HardwareSettings::default(),
            decision: DecisionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            level_lengths: DEFAULT_LEVEL_LENGTHS.to_vec(),
            inter_round_delay_ms: 2000,
            seed: None,
        }
    }
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            backend: DecisionBackend::Threshold,
            url: None,
            timeout_ms: 3000,
            fixed: Decision::Hold,
            rules: ThresholdRules::default(),
        }
    }
}
