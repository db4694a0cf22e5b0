use serde::Serialize;
use thiserror::Error;

use crate::game::Phase;

#[derive(Debug, Error)]
pub enum LedpanelError {
    #[error("Cannot {operation} while session is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Round was superseded while {0}")]
    Superseded(&'static str),

    #[error("Configuration fault: {0}")]
    ConfigurationFault(String),

    #[error("Signal {0} is outside the panel alphabet")]
    InvalidSignal(i64),
}

impl LedpanelError {
    /// Stable code for programmatic handling at the HTTP boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Superseded(_) => "ROUND_SUPERSEDED",
            Self::ConfigurationFault(_) => "CONFIGURATION_FAULT",
            Self::InvalidSignal(_) => "INVALID_SIGNAL",
        }
    }
}

impl Serialize for LedpanelError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedpanelError>;
