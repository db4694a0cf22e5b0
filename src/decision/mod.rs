//! Difficulty decision functions.
//!
//! A `DecisionModel` maps a finished round's features to RAISE/HOLD/LOWER.
//! Models report failure through `DecisionOutcome::Unavailable` instead of an
//! error; `decide_bounded` turns that, and any overrun of the time budget,
//! into `Decision::Hold`.
//!
//! Available models:
//! - `FixedDecision`: constant answer
//! - `ThresholdDecision`: local accuracy/speed rules
//! - `RemoteDecision`: HTTP prediction service

mod remote;

pub use remote::{PredictionRequest, PredictionResponse, RemoteDecision};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::game::{Decision, RoundFeatures};
use crate::settings::schema::{DecisionBackend, DecisionSettings};

/// Result of asking a model for a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    Decided(Decision),
    /// The model could not answer (unreachable, untrained, unknown label).
    Unavailable(String),
}

#[async_trait]
pub trait DecisionModel: Send + Sync + 'static {
    async fn decide(&self, features: &RoundFeatures) -> DecisionOutcome;

    /// Human-readable description for logs.
    fn description(&self) -> String;
}

/// Run `model` with a time budget. Unavailable or late answers fail closed
/// to `Hold`.
pub async fn decide_bounded(
    model: &dyn DecisionModel,
    features: &RoundFeatures,
    timeout: Duration,
) -> Decision {
    match tokio::time::timeout(timeout, model.decide(features)).await {
        Ok(DecisionOutcome::Decided(decision)) => {
            tracing::debug!(
                "Decision from {}: {} (level={}, accuracy={:.2})",
                model.description(),
                decision,
                features.level,
                features.accuracy
            );
            decision
        }
        Ok(DecisionOutcome::Unavailable(reason)) => {
            tracing::warn!(
                "Decision unavailable from {}: {}; holding level",
                model.description(),
                reason
            );
            Decision::Hold
        }
        Err(_) => {
            tracing::warn!(
                "Decision from {} timed out after {}ms; holding level",
                model.description(),
                timeout.as_millis()
            );
            Decision::Hold
        }
    }
}

/// Always answers with the same decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub Decision);

#[async_trait]
impl DecisionModel for FixedDecision {
    async fn decide(&self, _features: &RoundFeatures) -> DecisionOutcome {
        DecisionOutcome::Decided(self.0)
    }

    fn description(&self) -> String {
        format!("fixed({})", self.0)
    }
}

/// Rule thresholds for the local model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdRules {
    /// Minimum accuracy to raise.
    pub raise_accuracy: f64,
    /// Maximum seconds per correct press to raise.
    pub raise_max_seconds_per_hit: f64,
    /// Accuracy below this lowers.
    pub lower_accuracy: f64,
    /// A losing streak at or below this lowers.
    pub lower_streak: i32,
}

impl Default for ThresholdRules {
    fn default() -> Self {
        Self {
            raise_accuracy: 1.0,
            raise_max_seconds_per_hit: 1.5,
            lower_accuracy: 0.5,
            lower_streak: -2,
        }
    }
}

/// Local rule-based model used when no prediction service is configured.
#[derive(Debug, Clone, Default)]
pub struct ThresholdDecision {
    rules: ThresholdRules,
}

impl ThresholdDecision {
    pub fn new(rules: ThresholdRules) -> Self {
        Self { rules }
    }

    fn classify(&self, f: &RoundFeatures) -> Decision {
        if f.accuracy < self.rules.lower_accuracy || f.streak <= self.rules.lower_streak {
            Decision::Lower
        } else if f.error_count == 0
            && f.accuracy >= self.rules.raise_accuracy
            && f.time_per_correct <= self.rules.raise_max_seconds_per_hit
        {
            Decision::Raise
        } else {
            Decision::Hold
        }
    }
}

#[async_trait]
impl DecisionModel for ThresholdDecision {
    async fn decide(&self, features: &RoundFeatures) -> DecisionOutcome {
        if features.pattern_length == 0 {
            return DecisionOutcome::Unavailable("empty pattern".to_string());
        }
        DecisionOutcome::Decided(self.classify(features))
    }

    fn description(&self) -> String {
        "threshold".to_string()
    }
}

/// Build the model selected in settings.
pub fn model_from_settings(
    settings: &DecisionSettings,
) -> anyhow::Result<Arc<dyn DecisionModel>> {
    let model: Arc<dyn DecisionModel> = match settings.backend {
        DecisionBackend::Fixed => Arc::new(FixedDecision(settings.fixed)),
        DecisionBackend::Threshold => Arc::new(ThresholdDecision::new(settings.rules.clone())),
        DecisionBackend::Remote => {
            let url = settings.url.clone().ok_or_else(|| {
                anyhow::anyhow!("decision.url is required for the remote backend")
            })?;
            Arc::new(RemoteDecision::new(url)?)
        }
    };
    tracing::info!("Decision model: {}", model.description());
    Ok(model)
}
