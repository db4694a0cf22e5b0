//! HTTP prediction service client.
//!
//! Speaks the prediction endpoint's wire format: a POST of
//! `{nivel, aciertos, errores, tiempo, racha}` answered by `{accion}` with
//! `SUBIR`, `MANTENER` or `BAJAR`. A response carrying an `error` field is
//! the service's own fallback and counts as unavailable.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DecisionModel, DecisionOutcome};
use crate::game::{Decision, RoundFeatures, RoundStats};

/// Prediction request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub nivel: i64,
    pub aciertos: usize,
    pub errores: u32,
    /// Seconds.
    pub tiempo: f64,
    pub racha: i32,
}

impl From<&RoundFeatures> for PredictionRequest {
    fn from(f: &RoundFeatures) -> Self {
        Self {
            nivel: f.level as i64,
            aciertos: f.correct_count,
            errores: f.error_count,
            tiempo: f.elapsed,
            racha: f.streak,
        }
    }
}

impl From<PredictionRequest> for RoundStats {
    fn from(req: PredictionRequest) -> Self {
        Self {
            level: req.nivel,
            correct_count: req.aciertos,
            error_count: req.errores,
            elapsed: req.tiempo,
            streak: req.racha,
            pattern_length: None,
        }
    }
}

/// Prediction response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub accion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn from_decision(decision: Decision) -> Self {
        Self {
            accion: decision.model_label().to_string(),
            error: None,
        }
    }

    fn into_outcome(self) -> DecisionOutcome {
        if let Some(err) = self.error {
            return DecisionOutcome::Unavailable(format!("service fallback: {}", err));
        }
        match self.accion.parse::<Decision>() {
            Ok(decision) => DecisionOutcome::Decided(decision),
            Err(e) => DecisionOutcome::Unavailable(e),
        }
    }
}

/// Decision model backed by a remote prediction service.
pub struct RemoteDecision {
    client: reqwest::Client,
    url: String,
}

impl RemoteDecision {
    /// Per-request transport timeout; the caller's budget is usually tighter.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DecisionModel for RemoteDecision {
    async fn decide(&self, features: &RoundFeatures) -> DecisionOutcome {
        let body = PredictionRequest::from(features);
        let response = match self.client.post(&self.url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => return DecisionOutcome::Unavailable(format!("request failed: {}", e)),
        };
        if !response.status().is_success() {
            return DecisionOutcome::Unavailable(format!("HTTP {}", response.status()));
        }
        match response.json::<PredictionResponse>().await {
            Ok(parsed) => parsed.into_outcome(),
            Err(e) => DecisionOutcome::Unavailable(format!("invalid response: {}", e)),
        }
    }

    fn description(&self) -> String {
        format!("remote({})", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use tokio::net::TcpListener;

    /// Serve a single prediction route returning `reply`, and return its URL.
    async fn serve(reply: serde_json::Value) -> String {
        let app = Router::new().route(
            "/predecir",
            post(move |Json(_req): Json<PredictionRequest>| {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/predecir", addr)
    }

    fn features() -> RoundFeatures {
        RoundFeatures::compute(2, 3, 3, 0, 2.4, 1)
    }

    #[test]
    fn request_uses_model_field_names() {
        let json = serde_json::to_value(PredictionRequest::from(&features())).unwrap();
        assert_eq!(json["nivel"], 2);
        assert_eq!(json["aciertos"], 3);
        assert_eq!(json["errores"], 0);
        assert_eq!(json["racha"], 1);
    }

    #[test]
    fn fallback_response_is_unavailable() {
        let resp = PredictionResponse {
            accion: "MANTENER".to_string(),
            error: Some("model not loaded".to_string()),
        };
        assert!(matches!(resp.into_outcome(), DecisionOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn decides_from_service_label() {
        let url = serve(serde_json::json!({"accion": "SUBIR"})).await;
        let model = RemoteDecision::new(url).unwrap();
        assert_eq!(
            model.decide(&features()).await,
            DecisionOutcome::Decided(Decision::Raise)
        );
    }

    #[tokio::test]
    async fn unknown_label_is_unavailable() {
        let url = serve(serde_json::json!({"accion": "SALTAR"})).await;
        let model = RemoteDecision::new(url).unwrap();
        assert!(matches!(
            model.decide(&features()).await,
            DecisionOutcome::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let model = RemoteDecision::new("http://127.0.0.1:9/predecir").unwrap();
        assert!(matches!(
            model.decide(&features()).await,
            DecisionOutcome::Unavailable(_)
        ));
    }
}
