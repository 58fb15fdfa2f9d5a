//! Client for the paid `/facilitator/ai` endpoint.

use chrono::{SecondsFormat, Utc};
use x402::{AiRequest, AiResponse, PaymentObject, ResponseOutcome, X402Error};

use crate::config::Endpoints;
use crate::facilitator::build_http_client;

/// RFC 3339 UTC timestamp with millisecond precision, as the facilitator emits.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AiClient {
    pub fn new(base_url: &str) -> Result<Self, X402Error> {
        Ok(Self::with_http_client(
            &Endpoints::new(base_url)?,
            build_http_client()?,
        ))
    }

    pub fn with_http_client(endpoints: &Endpoints, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: endpoints.ai.clone(),
        }
    }

    /// Send `prompt`, optionally paying with `payment`.
    ///
    /// Never fails: transport and decoding failures come back as
    /// [`AiResponse::ServerError`] so callers render every outcome the same way.
    pub async fn call_ai(&self, prompt: &str, payment: Option<&PaymentObject>) -> AiResponse {
        let body = AiRequest {
            prompt: prompt.to_string(),
            payment: payment.cloned(),
        };

        let resp = match self.http.post(&self.endpoint).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("AI request failed: {e}");
                return network_error(&e.to_string());
            }
        };

        let status = resp.status();
        match resp.json::<AiResponse>().await {
            Ok(ai) => {
                tracing::info!(%status, success = ai.is_success(), "AI response");
                ai
            }
            Err(e) => {
                tracing::warn!(%status, "AI response could not be decoded: {e}");
                network_error(&e.to_string())
            }
        }
    }
}

fn network_error(detail: &str) -> AiResponse {
    AiResponse::ServerError {
        error: format!("Network error: {detail}"),
        message: None,
        timestamp: timestamp_now(),
    }
}

/// Classify a response and log it the way the demo surfaces it.
pub fn handle_response(response: &AiResponse) -> ResponseOutcome {
    let outcome = response.outcome();
    match &outcome {
        ResponseOutcome::Success { payment_status, .. } => tracing::info!(
            settled = payment_status.settled,
            tx = payment_status.transaction_hash.as_deref().unwrap_or(""),
            "AI request paid"
        ),
        ResponseOutcome::PaymentRequired { message } => tracing::info!("payment required: {message}"),
        ResponseOutcome::InvalidPayment { message } => tracing::warn!("payment rejected: {message}"),
        ResponseOutcome::Error { message } => tracing::warn!("AI request failed: {message}"),
    }
    outcome
}
