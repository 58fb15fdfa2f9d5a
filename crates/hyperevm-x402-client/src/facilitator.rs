//! Typed client for the facilitator's HTTP endpoints.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use x402::{
    FacilitatorInfo, GasEstimate, HealthResponse, PaymentObject, SettleRequest, SettleResponse,
    VerifyResponse, X402Error,
};

use crate::config::Endpoints;

/// Per-request timeout for facilitator calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_http_client() -> Result<reqwest::Client, X402Error> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| X402Error::ConfigError(format!("failed to build HTTP client: {e}")))
}

/// Client for `/facilitator/{verify,settle,health,gas-estimate,facilitator-info}`.
///
/// Transport failures map to [`X402Error::NetworkError`]; a response body that
/// does not match the endpoint's schema maps to [`X402Error::ServerError`].
/// Non-2xx responses are still decoded when their body is well-formed, since
/// the facilitator reports rejections (`isValid: false`, `success: false`)
/// with 4xx statuses.
#[derive(Clone)]
pub struct FacilitatorClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl FacilitatorClient {
    pub fn new(base_url: &str) -> Result<Self, X402Error> {
        Ok(Self::with_http_client(
            Endpoints::new(base_url)?,
            build_http_client()?,
        ))
    }

    pub fn with_http_client(endpoints: Endpoints, http: reqwest::Client) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Ask the facilitator whether `payment` would settle.
    pub async fn verify(&self, payment: &PaymentObject) -> Result<VerifyResponse, X402Error> {
        let resp: VerifyResponse = self.post(&self.endpoints.verify, payment).await?;
        tracing::info!(
            is_valid = resp.is_valid,
            reason = resp.invalid_reason.as_deref().unwrap_or(""),
            "facilitator verify"
        );
        Ok(resp)
    }

    /// Submit `payment` for on-chain settlement.
    pub async fn settle(&self, payment: &PaymentObject) -> Result<SettleResponse, X402Error> {
        let body = SettleRequest {
            payment: payment.clone(),
        };
        let resp: SettleResponse = self.post(&self.endpoints.settle, &body).await?;
        tracing::info!(
            success = resp.success,
            tx = resp.transaction.as_deref().unwrap_or(""),
            "facilitator settle"
        );
        Ok(resp)
    }

    pub async fn health(&self) -> Result<HealthResponse, X402Error> {
        self.get(&self.endpoints.health).await
    }

    pub async fn gas_estimate(&self) -> Result<GasEstimate, X402Error> {
        self.get(&self.endpoints.gas_estimate).await
    }

    pub async fn facilitator_info(&self) -> Result<FacilitatorInfo, X402Error> {
        self.get(&self.endpoints.facilitator_info).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, X402Error> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| X402Error::NetworkError(format!("GET {url} failed: {e}")))?;
        decode(url, resp).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T, X402Error> {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| X402Error::NetworkError(format!("POST {url} failed: {e}")))?;
        decode(url, resp).await
    }
}

async fn decode<T: DeserializeOwned>(url: &str, resp: reqwest::Response) -> Result<T, X402Error> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| X402Error::NetworkError(format!("reading {url} response failed: {e}")))?;

    serde_json::from_str(&text).map_err(|e| {
        tracing::debug!(%status, body = %text, "unexpected facilitator response");
        X402Error::ServerError(format!("{url} returned {status}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            FacilitatorClient::new("not a url"),
            Err(X402Error::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_facilitator_is_network_error() {
        let client = FacilitatorClient::new("http://127.0.0.1:1").unwrap();
        assert!(matches!(
            client.health().await,
            Err(X402Error::NetworkError(_))
        ));
    }
}
