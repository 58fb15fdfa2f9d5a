use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Response from `POST /facilitator/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_estimate: Option<GasEstimate>,
}

/// Response from `POST /facilitator/settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    /// Transaction hash, if settlement succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// Response from `GET /facilitator/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Response from `GET /facilitator/gas-estimate`. Balances are decimal ETH strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub facilitator_eth_balance: String,
    pub estimated_gas_cost: String,
    pub has_enough_eth: bool,
}

/// Response from `GET /facilitator/facilitator-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorInfo {
    pub address: Address,
    pub eth_balance: String,
    pub timestamp: String,
}

/// Payment outcome attached to a successful AI response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub verified: bool,
    pub settled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

pub const ERROR_PAYMENT_REQUIRED: &str = "Payment required";
pub const ERROR_INVALID_SIGNATURE: &str = "Invalid payment signature";
pub const ERROR_INVALID_FORMAT: &str = "Invalid payment format";
pub const ERROR_INSUFFICIENT_AMOUNT: &str = "Insufficient payment amount";

/// Response from `POST /facilitator/ai`, discriminated by `success` and `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAiResponse", into = "RawAiResponse")]
pub enum AiResponse {
    Success {
        data: String,
        payment_status: PaymentStatus,
        timestamp: String,
    },
    PaymentRequired {
        message: String,
        timestamp: String,
    },
    InvalidPayment {
        error: String,
        message: String,
        timestamp: String,
    },
    ServerError {
        error: String,
        message: Option<String>,
        timestamp: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAiResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default)]
    timestamp: String,
}

impl From<RawAiResponse> for AiResponse {
    fn from(raw: RawAiResponse) -> Self {
        if raw.success {
            return AiResponse::Success {
                data: raw.data.unwrap_or_default(),
                payment_status: raw.payment_status.unwrap_or(PaymentStatus {
                    verified: false,
                    settled: false,
                    transaction_hash: None,
                }),
                timestamp: raw.timestamp,
            };
        }
        let error = raw.error.unwrap_or_else(|| "Unknown error".to_string());
        match error.as_str() {
            ERROR_PAYMENT_REQUIRED => AiResponse::PaymentRequired {
                message: raw.message.unwrap_or_else(|| {
                    "This service requires payment to process your request".to_string()
                }),
                timestamp: raw.timestamp,
            },
            ERROR_INVALID_SIGNATURE | ERROR_INVALID_FORMAT => {
                AiResponse::InvalidPayment {
                    message: raw.message.unwrap_or_else(|| error.clone()),
                    error,
                    timestamp: raw.timestamp,
                }
            }
            _ => AiResponse::ServerError {
                error,
                message: raw.message,
                timestamp: raw.timestamp,
            },
        }
    }
}

impl From<AiResponse> for RawAiResponse {
    fn from(resp: AiResponse) -> Self {
        match resp {
            AiResponse::Success {
                data,
                payment_status,
                timestamp,
            } => RawAiResponse {
                success: true,
                data: Some(data),
                payment_status: Some(payment_status),
                error: None,
                message: None,
                timestamp,
            },
            AiResponse::PaymentRequired { message, timestamp } => RawAiResponse {
                success: false,
                data: None,
                payment_status: None,
                error: Some(ERROR_PAYMENT_REQUIRED.to_string()),
                message: Some(message),
                timestamp,
            },
            AiResponse::InvalidPayment {
                error,
                message,
                timestamp,
            } => RawAiResponse {
                success: false,
                data: None,
                payment_status: None,
                error: Some(error),
                message: Some(message),
                timestamp,
            },
            AiResponse::ServerError {
                error,
                message,
                timestamp,
            } => RawAiResponse {
                success: false,
                data: None,
                payment_status: None,
                error: Some(error),
                message,
                timestamp,
            },
        }
    }
}

/// How a caller should present an [`AiResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Success {
        data: String,
        payment_status: PaymentStatus,
    },
    PaymentRequired { message: String },
    InvalidPayment { message: String },
    Error { message: String },
}

impl ResponseOutcome {
    /// Retryable outcomes can be resolved by signing a (new) payment and resending.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResponseOutcome::PaymentRequired { .. } | ResponseOutcome::Error { .. }
        )
    }

    /// Transaction hash to display; only present on settled successes.
    pub fn transaction_hash(&self) -> Option<&str> {
        match self {
            ResponseOutcome::Success { payment_status, .. } => {
                payment_status.transaction_hash.as_deref()
            }
            _ => None,
        }
    }
}

impl AiResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, AiResponse::Success { .. })
    }

    /// Classify the response for display.
    pub fn outcome(&self) -> ResponseOutcome {
        match self {
            AiResponse::Success {
                data,
                payment_status,
                ..
            } => ResponseOutcome::Success {
                data: data.clone(),
                payment_status: payment_status.clone(),
            },
            AiResponse::PaymentRequired { message, .. } => ResponseOutcome::PaymentRequired {
                message: message.clone(),
            },
            AiResponse::InvalidPayment { message, .. } => ResponseOutcome::InvalidPayment {
                message: message.clone(),
            },
            AiResponse::ServerError { error, .. } => ResponseOutcome::Error {
                message: error.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ai_success() {
        let json = r#"{
            "success": true,
            "data": "HyperEVM is an EVM.",
            "paymentStatus": {"verified": true, "settled": true, "transactionHash": "0xabc"},
            "timestamp": "2024-01-15T10:30:00.000Z"
        }"#;
        let resp: AiResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.outcome().transaction_hash(), Some("0xabc"));
    }

    #[test]
    fn test_payment_required_is_retryable_without_hash() {
        let json = r#"{"success": false, "error": "Payment required", "timestamp": "t"}"#;
        let resp: AiResponse = serde_json::from_str(json).unwrap();
        let outcome = resp.outcome();
        assert!(matches!(outcome, ResponseOutcome::PaymentRequired { .. }));
        assert!(outcome.is_retryable());
        assert_eq!(outcome.transaction_hash(), None);
    }

    #[test]
    fn test_invalid_payment_variants() {
        for err in [ERROR_INVALID_SIGNATURE, ERROR_INVALID_FORMAT] {
            let json = serde_json::json!({
                "success": false,
                "error": err,
                "message": "bad",
                "timestamp": "t"
            });
            let resp: AiResponse = serde_json::from_value(json).unwrap();
            assert_eq!(
                resp.outcome(),
                ResponseOutcome::InvalidPayment {
                    message: "bad".to_string()
                }
            );
            assert!(!resp.outcome().is_retryable());
        }
    }

    #[test]
    fn test_insufficient_amount_is_retryable_error() {
        let json = serde_json::json!({
            "success": false,
            "error": ERROR_INSUFFICIENT_AMOUNT,
            "message": "Expected at least 100000",
            "timestamp": "t"
        });
        let resp: AiResponse = serde_json::from_value(json).unwrap();
        let outcome = resp.outcome();
        assert_eq!(
            outcome,
            ResponseOutcome::Error {
                message: ERROR_INSUFFICIENT_AMOUNT.to_string()
            }
        );
        assert!(outcome.is_retryable());
    }

    #[test]
    fn test_unknown_error_is_server_error() {
        let json = r#"{"success": false, "error": "OpenAI quota exceeded", "timestamp": "t"}"#;
        let resp: AiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.outcome(),
            ResponseOutcome::Error {
                message: "OpenAI quota exceeded".to_string()
            }
        );
    }

    #[test]
    fn test_ai_response_serializes_to_wire_shape() {
        let resp = AiResponse::PaymentRequired {
            message: "pay".to_string(),
            timestamp: "t".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Payment required");
    }

    #[test]
    fn test_parse_settle_response() {
        let json = r#"{
            "success": true,
            "transaction": "0x01",
            "payer": "0x1111111111111111111111111111111111111111",
            "receiver": "0x2222222222222222222222222222222222222222",
            "amount": "1000000",
            "blockNumber": 12345,
            "timestamp": "2024-01-15T10:30:00.000Z"
        }"#;
        let resp: SettleResponse = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.block_number, Some(12345));
        assert_eq!(resp.amount.as_deref(), Some("1000000"));
    }

    #[test]
    fn test_parse_verify_with_gas_estimate() {
        let json = r#"{
            "isValid": true,
            "payer": "0x1111111111111111111111111111111111111111",
            "gasEstimate": {"facilitatorEthBalance": "0.1", "estimatedGasCost": "0.002", "hasEnoughEth": true}
        }"#;
        let resp: VerifyResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_valid);
        assert!(resp.gas_estimate.unwrap().has_enough_eth);
    }
}
