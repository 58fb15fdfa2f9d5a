use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{TransferWithAuthorization, X402Error};

/// An unsigned EIP-3009 transfer authorization, built fresh per payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub from: Address,
    pub to: Address,
    /// Amount in smallest units (6 decimals for USDT0).
    pub value: U256,
    pub valid_after: u64,
    pub valid_before: u64,
    pub nonce: B256,
}

impl Authorization {
    /// Check the validity window is non-empty.
    pub fn validate(&self) -> Result<(), X402Error> {
        if self.valid_after >= self.valid_before {
            return Err(X402Error::SignatureError(format!(
                "validAfter ({}) must be before validBefore ({})",
                self.valid_after, self.valid_before
            )));
        }
        Ok(())
    }

    /// The EIP-712 struct that actually gets hashed and signed.
    pub fn to_typed(&self) -> TransferWithAuthorization {
        TransferWithAuthorization {
            from: self.from,
            to: self.to,
            value: self.value,
            validAfter: U256::from(self.valid_after),
            validBefore: U256::from(self.valid_before),
            nonce: self.nonce,
        }
    }

    /// Wire form: every field as text so large integers never pass through
    /// a JSON number.
    pub fn to_wire(&self) -> WireAuthorization {
        WireAuthorization {
            from: self.from.to_string(),
            to: self.to.to_string(),
            value: self.value.to_string(),
            valid_after: self.valid_after.to_string(),
            valid_before: self.valid_before.to_string(),
            nonce: format!("0x{}", alloy::hex::encode(self.nonce)),
        }
    }
}

/// Authorization as transmitted to the facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAuthorization {
    pub from: String,
    pub to: String,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: String,
}

/// A signed authorization: the unit posted to `/facilitator/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentObject {
    pub signature: String,
    pub authorization: WireAuthorization,
}

/// Body of `POST /facilitator/settle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleRequest {
    pub payment: PaymentObject,
}

/// Body of `POST /facilitator/ai`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentObject>,
}
