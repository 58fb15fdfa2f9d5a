//! Typed-data signing against an injected wallet.
//!
//! Two strategies are tried in order ([`DEFAULT_STRATEGIES`]):
//!
//! - [`SigningStrategy::StructuredData`] goes through [`TypedDataSigner`],
//!   which takes a type map *without* `EIP712Domain`, injects it, checks the
//!   wallet's chain, and verifies the returned signature recovers to the
//!   expected account.
//! - [`SigningStrategy::RawRpc`] sends `eth_signTypedData_v4` directly with
//!   an explicit `EIP712Domain` entry and no extra checks.
//!
//! Both sign the same message value.

use std::future::Future;
use std::time::Duration;

use alloy::dyn_abi::TypedData;
use alloy::primitives::Address;

use crate::eip712::{
    domain_type_fields, parse_signature_hex, transfer_types, DomainFields, TypeMap,
    TypedDataPayload, EIP712_DOMAIN_TYPE,
};
use crate::provider::{RpcError, WalletProvider};
use crate::X402Error;

/// Map a wallet error onto the flow's error taxonomy.
pub fn classify_rpc_error(err: RpcError, expected_chain_id: u64) -> X402Error {
    let lower = err.message.to_lowercase();
    if err.code == RpcError::USER_REJECTED
        || lower.contains("user rejected")
        || lower.contains("user denied")
    {
        X402Error::UserRejected(err.message)
    } else if lower.contains("chainid") {
        X402Error::ChainMismatch {
            expected: expected_chain_id,
            actual: err.message,
        }
    } else if lower.contains("signature address mismatch") {
        X402Error::AddressMismatch {
            current: err.message,
            expected: "signing account".to_string(),
        }
    } else {
        X402Error::WalletError(err.to_string())
    }
}

/// Await a wallet or RPC future, failing with [`X402Error::Timeout`] after `limit`.
pub async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T, X402Error>>,
) -> Result<T, X402Error> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| X402Error::Timeout(what.to_string()))?
}

/// Parse an `eth_chainId` result (`"0x3e7"`, or a bare number).
pub fn parse_chain_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Signer abstraction over a wallet provider, in the shape of a library
/// `signTypedData(domain, types, message)`.
pub struct TypedDataSigner<'a, P> {
    provider: &'a P,
    account: Address,
}

impl<'a, P: WalletProvider> TypedDataSigner<'a, P> {
    pub fn new(provider: &'a P, account: Address) -> Self {
        Self { provider, account }
    }

    pub fn address(&self) -> Address {
        self.account
    }

    /// Sign typed data. `types` must not contain `EIP712Domain`; it is derived
    /// from `domain` here.
    pub async fn sign_typed_data(
        &self,
        domain: &DomainFields,
        types: &TypeMap,
        message: &serde_json::Value,
    ) -> Result<String, X402Error> {
        if types.contains_key(EIP712_DOMAIN_TYPE) {
            return Err(X402Error::SignatureError(
                "types must not include EIP712Domain".to_string(),
            ));
        }

        let chain = self
            .provider
            .request("eth_chainId", serde_json::json!([]))
            .await
            .map_err(|e| classify_rpc_error(e, domain.chain_id))?;
        let chain_id = parse_chain_id(&chain).ok_or_else(|| {
            X402Error::WalletError(format!("unreadable eth_chainId result: {chain}"))
        })?;
        if chain_id != domain.chain_id {
            return Err(X402Error::ChainMismatch {
                expected: domain.chain_id,
                actual: chain_id.to_string(),
            });
        }

        let mut full_types = types.clone();
        full_types.insert(EIP712_DOMAIN_TYPE.to_string(), domain_type_fields());
        let payload = TypedDataPayload::new(domain.clone(), full_types, message.clone());
        let payload_json = serde_json::to_value(&payload)?;

        let signature = request_signature(self.provider, self.account, &payload, domain.chain_id)
            .await?;

        let typed: TypedData = serde_json::from_value(payload_json)?;
        let hash = typed
            .eip712_signing_hash()
            .map_err(|e| X402Error::SignatureError(format!("cannot hash typed data: {e}")))?;
        let recovered = parse_signature_hex(&signature)?
            .recover_address_from_prehash(&hash)
            .map_err(|e| X402Error::SignatureError(format!("recovery failed: {e}")))?;
        if recovered != self.account {
            return Err(X402Error::AddressMismatch {
                current: recovered.to_string(),
                expected: self.account.to_string(),
            });
        }

        Ok(signature)
    }
}

async fn request_signature<P: WalletProvider>(
    provider: &P,
    account: Address,
    payload: &TypedDataPayload,
    chain_id: u64,
) -> Result<String, X402Error> {
    let encoded = serde_json::to_string(payload)?;
    let result = provider
        .request(
            "eth_signTypedData_v4",
            serde_json::json!([account.to_string(), encoded]),
        )
        .await
        .map_err(|e| classify_rpc_error(e, chain_id))?;
    result
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| X402Error::SignatureError(format!("wallet returned non-string signature: {result}")))
}

/// What to sign and with which account.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub account: Address,
    pub domain: DomainFields,
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningStrategy {
    StructuredData,
    RawRpc,
}

pub const DEFAULT_STRATEGIES: [SigningStrategy; 2] =
    [SigningStrategy::StructuredData, SigningStrategy::RawRpc];

impl SigningStrategy {
    pub async fn sign<P: WalletProvider>(
        self,
        provider: &P,
        request: &SignRequest,
    ) -> Result<String, X402Error> {
        match self {
            SigningStrategy::StructuredData => {
                TypedDataSigner::new(provider, request.account)
                    .sign_typed_data(&request.domain, &transfer_types(false), &request.message)
                    .await
            }
            SigningStrategy::RawRpc => {
                let payload = TypedDataPayload::new(
                    request.domain.clone(),
                    transfer_types(true),
                    request.message.clone(),
                );
                request_signature(provider, request.account, &payload, request.domain.chain_id)
                    .await
            }
        }
    }
}

/// Try `strategies` in order, each once and with its own `timeout`.
///
/// Any failure, a user rejection included, moves on to the next strategy.
/// When every strategy fails the reported error is, in order of preference,
/// a rejection, then a chain or address mismatch, then the last error.
pub async fn sign_with_strategies<P: WalletProvider>(
    provider: &P,
    request: &SignRequest,
    strategies: &[SigningStrategy],
    timeout: Duration,
) -> Result<(String, SigningStrategy), X402Error> {
    let mut rejected: Option<X402Error> = None;
    let mut specific: Option<X402Error> = None;
    let mut last: Option<X402Error> = None;

    for &strategy in strategies {
        match with_timeout(timeout, "signature request", strategy.sign(provider, request)).await {
            Ok(signature) => {
                tracing::info!(?strategy, "typed data signed");
                return Ok((signature, strategy));
            }
            Err(e) => {
                tracing::warn!(?strategy, "signing strategy failed: {e}");
                let is_specific = matches!(
                    e,
                    X402Error::ChainMismatch { .. } | X402Error::AddressMismatch { .. }
                );
                if e.is_rejection() && rejected.is_none() {
                    rejected = Some(e);
                } else if is_specific && specific.is_none() {
                    specific = Some(e);
                } else {
                    last = Some(e);
                }
            }
        }
    }

    Err(rejected
        .or(specific)
        .or(last)
        .unwrap_or_else(|| X402Error::SignatureError("no signing strategy configured".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rejection() {
        let err = classify_rpc_error(RpcError::user_rejected(), 999);
        assert!(err.is_rejection());
        let err = classify_rpc_error(RpcError::new(-32000, "User denied message signature"), 999);
        assert!(err.is_rejection());
    }

    #[test]
    fn test_classify_chain_mismatch() {
        let err = classify_rpc_error(
            RpcError::new(
                RpcError::INTERNAL,
                "Provided chainId \"999\" must match the active chainId \"1\"",
            ),
            999,
        );
        assert!(matches!(err, X402Error::ChainMismatch { expected: 999, .. }));
    }

    #[test]
    fn test_classify_other() {
        let err = classify_rpc_error(RpcError::unsupported("eth_foo"), 999);
        assert!(matches!(err, X402Error::WalletError(_)));
    }

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id(&serde_json::json!("0x3e7")), Some(999));
        assert_eq!(parse_chain_id(&serde_json::json!("999")), Some(999));
        assert_eq!(parse_chain_id(&serde_json::json!(999)), Some(999));
        assert_eq!(parse_chain_id(&serde_json::json!(null)), None);
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let result: Result<(), X402Error> = with_timeout(
            Duration::from_millis(10),
            "wallet prompt",
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(X402Error::Timeout(ref w)) if w == "wallet prompt"));
    }
}
