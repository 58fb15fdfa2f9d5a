//! In-process wallet speaking the same JSON-RPC surface as a browser extension.
//!
//! Backed by an `alloy` [`PrivateKeySigner`]. Like an extension, it exposes no
//! accounts through `eth_accounts` until `eth_requestAccounts` has granted
//! access, and it refuses typed data whose domain targets another chain.

use std::sync::atomic::{AtomicBool, Ordering};

use alloy::dyn_abi::TypedData;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use tokio::sync::broadcast;

use crate::eip712::{encode_signature_hex, EIP712_DOMAIN_TYPE};
use crate::provider::{ProviderMarkers, RpcError, WalletProvider};
use crate::X402Error;

/// Marker flag a [`LocalWallet`] advertises to detectors.
pub const LOCAL_WALLET_FLAG: &str = "isLocalWallet";

pub struct LocalWallet {
    signer: PrivateKeySigner,
    chain_id: u64,
    authorized: AtomicBool,
    markers: ProviderMarkers,
    accounts_tx: broadcast::Sender<Vec<String>>,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        let (accounts_tx, _) = broadcast::channel(16);
        Self {
            signer,
            chain_id,
            authorized: AtomicBool::new(false),
            markers: ProviderMarkers::default().with_flag(LOCAL_WALLET_FLAG),
            accounts_tx,
        }
    }

    /// Create from a hex private key (with or without `0x`).
    pub fn from_key(private_key: &str, chain_id: u64) -> Result<Self, X402Error> {
        let key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| X402Error::ConfigError(format!("invalid private key: {e}")))?;
        Ok(Self::new(signer, chain_id))
    }

    pub fn with_markers(mut self, markers: ProviderMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Start with account access already granted.
    pub fn pre_authorized(self) -> Self {
        self.authorized.store(true, Ordering::SeqCst);
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Revoke account access and notify subscribers with an empty account list.
    pub fn revoke(&self) {
        self.authorized.store(false, Ordering::SeqCst);
        let _ = self.accounts_tx.send(Vec::new());
    }

    fn accounts(&self) -> serde_json::Value {
        if self.authorized.load(Ordering::SeqCst) {
            serde_json::json!([self.address().to_checksum(None)])
        } else {
            serde_json::json!([])
        }
    }

    fn sign_typed_data_v4(&self, params: &serde_json::Value) -> Result<serde_json::Value, RpcError> {
        if !self.authorized.load(Ordering::SeqCst) {
            return Err(RpcError::new(
                RpcError::UNAUTHORIZED,
                "The requested account has not been authorized by the user.",
            ));
        }

        let account = params
            .get(0)
            .and_then(|a| a.as_str())
            .and_then(|a| a.parse::<Address>().ok())
            .ok_or_else(|| RpcError::new(RpcError::INVALID_PARAMS, "missing signing account"))?;
        if account != self.address() {
            return Err(RpcError::new(
                RpcError::UNAUTHORIZED,
                format!("account {account} is not managed by this wallet"),
            ));
        }

        let raw: serde_json::Value = match params.get(1) {
            Some(serde_json::Value::String(s)) => serde_json::from_str(s)
                .map_err(|e| RpcError::new(RpcError::INVALID_PARAMS, format!("invalid typed data: {e}")))?,
            Some(v @ serde_json::Value::Object(_)) => v.clone(),
            _ => return Err(RpcError::new(RpcError::INVALID_PARAMS, "missing typed data")),
        };
        if raw.pointer(&format!("/types/{EIP712_DOMAIN_TYPE}")).is_none() {
            return Err(RpcError::new(
                RpcError::INVALID_PARAMS,
                "typed data is missing the EIP712Domain type",
            ));
        }

        let typed: TypedData = serde_json::from_value(raw)
            .map_err(|e| RpcError::new(RpcError::INVALID_PARAMS, format!("invalid typed data: {e}")))?;
        if let Some(chain_id) = typed.domain.chain_id {
            if chain_id != U256::from(self.chain_id) {
                return Err(RpcError::new(
                    RpcError::INTERNAL,
                    format!(
                        "Provided chainId \"{chain_id}\" must match the active chainId \"{}\"",
                        self.chain_id
                    ),
                ));
            }
        }

        let hash = typed
            .eip712_signing_hash()
            .map_err(|e| RpcError::new(RpcError::INVALID_PARAMS, format!("cannot hash typed data: {e}")))?;
        let sig = self
            .signer
            .sign_hash_sync(&hash)
            .map_err(|e| RpcError::new(RpcError::INTERNAL, format!("signing failed: {e}")))?;
        Ok(serde_json::Value::String(encode_signature_hex(&sig)))
    }
}

impl WalletProvider for LocalWallet {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        tracing::debug!(method, "local wallet request");
        match method {
            "eth_accounts" => Ok(self.accounts()),
            "eth_requestAccounts" => {
                if !self.authorized.swap(true, Ordering::SeqCst) {
                    let _ = self
                        .accounts_tx
                        .send(vec![self.address().to_checksum(None)]);
                }
                Ok(self.accounts())
            }
            "eth_chainId" => Ok(serde_json::Value::String(format!("0x{:x}", self.chain_id))),
            "eth_signTypedData_v4" => self.sign_typed_data_v4(&params),
            other => Err(RpcError::unsupported(other)),
        }
    }

    fn markers(&self) -> ProviderMarkers {
        self.markers.clone()
    }

    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<String>> {
        self.accounts_tx.subscribe()
    }
}
