//! The injected wallet capability and wallet detection.
//!
//! A [`WalletProvider`] is an EIP-1193 style handle: JSON-RPC `request` plus
//! an `accountsChanged` subscription. The application never owns one; it
//! looks it up through an [`InjectedEnvironment`] on every use.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// JSON-RPC error returned by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("wallet RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// EIP-1193: the user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// EIP-1193: the requested account or method is not authorized.
    pub const UNAUTHORIZED: i64 = 4100;
    /// EIP-1193: the provider does not support the method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED, "User rejected the request.")
    }

    pub fn unsupported(method: &str) -> Self {
        Self::new(
            Self::UNSUPPORTED_METHOD,
            format!("The method \"{method}\" is not supported"),
        )
    }
}

/// Vendor markers a provider advertises (`isRabby`, ...), including those of
/// any sub-providers when several wallets share the injection slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderMarkers {
    pub flags: BTreeSet<String>,
    pub sub_providers: Vec<BTreeSet<String>>,
}

impl ProviderMarkers {
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_string());
        self
    }

    pub fn with_sub_provider<'a>(mut self, flags: impl IntoIterator<Item = &'a str>) -> Self {
        self.sub_providers
            .push(flags.into_iter().map(str::to_string).collect());
        self
    }
}

/// Browser-wallet capability: EIP-1193 JSON-RPC plus account-change events.
pub trait WalletProvider: Send + Sync {
    /// Issue a JSON-RPC request (`eth_accounts`, `eth_signTypedData_v4`, ...).
    fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, RpcError>> + Send;

    /// Vendor markers used for detection.
    fn markers(&self) -> ProviderMarkers {
        ProviderMarkers::default()
    }

    /// Subscribe to `accountsChanged`. An empty list means the wallet disconnected.
    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<String>> {
        broadcast::channel(1).1
    }
}

/// The injection slot a host environment exposes: an optional provider plus
/// any vendor-named globals.
pub struct InjectedEnvironment<P> {
    ethereum: Option<Arc<P>>,
    globals: BTreeSet<String>,
}

impl<P> Default for InjectedEnvironment<P> {
    fn default() -> Self {
        Self {
            ethereum: None,
            globals: BTreeSet::new(),
        }
    }
}

impl<P: WalletProvider> InjectedEnvironment<P> {
    /// An environment with nothing injected.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: P) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    pub fn from_shared(provider: Arc<P>) -> Self {
        Self {
            ethereum: Some(provider),
            globals: BTreeSet::new(),
        }
    }

    pub fn with_global(mut self, name: &str) -> Self {
        self.globals.insert(name.to_string());
        self
    }

    /// Look up the injected provider. Callers look it up again on each use.
    pub fn provider(&self) -> Option<Arc<P>> {
        self.ethereum.clone()
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }
}

/// Feature-detects a wallet vendor from provider flags, globals, or sub-providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletDetector {
    pub flags: Vec<String>,
    pub globals: Vec<String>,
}

impl Default for WalletDetector {
    /// Rabby markers.
    fn default() -> Self {
        Self {
            flags: vec![
                "isRabby".to_string(),
                "isRabbyWallet".to_string(),
                "rabby".to_string(),
            ],
            globals: vec!["rabby".to_string(), "rabbyWallet".to_string()],
        }
    }
}

impl WalletDetector {
    /// Also accept providers advertising `flag`.
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.push(flag.to_string());
        self
    }

    /// True if the environment exposes any of the configured markers. Never fails.
    pub fn detect<P: WalletProvider>(&self, env: &InjectedEnvironment<P>) -> bool {
        if self.globals.iter().any(|g| env.has_global(g)) {
            return true;
        }
        let Some(provider) = env.provider() else {
            return false;
        };
        let markers = provider.markers();
        let has_flag = |set: &BTreeSet<String>| self.flags.iter().any(|f| set.contains(f));
        has_flag(&markers.flags) || markers.sub_providers.iter().any(has_flag)
    }
}

/// Extract account strings from an `eth_accounts` / `eth_requestAccounts` result.
pub fn parse_accounts(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|accounts| {
            accounts
                .iter()
                .filter_map(|a| a.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
