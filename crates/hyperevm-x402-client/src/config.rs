//! Environment-driven configuration for the demo client.

use std::time::Duration;

use alloy::primitives::Address;
use x402::domain::DomainPolicy;
use x402::local::LOCAL_WALLET_FLAG;
use x402::{BuilderConfig, ChainConfig, WalletDetector, X402Error, DEFAULT_PAYMENT_AMOUNT};

/// Default facilitator base URL.
pub const DEFAULT_FACILITATOR_URL: &str = "http://localhost:5050";

/// Facilitator endpoint URLs derived from one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub verify: String,
    pub settle: String,
    pub health: String,
    pub gas_estimate: String,
    pub facilitator_info: String,
    pub ai: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, X402Error> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| X402Error::ConfigError(format!("invalid facilitator URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(X402Error::ConfigError(format!(
                "facilitator URL must be http or https, got '{base_url}'"
            )));
        }

        let base = format!("{}/facilitator", base_url.trim_end_matches('/'));
        Ok(Self {
            verify: format!("{base}/verify"),
            settle: format!("{base}/settle"),
            health: format!("{base}/health"),
            gas_estimate: format!("{base}/gas-estimate"),
            facilitator_info: format!("{base}/facilitator-info"),
            ai: format!("{base}/ai"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub facilitator_url: String,
    pub chain: ChainConfig,
    /// Decimal USDT0 amount paid per request.
    pub amount: String,
    pub wallet_timeout: Duration,
    pub rpc_timeout: Duration,
    pub domain_policy: DomainPolicy,
    /// Key for the in-process wallet. No key means no wallet is injected.
    pub private_key: Option<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        let builder = BuilderConfig::default();
        Self {
            facilitator_url: DEFAULT_FACILITATOR_URL.to_string(),
            chain: builder.chain,
            amount: DEFAULT_PAYMENT_AMOUNT.to_string(),
            wallet_timeout: builder.wallet_timeout,
            rpc_timeout: builder.rpc_timeout,
            domain_policy: builder.domain_policy,
            private_key: None,
        }
    }
}

impl DemoConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, X402Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset or empty keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, X402Error> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get("FACILITATOR_URL") {
            config.facilitator_url = url;
        }
        Endpoints::new(&config.facilitator_url)?;

        if let Some(rpc) = get("RPC_URL") {
            config.chain.rpc_url = rpc;
        }
        if let Some(pay_to) = get("PAY_TO") {
            config.chain.receiver = pay_to
                .parse::<Address>()
                .map_err(|e| X402Error::ConfigError(format!("invalid PAY_TO '{pay_to}': {e}")))?;
        }
        if let Some(amount) = get("PAYMENT_AMOUNT") {
            x402::amount::to_smallest_units(&amount, config.chain.token_decimals)?;
            config.amount = amount;
        }
        if let Some(secs) = get("WALLET_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.wallet_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = get("RPC_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.rpc_timeout = Duration::from_secs(secs);
        }
        let strict = get("STRICT_DOMAIN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if strict {
            config.domain_policy = DomainPolicy::RequireOnChain;
        }
        config.private_key = get("EVM_PRIVATE_KEY");

        Ok(config)
    }

    pub fn endpoints(&self) -> Result<Endpoints, X402Error> {
        Endpoints::new(&self.facilitator_url)
    }

    /// Builder settings for this configuration. The detector also accepts the
    /// in-process wallet.
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            chain: self.chain.clone(),
            detector: WalletDetector::default().with_flag(LOCAL_WALLET_FLAG),
            wallet_timeout: self.wallet_timeout,
            rpc_timeout: self.rpc_timeout,
            domain_policy: self.domain_policy,
            ..BuilderConfig::default()
        }
    }
}
