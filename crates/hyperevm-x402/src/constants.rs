use alloy::primitives::{address, Address};

/// HyperEVM mainnet chain ID.
pub const HYPEREVM_CHAIN_ID: u64 = 999;

/// CAIP-2 network identifier for HyperEVM.
pub const HYPEREVM_NETWORK: &str = "eip155:999";

/// USDT0 token contract on HyperEVM (EIP-3009 capable).
pub const USDT0_ADDRESS: Address = address!("0xb8ce59fc3717ada4c02eadf9682a9e934f625ebb");

/// Receiver the demo facilitator expects payments to be made out to.
pub const DEFAULT_RECEIVER: Address = address!("0xa15e55079e01267676157869b1d0a3026ac280ee");

/// USDT0 has 6 decimal places.
pub const TOKEN_DECIMALS: u32 = 6;

/// Public HyperEVM JSON-RPC endpoint used for read-only contract calls.
pub const RPC_URL: &str = "https://rpc.hyperliquid.xyz/evm";

/// Fallback EIP-712 domain name when `name()` cannot be read on-chain.
pub const FALLBACK_DOMAIN_NAME: &str = "USD₮0";

/// Fallback EIP-712 domain version when `version()` cannot be read on-chain.
pub const FALLBACK_DOMAIN_VERSION: &str = "1";

/// Lifetime of a signed authorization, in seconds.
pub const AUTHORIZATION_VALIDITY_SECS: u64 = 3600;

/// Amount pre-filled by the demo, in whole USDT0.
pub const DEFAULT_PAYMENT_AMOUNT: &str = "0.1";

/// Primary type name of the EIP-3009 message.
pub const PRIMARY_TYPE: &str = "TransferWithAuthorization";

/// Runtime chain configuration. Keeps the builder and signer independent of
/// compile-time constants so tests and alternate deployments can override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub network: String,
    pub token: Address,
    pub token_decimals: u32,
    pub rpc_url: String,
    pub receiver: Address,
    pub fallback_domain_name: String,
    pub fallback_domain_version: String,
    pub validity_secs: u64,
}

impl Default for ChainConfig {
    /// Defaults to HyperEVM mainnet with USDT0.
    fn default() -> Self {
        Self {
            chain_id: HYPEREVM_CHAIN_ID,
            network: HYPEREVM_NETWORK.to_string(),
            token: USDT0_ADDRESS,
            token_decimals: TOKEN_DECIMALS,
            rpc_url: RPC_URL.to_string(),
            receiver: DEFAULT_RECEIVER,
            fallback_domain_name: FALLBACK_DOMAIN_NAME.to_string(),
            fallback_domain_version: FALLBACK_DOMAIN_VERSION.to_string(),
            validity_secs: AUTHORIZATION_VALIDITY_SECS,
        }
    }
}

impl ChainConfig {
    /// Chain ID as the `0x`-prefixed hex quantity wallets return from `eth_chainId`.
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_hyperevm() {
        let config = ChainConfig::default();
        assert_eq!(config.chain_id, 999);
        assert_eq!(config.chain_id_hex(), "0x3e7");
        assert_eq!(config.token, USDT0_ADDRESS);
        assert_eq!(config.validity_secs, 3600);
    }
}
