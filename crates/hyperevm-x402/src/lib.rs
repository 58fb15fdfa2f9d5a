//! USDT0 payment authorizations for HyperEVM facilitators.
//!
//! A payer signs an EIP-3009 `TransferWithAuthorization` as EIP-712 typed data
//! in their wallet; the facilitator verifies it and submits the transfer,
//! paying gas itself.
//!
//! # Flow
//!
//! - [`provider`]: the injected wallet capability and vendor detection
//! - [`PaymentAuthorizationBuilder`]: connect, build, sign, assemble
//! - [`signing`]: structured-data signer with a raw-RPC fallback
//! - [`domain`]: on-chain EIP-712 domain lookup with fallbacks
//!
//! # Quick example
//!
//! ```no_run
//! use alloy::signers::local::PrivateKeySigner;
//! use x402::{BuilderConfig, InjectedEnvironment, LocalWallet, PaymentAuthorizationBuilder};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), x402::X402Error> {
//! let wallet = LocalWallet::new(PrivateKeySigner::random(), x402::HYPEREVM_CHAIN_ID);
//! let mut builder =
//!     PaymentAuthorizationBuilder::new(InjectedEnvironment::with_provider(wallet), BuilderConfig::default());
//!
//! builder.connect().await?;
//! let rpc = x402::domain::connect_rpc(x402::RPC_URL)?;
//! let payment = builder.authorize(&rpc, x402::DEFAULT_RECEIVER, "0.1").await?;
//! println!("{}", serde_json::to_string_pretty(&payment)?);
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod builder;
pub mod constants;
pub mod domain;
pub mod eip712;
pub mod error;
pub mod local;
pub mod payment;
pub mod provider;
pub mod response;
pub mod signing;
pub mod state;

use alloy::sol;

// EIP-3009 authorization as hashed under EIP-712.
sol! {
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

// Read-only view of the token's EIP-712 domain fields.
sol! {
    #[sol(rpc)]
    interface IEip3009Token {
        function name() external view returns (string);
        function version() external view returns (string);
    }
}

pub use builder::{assemble, BuilderConfig, PaymentAuthorizationBuilder};
pub use constants::ChainConfig;
pub use constants::*;
pub use error::X402Error;
pub use local::LocalWallet;
pub use payment::*;
pub use provider::{InjectedEnvironment, RpcError, WalletDetector, WalletProvider};
pub use response::*;
pub use signing::SigningStrategy;
pub use state::{BusyFlags, FlowState};
