//! Client side of the HyperEVM USDT0 facilitator demo.
//!
//! Typed calls for the facilitator endpoints plus a [`DemoFlow`] that drives
//! a wallet through connect → sign → verify → settle.
//!
//! # Quick Example
//!
//! ```no_run
//! use x402::{InjectedEnvironment, LocalWallet, HYPEREVM_CHAIN_ID};
//! use x402_client::{DemoConfig, DemoFlow, PayOutcome};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), x402::X402Error> {
//! let config = DemoConfig::from_env()?;
//! let wallet = LocalWallet::from_key("0xYOUR_KEY", HYPEREVM_CHAIN_ID)?;
//! let mut flow = DemoFlow::new(InjectedEnvironment::with_provider(wallet), &config)?;
//!
//! if let PayOutcome::Settled { settle, .. } = flow.pay().await? {
//!     println!("Paid via tx: {:?}", settle.transaction);
//! }
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod config;
pub mod display;
pub mod facilitator;
pub mod flow;

pub use ai::{handle_response, AiClient};
pub use config::{DemoConfig, Endpoints, DEFAULT_FACILITATOR_URL};
pub use facilitator::FacilitatorClient;
pub use flow::{DemoFlow, PayOutcome};

// Re-export commonly needed types from core
pub use x402::{
    AiResponse, ChainConfig, PaymentObject, ResponseOutcome, SettleResponse, VerifyResponse,
    X402Error,
};
