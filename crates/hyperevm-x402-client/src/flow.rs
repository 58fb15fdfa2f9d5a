//! End-to-end demo flow: wallet, authorization, facilitator.
//!
//! `pay` runs connect → authorize → verify → settle; settlement is only
//! attempted for a payment the facilitator verified. `ask` attaches a freshly
//! signed payment to an AI prompt only when a wallet is already connected.

use alloy::primitives::Address;
use alloy::providers::RootProvider;
use x402::domain::connect_rpc;
use x402::{
    AiResponse, BusyFlags, InjectedEnvironment, PaymentAuthorizationBuilder, PaymentObject,
    SettleResponse, VerifyResponse, WalletProvider, X402Error,
};

use crate::ai::AiClient;
use crate::config::DemoConfig;
use crate::facilitator::FacilitatorClient;

/// Result of one `pay` attempt.
#[derive(Debug, Clone)]
pub enum PayOutcome {
    /// No supported wallet is injected; nothing was sent anywhere.
    WalletMissing,
    /// The facilitator refused the payment during verification.
    NotVerified {
        payment: PaymentObject,
        verify: VerifyResponse,
    },
    Settled {
        payment: PaymentObject,
        verify: VerifyResponse,
        settle: SettleResponse,
    },
}

pub struct DemoFlow<P> {
    builder: PaymentAuthorizationBuilder<P>,
    facilitator: FacilitatorClient,
    ai: AiClient,
    rpc: RootProvider,
    receiver: Address,
    amount: String,
    requesting: bool,
}

impl<P: WalletProvider> DemoFlow<P> {
    pub fn new(env: InjectedEnvironment<P>, config: &DemoConfig) -> Result<Self, X402Error> {
        Ok(Self {
            builder: PaymentAuthorizationBuilder::new(env, config.builder_config()),
            facilitator: FacilitatorClient::new(&config.facilitator_url)?,
            ai: AiClient::new(&config.facilitator_url)?,
            rpc: connect_rpc(&config.chain.rpc_url)?,
            receiver: config.chain.receiver,
            amount: config.amount.clone(),
            requesting: false,
        })
    }

    pub fn builder(&self) -> &PaymentAuthorizationBuilder<P> {
        &self.builder
    }

    pub fn facilitator(&self) -> &FacilitatorClient {
        &self.facilitator
    }

    pub fn busy(&self) -> BusyFlags {
        BusyFlags {
            requesting: self.requesting,
            ..self.builder.busy()
        }
    }

    /// Reuse an authorised account if the wallet has one, otherwise prompt.
    pub async fn ensure_connected(&mut self) -> Result<Address, X402Error> {
        if let Some(address) = self.builder.active_signer() {
            return Ok(address);
        }
        if let Some(address) = self.builder.restore_connection().await? {
            return Ok(address);
        }
        self.builder.connect().await
    }

    /// Connect if needed and sign one payment. `None` when no wallet is injected.
    pub async fn sign_payment(&mut self) -> Result<Option<PaymentObject>, X402Error> {
        if !self.builder.detect_wallet() {
            return Ok(None);
        }
        self.ensure_connected().await?;
        self.authorize_payment().await.map(Some)
    }

    /// Sign a payment only if the wallet is already connected, either in this
    /// flow or through a previously authorised account. Never prompts for access.
    async fn connected_payment(&mut self) -> Result<Option<PaymentObject>, X402Error> {
        if !self.builder.detect_wallet() {
            return Ok(None);
        }
        if self.builder.active_signer().is_none()
            && self.builder.restore_connection().await?.is_none()
        {
            return Ok(None);
        }
        self.authorize_payment().await.map(Some)
    }

    async fn authorize_payment(&mut self) -> Result<PaymentObject, X402Error> {
        self.builder
            .authorize(&self.rpc, self.receiver, &self.amount)
            .await
    }

    /// Sign a payment, verify it, and settle it if verification passed.
    pub async fn pay(&mut self) -> Result<PayOutcome, X402Error> {
        let Some(payment) = self.sign_payment().await? else {
            tracing::info!("no wallet detected");
            return Ok(PayOutcome::WalletMissing);
        };

        self.begin_request()?;
        let result = self.verify_then_settle(payment).await;
        self.requesting = false;
        result
    }

    async fn verify_then_settle(&self, payment: PaymentObject) -> Result<PayOutcome, X402Error> {
        let verify = self.facilitator.verify(&payment).await?;
        if !verify.is_valid {
            return Ok(PayOutcome::NotVerified { payment, verify });
        }
        let settle = self.facilitator.settle(&payment).await?;
        Ok(PayOutcome::Settled {
            payment,
            verify,
            settle,
        })
    }

    /// Send `prompt` to the AI endpoint, paying when a wallet is connected and
    /// sending it unpaid otherwise. A blank prompt sends nothing and returns `None`.
    pub async fn ask(&mut self, prompt: &str) -> Result<Option<AiResponse>, X402Error> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(None);
        }

        let payment = self.connected_payment().await?;
        self.begin_request()?;
        let response = self.ai.call_ai(prompt, payment.as_ref()).await;
        self.requesting = false;
        Ok(Some(response))
    }

    fn begin_request(&mut self) -> Result<(), X402Error> {
        if self.requesting {
            return Err(X402Error::Busy("facilitator request"));
        }
        self.requesting = true;
        Ok(())
    }
}
