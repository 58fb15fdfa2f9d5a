//! [`PaymentAuthorizationBuilder`]: detect a wallet, connect, build an
//! EIP-3009 authorization, sign it, and assemble the [`PaymentObject`].

use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use tokio::sync::broadcast;

use crate::amount::to_smallest_units;
use crate::domain::{fetch_domain_info, DomainPolicy};
use crate::eip712::{random_nonce, recover_signer, transfer_message, DomainFields};
use crate::payment::{Authorization, PaymentObject};
use crate::provider::{parse_accounts, InjectedEnvironment, WalletDetector, WalletProvider};
use crate::signing::{
    classify_rpc_error, sign_with_strategies, with_timeout, SignRequest, SigningStrategy,
    DEFAULT_STRATEGIES,
};
use crate::state::{BusyFlags, FlowState};
use crate::{ChainConfig, X402Error};

/// Knobs for a [`PaymentAuthorizationBuilder`].
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub chain: ChainConfig,
    pub detector: WalletDetector,
    pub strategies: Vec<SigningStrategy>,
    /// Limit on any single wallet prompt.
    pub wallet_timeout: Duration,
    /// Limit on each contract read.
    pub rpc_timeout: Duration,
    pub domain_policy: DomainPolicy,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            detector: WalletDetector::default(),
            strategies: DEFAULT_STRATEGIES.to_vec(),
            wallet_timeout: Duration::from_secs(120),
            rpc_timeout: Duration::from_secs(10),
            domain_policy: DomainPolicy::default(),
        }
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, X402Error> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| X402Error::ConfigError(format!("system time error: {e}")))?
        .as_secs())
}

/// Build an unsigned authorization valid from `now` for `validity_secs`.
pub fn build_authorization_at(
    from: Address,
    to: Address,
    amount: &str,
    now: u64,
    config: &ChainConfig,
) -> Result<Authorization, X402Error> {
    let units = to_smallest_units(amount, config.token_decimals)?;
    let value: U256 = units
        .parse()
        .map_err(|e| X402Error::InvalidAmount(format!("'{units}': {e}")))?;
    let valid_before = now
        .checked_add(config.validity_secs)
        .ok_or_else(|| X402Error::ConfigError("validity window overflows".to_string()))?;

    let auth = Authorization {
        from,
        to,
        value,
        valid_after: now,
        valid_before,
        nonce: random_nonce(),
    };
    auth.validate()?;
    Ok(auth)
}

/// Package a signature and its authorization for the facilitator.
pub fn assemble(signature: String, authorization: &Authorization) -> PaymentObject {
    PaymentObject {
        signature,
        authorization: authorization.to_wire(),
    }
}

/// True when `account` (as reported by a wallet) names `expected`, ignoring case.
pub fn same_address(account: &str, expected: &Address) -> bool {
    account.eq_ignore_ascii_case(&expected.to_string())
}

/// Drives one payment attempt at a time against the injected wallet.
pub struct PaymentAuthorizationBuilder<P> {
    env: InjectedEnvironment<P>,
    config: BuilderConfig,
    active_signer: Option<Address>,
    state: FlowState,
    busy: BusyFlags,
}

impl<P: WalletProvider> PaymentAuthorizationBuilder<P> {
    pub fn new(env: InjectedEnvironment<P>, config: BuilderConfig) -> Self {
        Self {
            env,
            config,
            active_signer: None,
            state: FlowState::Idle,
            busy: BusyFlags::default(),
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn busy(&self) -> BusyFlags {
        self.busy
    }

    pub fn active_signer(&self) -> Option<Address> {
        self.active_signer
    }

    /// Whether a supported wallet is injected. Read-only; never fails.
    pub fn detect_wallet(&self) -> bool {
        self.config.detector.detect(&self.env)
    }

    /// Subscribe to the wallet's account changes, if a wallet is injected.
    pub fn subscribe_accounts(&self) -> Option<broadcast::Receiver<Vec<String>>> {
        self.env.provider().map(|p| p.subscribe_accounts())
    }

    async fn request_accounts(&self, method: &str) -> Result<Vec<String>, X402Error> {
        let provider = self.env.provider().ok_or(X402Error::NoProvider)?;
        let chain_id = self.config.chain.chain_id;
        let result = with_timeout(self.config.wallet_timeout, method, async {
            provider
                .request(method, serde_json::json!([]))
                .await
                .map_err(|e| classify_rpc_error(e, chain_id))
        })
        .await?;
        Ok(parse_accounts(&result))
    }

    /// Adopt an already-authorised account without prompting (`eth_accounts`).
    pub async fn restore_connection(&mut self) -> Result<Option<Address>, X402Error> {
        let accounts = self.request_accounts("eth_accounts").await?;
        self.apply_accounts_changed(&accounts);
        Ok(self.active_signer)
    }

    /// Request account access and record the first account as the active signer.
    pub async fn connect(&mut self) -> Result<Address, X402Error> {
        if self.busy.connecting {
            return Err(X402Error::Busy("wallet connection"));
        }
        if self.env.provider().is_none() {
            return Err(X402Error::NoProvider);
        }
        self.state.transition(FlowState::Connecting)?;
        self.busy.connecting = true;

        let result = self.request_accounts("eth_requestAccounts").await.and_then(|accounts| {
            let first = accounts.first().ok_or_else(|| {
                X402Error::WalletError("No accounts found. Please unlock your wallet.".to_string())
            })?;
            first
                .parse::<Address>()
                .map_err(|e| X402Error::WalletError(format!("wallet returned bad address {first}: {e}")))
        });

        self.busy.connecting = false;
        match result {
            Ok(address) => {
                self.active_signer = Some(address);
                self.state = FlowState::Connected;
                tracing::info!(%address, "wallet connected");
                Ok(address)
            }
            Err(e) => {
                self.state = FlowState::failed_with(&e);
                tracing::warn!("wallet connection failed: {e}");
                Err(e)
            }
        }
    }

    /// Forget the active signer locally.
    pub fn disconnect(&mut self) {
        self.active_signer = None;
        self.state = FlowState::Idle;
    }

    /// React to an `accountsChanged` event.
    pub fn apply_accounts_changed(&mut self, accounts: &[String]) {
        match accounts.first().and_then(|a| a.parse::<Address>().ok()) {
            Some(address) => {
                if self.active_signer != Some(address) {
                    tracing::info!(%address, "active account changed");
                }
                self.active_signer = Some(address);
                if matches!(self.state, FlowState::Idle | FlowState::Connecting) {
                    self.state = FlowState::Connected;
                }
            }
            None => {
                if self.active_signer.take().is_some() {
                    tracing::info!("wallet disconnected");
                }
                self.state = FlowState::Idle;
            }
        }
    }

    /// Build an authorization from the active signer to `to` for a decimal `amount`.
    pub fn build_authorization(&self, to: Address, amount: &str) -> Result<Authorization, X402Error> {
        let from = self
            .active_signer
            .ok_or_else(|| X402Error::WalletError("wallet not connected".to_string()))?;
        build_authorization_at(from, to, amount, unix_now()?, &self.config.chain)
    }

    /// Resolve the token's EIP-712 domain through `rpc`, applying the domain policy.
    pub async fn fetch_domain_info<R: Provider>(
        &self,
        rpc: &R,
        contract: Address,
    ) -> Result<DomainFields, X402Error> {
        let info = fetch_domain_info(rpc, contract, &self.config.chain, self.config.rpc_timeout).await;
        info.check(self.config.domain_policy)?;
        Ok(DomainFields {
            name: info.name,
            version: info.version,
            chain_id: self.config.chain.chain_id,
            verifying_contract: contract,
        })
    }

    /// Obtain a wallet signature over `authorization` under `domain`.
    ///
    /// The wallet's current account must match `authorization.from`; otherwise
    /// no signature is requested. Whichever strategy produced the signature, it
    /// must recover to `authorization.from`.
    pub async fn sign(
        &mut self,
        authorization: &Authorization,
        domain: &DomainFields,
    ) -> Result<String, X402Error> {
        if self.busy.signing {
            return Err(X402Error::Busy("signing"));
        }
        let provider = self.env.provider().ok_or(X402Error::NoProvider)?;
        authorization.validate()?;
        self.state.transition(FlowState::Signing)?;
        self.busy.signing = true;

        let result = self.sign_inner(provider.as_ref(), authorization, domain).await;

        self.busy.signing = false;
        match &result {
            Ok(_) => self.state = FlowState::Signed,
            Err(e) => {
                self.state = FlowState::failed_with(e);
                tracing::warn!("signing failed: {e}");
            }
        }
        result
    }

    async fn sign_inner(
        &self,
        provider: &P,
        authorization: &Authorization,
        domain: &DomainFields,
    ) -> Result<String, X402Error> {
        let accounts = self.request_accounts("eth_requestAccounts").await?;
        let current = accounts.first().ok_or_else(|| {
            X402Error::WalletError(
                "No wallet accounts found. Please unlock your wallet and try again.".to_string(),
            )
        })?;
        if !same_address(current, &authorization.from) {
            return Err(X402Error::AddressMismatch {
                current: current.clone(),
                expected: authorization.from.to_string(),
            });
        }

        let request = SignRequest {
            account: authorization.from,
            domain: domain.clone(),
            message: transfer_message(authorization),
        };
        let (signature, strategy) = sign_with_strategies(
            provider,
            &request,
            &self.config.strategies,
            self.config.wallet_timeout,
        )
        .await?;
        let signer = recover_signer(authorization, domain, &signature)?;
        if signer != authorization.from {
            return Err(X402Error::AddressMismatch {
                current: signer.to_string(),
                expected: authorization.from.to_string(),
            });
        }
        tracing::debug!(?strategy, "authorization signed");
        Ok(signature)
    }

    /// Package a signature with its authorization.
    pub fn assemble(&self, signature: String, authorization: &Authorization) -> PaymentObject {
        assemble(signature, authorization)
    }

    /// One complete attempt: refresh the account, build, resolve the domain,
    /// sign, and assemble.
    pub async fn authorize<R: Provider>(
        &mut self,
        rpc: &R,
        to: Address,
        amount: &str,
    ) -> Result<PaymentObject, X402Error> {
        let accounts = self.request_accounts("eth_accounts").await?;
        if accounts.is_empty() {
            return Err(X402Error::WalletError(
                "No wallet accounts found. Please connect your wallet.".to_string(),
            ));
        }
        self.apply_accounts_changed(&accounts);

        let authorization = self.build_authorization(to, amount)?;
        let domain = self.fetch_domain_info(rpc, self.config.chain.token).await?;
        let signature = self.sign(&authorization, &domain).await?;
        tracing::info!(
            from = %authorization.from,
            to = %authorization.to,
            value = %authorization.value,
            "payment authorization signed"
        );
        Ok(self.assemble(signature, &authorization))
    }
}
