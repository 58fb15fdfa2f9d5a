//! Resolution of the token's EIP-712 domain name and version.
//!
//! `name()` and `version()` are read independently from the token contract.
//! A failed or timed-out read falls back to the configured default; the
//! fallback is recorded in [`DomainSource`] so callers can apply a
//! [`DomainPolicy`].

use std::time::Duration;

use alloy::primitives::Address;
use alloy::providers::{Provider, RootProvider};

use crate::eip712::DomainFields;
use crate::{ChainConfig, IEip3009Token, X402Error};

/// Where a domain field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainSource {
    OnChain,
    Fallback,
}

/// Whether a signature may be requested over a domain that used fallback values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainPolicy {
    /// Sign with fallback values (a domain mismatch is then caught by the verifier).
    #[default]
    FallbackAllowed,
    /// Abort the flow unless both fields were read on-chain.
    RequireOnChain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    pub name: String,
    pub version: String,
    pub name_source: DomainSource,
    pub version_source: DomainSource,
}

impl DomainInfo {
    /// Both fields at their configured defaults.
    pub fn fallback(config: &ChainConfig) -> Self {
        Self {
            name: config.fallback_domain_name.clone(),
            version: config.fallback_domain_version.clone(),
            name_source: DomainSource::Fallback,
            version_source: DomainSource::Fallback,
        }
    }

    pub fn is_on_chain(&self) -> bool {
        self.name_source == DomainSource::OnChain && self.version_source == DomainSource::OnChain
    }

    /// Apply `policy`, failing if it forbids the fallback values in use.
    pub fn check(&self, policy: DomainPolicy) -> Result<(), X402Error> {
        match policy {
            DomainPolicy::FallbackAllowed => Ok(()),
            DomainPolicy::RequireOnChain if self.is_on_chain() => Ok(()),
            DomainPolicy::RequireOnChain => Err(X402Error::NetworkError(
                "token domain could not be read on-chain".to_string(),
            )),
        }
    }

    /// Full domain descriptor for `config`'s chain and token.
    pub fn to_fields(&self, config: &ChainConfig) -> DomainFields {
        DomainFields {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: config.chain_id,
            verifying_contract: config.token,
        }
    }
}

/// HTTP provider for read-only calls against `rpc_url`.
pub fn connect_rpc(rpc_url: &str) -> Result<RootProvider, X402Error> {
    let url = rpc_url
        .parse()
        .map_err(|e| X402Error::ConfigError(format!("invalid RPC URL '{rpc_url}': {e}")))?;
    Ok(RootProvider::new_http(url))
}

/// Read `name()` and `version()` from `token`. Never fails: each field falls
/// back independently.
pub async fn fetch_domain_info<P: Provider>(
    provider: &P,
    token: Address,
    config: &ChainConfig,
    timeout: Duration,
) -> DomainInfo {
    let contract = IEip3009Token::new(token, provider);
    let name_call = contract.name();
    let version_call = contract.version();

    let (name, version) = tokio::join!(
        tokio::time::timeout(timeout, name_call.call()),
        tokio::time::timeout(timeout, version_call.call()),
    );

    let mut info = DomainInfo::fallback(config);
    match name {
        Ok(Ok(name)) => {
            info.name = name;
            info.name_source = DomainSource::OnChain;
        }
        Ok(Err(e)) => tracing::warn!(%token, "name() failed, using fallback domain name: {e}"),
        Err(_) => tracing::warn!(%token, "name() timed out, using fallback domain name"),
    }
    match version {
        Ok(Ok(version)) => {
            info.version = version;
            info.version_source = DomainSource::OnChain;
        }
        Ok(Err(e)) => tracing::warn!(%token, "version() failed, using fallback domain version: {e}"),
        Err(_) => tracing::warn!(%token, "version() timed out, using fallback domain version"),
    }

    tracing::debug!(name = %info.name, version = %info.version, "resolved token domain");
    info
}
