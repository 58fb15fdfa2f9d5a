use thiserror::Error;

/// Errors returned by the payment-authorization flow.
///
/// Every variant is recoverable: callers surface [`X402Error::user_message`]
/// to the user and may restart the flow from idle.
#[derive(Debug, Error)]
pub enum X402Error {
    #[error("no wallet provider detected")]
    NoProvider,

    #[error("user rejected the request: {0}")]
    UserRejected(String),

    #[error("wallet address mismatch: current {current}, expected {expected}")]
    AddressMismatch { current: String, expected: String },

    #[error("wallet connected to chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: String },

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("wallet error: {0}")]
    WalletError(String),

    #[error("{0} timed out")]
    Timeout(String),

    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl X402Error {
    /// Message suitable for showing to the person at the wallet.
    pub fn user_message(&self) -> String {
        match self {
            X402Error::NoProvider => {
                "Wallet not available. Please install a wallet like MetaMask or Rabby.".to_string()
            }
            X402Error::UserRejected(_) => "Request was rejected in the wallet. Please try again.".to_string(),
            X402Error::AddressMismatch { current, expected } => format!(
                "Wallet address mismatch. Please reconnect your wallet.\nCurrent: {current}\nExpected: {expected}"
            ),
            X402Error::ChainMismatch { expected, .. } => {
                format!("Please switch your wallet to HyperEVM network (Chain ID: {expected})")
            }
            X402Error::InvalidAmount(reason) => format!("Invalid payment amount: {reason}"),
            X402Error::Timeout(what) => format!("{what} timed out. Please try again."),
            X402Error::Busy(what) => format!("Please wait, {what} is still in progress."),
            other => format!("{other}"),
        }
    }

    /// Whether this error came from the person declining a wallet prompt.
    pub fn is_rejection(&self) -> bool {
        matches!(self, X402Error::UserRejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_distinct_per_failure() {
        let rejected = X402Error::UserRejected("declined".into()).user_message();
        let chain = X402Error::ChainMismatch {
            expected: 999,
            actual: "0x1".into(),
        }
        .user_message();
        let mismatch = X402Error::AddressMismatch {
            current: "0xaa".into(),
            expected: "0xbb".into(),
        }
        .user_message();

        assert_ne!(rejected, chain);
        assert_ne!(chain, mismatch);
        assert!(chain.contains("999"));
        assert!(mismatch.contains("0xaa") && mismatch.contains("0xbb"));
    }
}
