//! Per-attempt state machine and busy flags.
//!
//! ```text
//! idle -> connecting -> connected -> signing -> { signed | rejected | error }
//! ```
//!
//! Terminal states may restart: back to `idle`, or straight to `connecting` /
//! `signing` when a signer is still connected. Nothing retries automatically.

use crate::X402Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Signing,
    Signed,
    Rejected,
    Error,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Signed | FlowState::Rejected | FlowState::Error)
    }

    pub fn can_transition(self, to: FlowState) -> bool {
        use FlowState::*;
        match (self, to) {
            (Idle, Connecting) => true,
            (Connecting, Connected | Rejected | Error | Idle) => true,
            (Connected, Signing | Connecting | Idle) => true,
            (Signing, Signed | Rejected | Error) => true,
            (s, Idle | Connecting | Signing) if s.is_terminal() => true,
            _ => false,
        }
    }

    /// Move to `to`, refusing transitions the machine does not allow.
    pub fn transition(&mut self, to: FlowState) -> Result<(), X402Error> {
        if !self.can_transition(to) {
            return Err(X402Error::WalletError(format!(
                "invalid flow transition {self:?} -> {to:?}"
            )));
        }
        tracing::debug!(from = ?*self, to = ?to, "flow transition");
        *self = to;
        Ok(())
    }

    /// Terminal state for a failed operation.
    pub fn failed_with(err: &X402Error) -> FlowState {
        if err.is_rejection() {
            FlowState::Rejected
        } else {
            FlowState::Error
        }
    }
}

/// One flag per asynchronous phase. Callers disable re-submission while any is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusyFlags {
    pub connecting: bool,
    pub signing: bool,
    pub requesting: bool,
}

impl BusyFlags {
    pub fn any(&self) -> bool {
        self.connecting || self.signing || self.requesting
    }
}
