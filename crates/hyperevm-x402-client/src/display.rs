//! Plain-text rendering for the CLI.

use x402::amount::format_units;
use x402::{ResponseOutcome, SettleResponse, TOKEN_DECIMALS};

use crate::flow::PayOutcome;

/// `0x1234...abcd` for addresses and hashes; short input is returned as is.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_char_boundary(6) || !address.is_char_boundary(address.len() - 4) {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Smallest-unit USDT0 amount as a decimal with its symbol.
pub fn format_usdt0(value: &str) -> String {
    match format_units(value, TOKEN_DECIMALS) {
        Ok(amount) => format!("{amount} USDT0"),
        Err(_) => format!("{value} (raw units)"),
    }
}

pub fn render_settle(settle: &SettleResponse) -> String {
    if !settle.success {
        return format!(
            "Settlement failed: {}",
            settle.error_reason.as_deref().unwrap_or("unknown reason")
        );
    }
    let mut out = String::from("Payment settled");
    if let Some(amount) = &settle.amount {
        out.push_str(&format!(": {}", format_usdt0(amount)));
    }
    if let Some(tx) = &settle.transaction {
        out.push_str(&format!("\nTransaction: {tx}"));
    }
    if let Some(block) = settle.block_number {
        out.push_str(&format!("\nBlock: {block}"));
    }
    out
}

pub fn render_pay(outcome: &PayOutcome) -> String {
    match outcome {
        PayOutcome::WalletMissing => {
            "Install Wallet: no supported wallet found. Set EVM_PRIVATE_KEY or install Rabby."
                .to_string()
        }
        PayOutcome::NotVerified { verify, .. } => format!(
            "Payment not verified: {}",
            verify.invalid_reason.as_deref().unwrap_or("unknown reason")
        ),
        PayOutcome::Settled {
            payment, settle, ..
        } => format!(
            "Paid from {} to {}\n{}",
            short_address(&payment.authorization.from),
            short_address(&payment.authorization.to),
            render_settle(settle)
        ),
    }
}

pub fn render_outcome(outcome: &ResponseOutcome) -> String {
    match outcome {
        ResponseOutcome::Success {
            data,
            payment_status,
        } => {
            let mut out = data.clone();
            if let Some(tx) = &payment_status.transaction_hash {
                out.push_str(&format!("\n\nPaid, transaction {}", short_address(tx)));
            }
            out
        }
        ResponseOutcome::PaymentRequired { message } => {
            format!("Payment required: {message}\nConnect a wallet and try again.")
        }
        ResponseOutcome::InvalidPayment { message } => format!("Payment rejected: {message}"),
        ResponseOutcome::Error { message } => format!("Error: {message}\nPlease try again."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0xA15e55079e01267676157869B1D0A3026aC280Ee"),
            "0xA15e...80Ee"
        );
        assert_eq!(short_address("0xabc"), "0xabc");
    }

    #[test]
    fn test_format_usdt0() {
        assert_eq!(format_usdt0("100000"), "0.1 USDT0");
        assert_eq!(format_usdt0("oops"), "oops (raw units)");
    }

    #[test]
    fn test_render_failed_settlement() {
        let settle = SettleResponse {
            success: false,
            transaction: None,
            payer: None,
            receiver: None,
            amount: None,
            block_number: None,
            timestamp: None,
            error_reason: Some("nonce already used".to_string()),
        };
        assert_eq!(render_settle(&settle), "Settlement failed: nonce already used");
    }
}
