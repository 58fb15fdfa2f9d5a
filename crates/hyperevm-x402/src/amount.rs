//! Conversion between human-entered USDT0 amounts and smallest-unit integers.
//!
//! Integer-only arithmetic: no `f64` anywhere, so `"0.29"` is exactly
//! `290000` rather than whatever the nearest binary float rounds down to.

use crate::X402Error;

/// Convert a decimal amount (e.g. `"0.1"`) into an integer string of smallest
/// units, truncating digits beyond `decimals` (floor for non-negative input).
///
/// Empty, negative, or otherwise malformed input is rejected with
/// [`X402Error::InvalidAmount`] instead of silently becoming `"0"`.
pub fn to_smallest_units(amount: &str, decimals: u32) -> Result<String, X402Error> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(X402Error::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(X402Error::InvalidAmount(format!("'{amount}' is negative")));
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (integer_part, fractional_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    if integer_part.is_empty() && fractional_part.is_empty() {
        return Err(X402Error::InvalidAmount(format!("'{amount}' has no digits")));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(integer_part) || !all_digits(fractional_part) {
        return Err(X402Error::InvalidAmount(format!("'{amount}' is not a decimal number")));
    }

    let overflow = || X402Error::InvalidAmount(format!("'{amount}' is too large"));

    let integer: u128 = if integer_part.is_empty() {
        0
    } else {
        integer_part.parse().map_err(|_| overflow())?
    };

    // Truncate extra precision, right-pad the rest.
    let decimals = decimals as usize;
    let mut frac: String = fractional_part.chars().take(decimals).collect();
    while frac.len() < decimals {
        frac.push('0');
    }
    let fractional: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| overflow())?
    };

    let multiplier = 10u128.checked_pow(decimals as u32).ok_or_else(overflow)?;
    let total = integer
        .checked_mul(multiplier)
        .and_then(|v| v.checked_add(fractional))
        .ok_or_else(overflow)?;

    Ok(total.to_string())
}

/// Render a smallest-unit integer string as a decimal amount, trimming
/// trailing zeros (`"100000"` -> `"0.1"`, `"10000000"` -> `"10"`).
pub fn format_units(value: &str, decimals: u32) -> Result<String, X402Error> {
    let raw: u128 = value
        .parse()
        .map_err(|e| X402Error::InvalidAmount(format!("'{value}': {e}")))?;
    let multiplier = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| X402Error::ConfigError(format!("unsupported token decimals: {decimals}")))?;
    let whole = raw / multiplier;
    let frac = raw % multiplier;
    if frac == 0 {
        return Ok(whole.to_string());
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    Ok(format!("{whole}.{}", frac.trim_end_matches('0')))
}
