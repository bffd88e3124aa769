//! Fixed-point conversion between smallest token units and decimal strings
use crate::error::{BountyError, Result};

/// The reward token uses 6 decimal places throughout.
pub const REWARD_DECIMALS: u32 = 6;

/// Render `amount` smallest units as a trimmed decimal string
/// (`500000` at 6 decimals is `"0.5"`, `1000000` is `"1"`).
pub fn format_units(amount: u128, decimals: u32) -> String {
    let base = 10u128.pow(decimals);
    let whole = amount / base;
    let frac = amount % base;
    if frac == 0 {
        return whole.to_string();
    }

    let mut frac_digits = format!("{:0width$}", frac, width = decimals as usize);
    while frac_digits.ends_with('0') {
        frac_digits.pop();
    }
    format!("{}.{}", whole, frac_digits)
}

/// Parse a decimal string into smallest units. Rejects signs, exponents,
/// and more fractional digits than the token supports.
pub fn parse_units(value: &str, decimals: u32) -> Result<u128> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BountyError::Validation("amount is empty".to_string()));
    }

    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(BountyError::Validation(format!("invalid amount '{}'", value)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(BountyError::Validation(format!("invalid amount '{}'", value)));
    }
    if frac.len() > decimals as usize {
        return Err(BountyError::Validation(format!(
            "amount '{}' has more than {} decimal places",
            value, decimals
        )));
    }

    let overflow = || BountyError::Validation(format!("amount '{}' is too large", value));
    let base = 10u128.pow(decimals);

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    whole_units
        .checked_mul(base)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(overflow)
}
