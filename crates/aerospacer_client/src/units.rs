//! Conversion between human decimal amounts and raw token units
//!
//! Amounts are parsed from strings so no float rounding ever reaches a
//! payload. Fraction digits beyond the token's decimals are truncated.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount '{0}'")]
    Invalid(String),

    #[error("amount '{0}' overflows")]
    Overflow(String),
}

fn pow10(decimals: u32) -> Option<u128> {
    10u128.checked_pow(decimals)
}

/// Parse `"1.5"` with 9 decimals into `1_500_000_000`
pub fn parse_units(amount: &str, decimals: u32) -> Result<u128, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(UnitsError::Invalid(amount.to_string()));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(UnitsError::Invalid(amount.to_string()));
    }

    let overflow = || UnitsError::Overflow(amount.to_string());
    let scale = pow10(decimals).ok_or_else(overflow)?;

    let int_value = if int_part.is_empty() {
        0
    } else {
        int_part.parse::<u128>().map_err(|_| overflow())?
    };

    let mut frac: String = frac_part.chars().take(decimals as usize).collect();
    while frac.len() < decimals as usize {
        frac.push('0');
    }
    let frac_value = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>().map_err(|_| overflow())?
    };

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(overflow)
}

/// Parse an amount that must fit a u64 payload field
pub fn parse_units_u64(amount: &str, decimals: u32) -> Result<u64, UnitsError> {
    let raw = parse_units(amount, decimals)?;
    u64::try_from(raw).map_err(|_| UnitsError::Overflow(amount.to_string()))
}

/// Format raw units with at most `precision` fraction digits, trailing zeros trimmed
pub fn format_units(raw: u128, decimals: u32, precision: u32) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let digits = format!("{:0>width$}", raw, width = decimals as usize + 1);
    let split = digits.len() - decimals as usize;
    let (int_part, frac_part) = digits.split_at(split);

    let frac = &frac_part[..frac_part.len().min(precision as usize)];
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fraction() {
        assert_eq!(parse_units("1", 9), Ok(1_000_000_000));
        assert_eq!(parse_units("1.5", 9), Ok(1_500_000_000));
        assert_eq!(parse_units("0.000000001", 9), Ok(1));
        assert_eq!(parse_units(".25", 2), Ok(25));
        assert_eq!(parse_units("3.", 2), Ok(300));
    }

    #[test]
    fn test_parse_truncates_extra_digits() {
        assert_eq!(parse_units("1.23456", 2), Ok(123));
    }

    #[test]
    fn test_parse_stablecoin_decimals() {
        assert_eq!(parse_units("100", 18), Ok(100 * 10u128.pow(18)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_units("", 9), Err(UnitsError::Empty));
        assert!(matches!(parse_units("-1", 9), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("1e9", 9), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("1.2.3", 9), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units(".", 9), Err(UnitsError::Invalid(_))));
    }

    #[test]
    fn test_parse_u64_overflow() {
        assert!(matches!(parse_units_u64("100", 18), Err(UnitsError::Overflow(_))));
        assert_eq!(parse_units_u64("18", 18), Ok(18 * 10u64.pow(18)));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_units(1_500_000_000, 9, 9), "1.5");
        assert_eq!(format_units(1, 9, 9), "0.000000001");
        assert_eq!(format_units(1, 9, 4), "0");
        assert_eq!(format_units(123_456_789, 6, 2), "123.45");
        assert_eq!(format_units(42, 0, 0), "42");
        assert_eq!(format_units(0, 18, 4), "0");
    }
}
