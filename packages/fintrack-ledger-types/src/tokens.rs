//! Exact conversions between user-entered amounts and base units.
//!
//! All arithmetic happens on [`BigUint`]; no amount ever passes through a float.

use crate::ErrorKind;
use candid::Nat;
use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative")]
    Negative,
    #[error("amount must be a whole number of base units")]
    NotAnInteger,
    #[error("unexpected character {0:?} in amount")]
    InvalidCharacter(char),
    #[error("amount has {actual} fractional digits but the token only has {decimals} decimals")]
    TooManyFractionalDigits { actual: usize, decimals: u8 },
}

impl AmountParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

fn digits(text: &str) -> Result<BigUint, AmountParseError> {
    if let Some(c) = text.chars().find(|c| !c.is_ascii_digit()) {
        return Err(AmountParseError::InvalidCharacter(c));
    }
    if text.is_empty() {
        return Ok(BigUint::zero());
    }
    BigUint::parse_bytes(text.as_bytes(), 10).ok_or(AmountParseError::Empty)
}

fn strip_sign(text: &str) -> Result<&str, AmountParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountParseError::Empty);
    }
    if text.starts_with('-') {
        return Err(AmountParseError::Negative);
    }
    Ok(text)
}

/// Parses a plain integer amount of base units, e.g. `"1000000"`.
pub fn parse_base_units(text: &str) -> Result<Nat, AmountParseError> {
    let text = strip_sign(text)?;
    if text.contains('.') {
        return Err(AmountParseError::NotAnInteger);
    }
    digits(text).map(Nat)
}

/// Parses a decimal amount such as `"0.015"` into base units of a token with `decimals`
/// decimal places.
pub fn parse_decimal(text: &str, decimals: u8) -> Result<Nat, AmountParseError> {
    let text = strip_sign(text)?;
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountParseError::Empty);
    }
    if fraction.len() > decimals as usize {
        return Err(AmountParseError::TooManyFractionalDigits {
            actual: fraction.len(),
            decimals,
        });
    }
    let scale = BigUint::from(10_u8).pow(decimals as u32);
    let padded_fraction = format!("{fraction:0<width$}", width = decimals as usize);
    Ok(Nat(digits(whole)? * scale + digits(&padded_fraction)?))
}

/// Renders base units as a decimal string without trailing zeros, e.g. `1500000` with 6
/// decimals is `"1.5"`.
pub fn format_decimal(amount: &Nat, decimals: u8) -> String {
    let digits = amount.0.to_str_radix(10);
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn should_parse_decimal_amounts_exactly() {
        assert_eq!(
            parse_decimal("0.1", 18),
            Ok(Nat::from(100_000_000_000_000_000_u64))
        );
        assert_eq!(parse_decimal("1.5", 8), Ok(Nat::from(150_000_000_u64)));
        assert_eq!(parse_decimal(".5", 1), Ok(Nat::from(5_u8)));
        assert_eq!(parse_decimal("7", 0), Ok(Nat::from(7_u8)));
        assert_eq!(parse_decimal(" 2. ", 2), Ok(Nat::from(200_u64)));
    }

    #[test]
    fn should_reject_malformed_decimal_amounts() {
        assert_eq!(parse_decimal("", 8), Err(AmountParseError::Empty));
        assert_eq!(parse_decimal(".", 8), Err(AmountParseError::Empty));
        assert_eq!(parse_decimal("-1", 8), Err(AmountParseError::Negative));
        assert_eq!(
            parse_decimal("1e5", 8),
            Err(AmountParseError::InvalidCharacter('e'))
        );
        assert_eq!(
            parse_decimal("0.000000001", 8),
            Err(AmountParseError::TooManyFractionalDigits {
                actual: 9,
                decimals: 8
            })
        );
        assert_matches!(
            parse_decimal("1.2.3", 8),
            Err(AmountParseError::InvalidCharacter('.'))
        );
    }

    #[test]
    fn should_parse_only_plain_integers_as_base_units() {
        assert_eq!(parse_base_units("100"), Ok(Nat::from(100_u8)));
        assert_eq!(parse_base_units("-100"), Err(AmountParseError::Negative));
        assert_eq!(parse_base_units("1.5"), Err(AmountParseError::NotAnInteger));
        assert_eq!(
            parse_base_units("12abc"),
            Err(AmountParseError::InvalidCharacter('a'))
        );
    }

    #[test]
    fn should_format_without_trailing_zeros() {
        assert_eq!(format_decimal(&Nat::from(150_000_000_u64), 8), "1.5");
        assert_eq!(format_decimal(&Nat::from(1_u8), 8), "0.00000001");
        assert_eq!(format_decimal(&Nat::from(200_000_000_u64), 8), "2");
        assert_eq!(format_decimal(&Nat::from(42_u8), 0), "42");
    }

    proptest! {
        #[test]
        fn should_not_lose_precision(whole in "[0-9]{1,30}", fraction in "[0-9]{0,18}") {
            let text = format!("{whole}.{fraction}");
            let units = parse_decimal(&text, 18).unwrap();
            let expected = BigUint::parse_bytes(
                format!("{whole}{fraction:0<18}").as_bytes(),
                10,
            )
            .unwrap();
            prop_assert_eq!(units.0, expected);
        }
    }
}
