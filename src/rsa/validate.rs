// Input Validation
// Parses decimal text for p, q, e and signatures into checked big integers

use num_traits::One;

use super::bigint::{is_probable_prime, RsaBigInt};
use super::keygen::PrimePair;
use crate::error::{Error, Result};

/// Parse a non-negative decimal integer.
///
/// Surrounding ASCII whitespace and one leading `+` are allowed; anything
/// else besides ASCII digits (including `_` separators) is rejected.
pub fn parse_decimal_str(text: &str) -> Option<RsaBigInt> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    RsaBigInt::parse_bytes(digits.as_bytes(), 10)
}

fn parse_decimal(name: &str, text: &str) -> Result<RsaBigInt> {
    parse_decimal_str(text)
        .ok_or_else(|| Error::InvalidInput(format!("{} is not a number: {:?}", name, text.trim())))
}

fn parse_greater_than_one(name: &str, text: &str) -> Result<RsaBigInt> {
    let value = parse_decimal(name, text)?;
    if value <= RsaBigInt::one() {
        return Err(Error::InvalidInput(format!(
            "{} must be greater than 1, got {}",
            name, value
        )));
    }
    Ok(value)
}

/// Parse a prime candidate, checking it with `rounds` Miller-Rabin rounds
pub fn parse_prime(name: &str, text: &str, rounds: u32) -> Result<RsaBigInt> {
    let value = parse_decimal(name, text)?;
    if !is_probable_prime(&value, rounds) {
        return Err(Error::InvalidInput(format!("{} = {} is not prime", name, value)));
    }
    Ok(value)
}

/// Public exponent: an integer greater than 1
pub fn parse_exponent(text: &str) -> Result<RsaBigInt> {
    parse_greater_than_one("e", text)
}

/// Signature text: an integer greater than 1
pub fn parse_signature(text: &str) -> Result<RsaBigInt> {
    parse_greater_than_one("signature", text)
}

impl PrimePair {
    /// Parse and validate both primes from decimal text
    pub fn parse(p: &str, q: &str, rounds: u32) -> Result<Self> {
        let p = parse_decimal("p", p)?;
        let q = parse_decimal("q", q)?;
        PrimePair::new(p, q, rounds)
    }
}
