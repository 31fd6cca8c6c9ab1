// RSA Sign and Verify
// s = h^d mod n; verification recovers h' = s^e mod n and compares

use super::bigint::{mod_pow, RsaBigInt};
use crate::error::{Error, Result};

/// Outcome of a signature check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub is_valid: bool,
    /// Hash recovered from the signature, reported even on mismatch
    pub recovered_hash: RsaBigInt,
}

fn check_range(what: &'static str, value: &RsaBigInt, n: &RsaBigInt) -> Result<()> {
    if value >= n {
        return Err(Error::Range {
            what,
            value: value.to_string(),
            modulus: n.to_string(),
        });
    }
    Ok(())
}

/// s = hash^d mod n
///
/// Fails with [`Error::Range`] unless `hash` is in `[0, n)`.
pub fn sign(hash: &RsaBigInt, d: &RsaBigInt, n: &RsaBigInt) -> Result<RsaBigInt> {
    check_range("hash", hash, n)?;
    Ok(mod_pow(hash, d, n))
}

/// h' = s^e mod n
///
/// Fails with [`Error::Range`] unless `signature` is in `[0, n)`.
pub fn verify(
    signature: &RsaBigInt,
    e: &RsaBigInt,
    n: &RsaBigInt,
    expected_hash: &RsaBigInt,
) -> Result<Verification> {
    check_range("signature", signature, n)?;

    let recovered_hash = mod_pow(signature, e, n);
    let is_valid = &recovered_hash == expected_hash;
    tracing::debug!(%recovered_hash, %expected_hash, is_valid, "signature checked");

    Ok(Verification {
        is_valid,
        recovered_hash,
    })
}
