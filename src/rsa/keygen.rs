// RSA Key Generation
// Derives (e, d, n) from a caller-supplied pair of primes

use std::fmt;

use num_traits::One;
use rand::{thread_rng, CryptoRng, RngCore};

use super::bigint::{
    from_u64, gcd, is_probable_prime, mod_inverse, random_in_range_with, RsaBigInt,
};
use super::signature::{sign, verify, Verification};
use crate::error::{Error, Result};

/// Two integers accepted as primes by the Miller-Rabin test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimePair {
    p: RsaBigInt,
    q: RsaBigInt,
}

impl PrimePair {
    /// Validate both candidates with `rounds` Miller-Rabin rounds
    pub fn new(p: RsaBigInt, q: RsaBigInt, rounds: u32) -> Result<Self> {
        if !is_probable_prime(&p, rounds) {
            return Err(Error::InvalidInput(format!("p = {} is not prime", p)));
        }
        if !is_probable_prime(&q, rounds) {
            return Err(Error::InvalidInput(format!("q = {} is not prime", q)));
        }
        if p == q {
            tracing::warn!(%p, "p and q are equal, signatures may not verify");
        }

        Ok(Self { p, q })
    }

    pub fn p(&self) -> &RsaBigInt {
        &self.p
    }

    pub fn q(&self) -> &RsaBigInt {
        &self.q
    }

    /// n = p * q
    pub fn modulus(&self) -> RsaBigInt {
        &self.p * &self.q
    }

    /// φ(n) = (p-1)(q-1)
    pub fn totient(&self) -> RsaBigInt {
        (&self.p - 1u8) * (&self.q - 1u8)
    }
}

/// RSA key material: public exponent `e`, private exponent `d`, modulus `n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub e: RsaBigInt,
    pub d: RsaBigInt,
    pub n: RsaBigInt,
}

impl KeyPair {
    /// Build a key pair around a chosen public exponent.
    ///
    /// `e` must satisfy `1 < e < φ` and be coprime to `φ`.
    pub fn with_public_exponent(primes: &PrimePair, e: RsaBigInt) -> Result<Self> {
        let phi = primes.totient();
        if e <= RsaBigInt::one() || e >= phi {
            return Err(Error::InvalidInput(format!(
                "e = {} must lie in (1, {})",
                e, phi
            )));
        }

        let d = mod_inverse(&e, &phi)?;

        Ok(Self {
            e,
            d,
            n: primes.modulus(),
        })
    }

    /// s = hash^d mod n
    pub fn sign(&self, hash: &RsaBigInt) -> Result<RsaBigInt> {
        sign(hash, &self.d, &self.n)
    }

    /// h' = s^e mod n, compared against `expected_hash`
    pub fn verify(&self, signature: &RsaBigInt, expected_hash: &RsaBigInt) -> Result<Verification> {
        verify(signature, &self.e, &self.n, expected_hash)
    }
}

impl fmt::Display for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "e: {}", self.e)?;
        writeln!(f, "d: {}", self.d)?;
        write!(f, "n: {}", self.n)
    }
}

/// Generate a key pair from `primes` using the thread-local CSPRNG
pub fn generate_keypair(primes: &PrimePair) -> Result<KeyPair> {
    generate_keypair_with(&mut thread_rng(), primes)
}

/// Generate a key pair from `primes`, sampling `e` from `rng`
///
/// `e` is drawn uniformly from `[2, φ)` until it is coprime to `φ`. Primes
/// with `φ <= 2` leave no candidate and fail with [`Error::InvalidArgument`].
pub fn generate_keypair_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    primes: &PrimePair,
) -> Result<KeyPair> {
    let n = primes.modulus();
    let phi = primes.totient();
    let two = from_u64(2);

    let mut attempts = 0u32;
    let e = loop {
        attempts += 1;
        let candidate = random_in_range_with(rng, &two, &phi)?;
        if gcd(&candidate, &phi).is_one() {
            break candidate;
        }
    };

    let d = mod_inverse(&e, &phi)?;
    tracing::debug!(%n, %e, attempts, "generated key pair");

    Ok(KeyPair { e, d, n })
}
