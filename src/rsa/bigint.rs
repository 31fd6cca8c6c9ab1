// RSA Big Integer Operations
// Modular arithmetic on top of num-bigint: primality, exponentiation, inverses, sampling

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::{thread_rng, CryptoRng, RngCore};

use crate::error::{Error, Result};

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Default number of Miller-Rabin rounds used when validating user-supplied primes
pub const DEFAULT_PRIME_ROUNDS: u32 = 5;

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Modular exponentiation: base^exp mod modulus
/// Uses square-and-multiply algorithm
///
/// A modulus of one always yields zero. The base is reduced into
/// `[0, modulus)` before the loop, so the result is always in that range.
///
/// # Panics
///
/// Panics if `modulus` is zero.
pub fn mod_pow(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
    if modulus.is_one() {
        return RsaBigInt::zero();
    }

    let mut result = RsaBigInt::one();
    let mut base = base % modulus;
    let mut exp = exp.clone();

    while !exp.is_zero() {
        if exp.is_odd() {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exp >>= 1;
    }

    result
}

/// (value + addend)^2 mod modulus
pub fn sum_square_mod(value: &RsaBigInt, addend: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
    let s = (value + addend) % modulus;
    mod_pow(&s, &from_u64(2), modulus)
}

/// Greatest common divisor
pub fn gcd(a: &RsaBigInt, b: &RsaBigInt) -> RsaBigInt {
    a.gcd(b)
}

/// Extended Euclidean Algorithm
/// Returns (gcd, x, y) such that a*x + b*y = gcd = gcd(a, b)
///
/// Works on signed integers; the returned gcd is never negative.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    if b.is_zero() {
        let x = if a.is_negative() {
            -BigInt::one()
        } else {
            BigInt::one()
        };
        return (a.abs(), x, BigInt::zero());
    }

    let (gcd, x1, y1) = extended_gcd(b, &(a % b));
    let y = x1 - (a / b) * &y1;

    (gcd, y1, y)
}

/// Compute modular inverse: e^(-1) mod modulus
///
/// Fails with [`Error::Arithmetic`] when `e` and `modulus` share a factor.
pub fn mod_inverse(e: &RsaBigInt, modulus: &RsaBigInt) -> Result<RsaBigInt> {
    if modulus.is_zero() {
        return Err(Error::InvalidArgument("modulus must be non-zero".to_string()));
    }

    let a = BigInt::from_biguint(Sign::Plus, e.clone());
    let m = BigInt::from_biguint(Sign::Plus, modulus.clone());
    let (g, x, _) = extended_gcd(&a, &m);

    if !g.is_one() {
        return Err(Error::Arithmetic(format!(
            "{} and {} are not coprime (gcd = {}), no inverse exists",
            e, modulus, g
        )));
    }

    // mod_floor keeps the representative in [0, modulus)
    x.mod_floor(&m)
        .to_biguint()
        .ok_or_else(|| Error::Arithmetic("negative inverse after normalization".to_string()))
}

/// Uniformly sample an integer in `[min, max)` from the thread-local CSPRNG
pub fn random_in_range(min: &RsaBigInt, max: &RsaBigInt) -> Result<RsaBigInt> {
    random_in_range_with(&mut thread_rng(), min, max)
}

/// Uniformly sample an integer in `[min, max)` from `rng`
///
/// Rejection sampling: each draw fills as many bytes as the width of
/// `max - min`, clears the bits above that width and retries while the
/// value is out of range. Every draw is accepted with probability >= 1/2.
pub fn random_in_range_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    min: &RsaBigInt,
    max: &RsaBigInt,
) -> Result<RsaBigInt> {
    if min >= max {
        return Err(Error::InvalidArgument(format!(
            "min ({}) must be less than max ({})",
            min, max
        )));
    }

    let diff = max - min;
    let bits = diff.bits();
    let byte_len = ((bits + 7) / 8) as usize;
    let excess = (byte_len as u64 * 8 - bits) as u32;
    let mut buf = vec![0u8; byte_len];

    loop {
        rng.fill_bytes(&mut buf);
        buf[0] &= 0xFFu8 >> excess;

        let val = RsaBigInt::from_bytes_be(&buf);
        if val < diff {
            return Ok(val + min);
        }
    }
}

/// Miller-Rabin primality test
/// Returns true if n is probably prime
pub fn is_probable_prime(n: &RsaBigInt, iterations: u32) -> bool {
    is_probable_prime_with(&mut thread_rng(), n, iterations)
}

/// Miller-Rabin primality test drawing witnesses from `rng`
///
/// A composite survives all rounds with probability at most 4^-iterations.
pub fn is_probable_prime_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    n: &RsaBigInt,
    iterations: u32,
) -> bool {
    if n < &RsaBigInt::from(2u8) {
        return false;
    }
    if n == &RsaBigInt::from(2u8) || n == &RsaBigInt::from(3u8) {
        return true;
    }
    if n.is_even() {
        return false;
    }

    // Write n-1 as d * 2^s with d odd
    let n_minus_one = n - 1u8;
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    let two = RsaBigInt::from(2u8);

    'witness: for _ in 0..iterations {
        // Pick random witness a in [2, n-2]
        let a = match random_in_range_with(rng, &two, &n_minus_one) {
            Ok(a) => a,
            // n >= 5 here, so the range is never empty
            Err(_) => return false,
        };

        let mut x = mod_pow(&a, &d, n);

        if x.is_one() || x == n_minus_one {
            continue;
        }

        for _ in 1..s {
            x = mod_pow(&x, &two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }

        // Composite
        return false;
    }

    // Probably prime
    true
}
