// RSA Module - Main module file
// Exports the arithmetic engine, block hash, key generation and signatures

pub mod bigint;
pub mod hash;
pub mod keygen;
pub mod signature;
pub mod validate;

pub use bigint::{RsaBigInt, DEFAULT_PRIME_ROUNDS};
pub use hash::{compute_file_hash, compute_hash, compute_hash_range, hash_bytes, BlockHasher};
pub use keygen::{generate_keypair, generate_keypair_with, KeyPair, PrimePair};
pub use signature::{sign, verify, Verification};
pub use validate::{parse_exponent, parse_prime, parse_signature};
