// Signing Workflows
// End-to-end flows: hash a file, sign it into a signed copy, verify a signed copy

use std::path::{Path, PathBuf};

use rand::{thread_rng, CryptoRng, RngCore};

use crate::error::Result;
use crate::rsa::bigint::RsaBigInt;
use crate::rsa::hash::compute_file_hash;
use crate::rsa::keygen::{generate_keypair_with, KeyPair, PrimePair};
use crate::rsa::signature::{verify, Verification};
use crate::util::file_ops::{
    format_file_size, get_file_size, load_signed_message, save_signed_message,
};

/// Fresh key pair plus the hash of a file under its modulus
#[derive(Debug, Clone)]
pub struct HashReport {
    pub keypair: KeyPair,
    pub hash: RsaBigInt,
}

#[derive(Debug, Clone)]
pub struct SignReport {
    pub keypair: KeyPair,
    pub hash: RsaBigInt,
    pub signature: RsaBigInt,
    pub output: PathBuf,
    pub bytes_written: u64,
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub content_hash: RsaBigInt,
    pub signature: RsaBigInt,
    pub verification: Verification,
}

pub fn hash_file(path: &Path, primes: &PrimePair) -> Result<HashReport> {
    hash_file_with(&mut thread_rng(), path, primes)
}

/// Generate a key pair from `primes` and hash `path` under its modulus
pub fn hash_file_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    path: &Path,
    primes: &PrimePair,
) -> Result<HashReport> {
    let keypair = generate_keypair_with(rng, primes)?;
    let size = get_file_size(path)?;
    let hash = compute_file_hash(path, &keypair.n)?;
    tracing::info!(
        path = %path.display(),
        size = %format_file_size(size),
        %hash,
        "hashed file"
    );

    Ok(HashReport { keypair, hash })
}

pub fn sign_file(path: &Path, primes: &PrimePair, output: &Path) -> Result<SignReport> {
    sign_file_with(&mut thread_rng(), path, primes, output)
}

/// Hash `path`, sign the hash and write the signed copy to `output`
pub fn sign_file_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    path: &Path,
    primes: &PrimePair,
    output: &Path,
) -> Result<SignReport> {
    let HashReport { keypair, hash } = hash_file_with(rng, path, primes)?;
    let signature = keypair.sign(&hash)?;
    let bytes_written = save_signed_message(path, output, &signature)?;

    Ok(SignReport {
        keypair,
        hash,
        signature,
        output: output.to_path_buf(),
        bytes_written,
    })
}

/// Re-hash the content of a signed file under `p * q` and check it against
/// the hash recovered from the embedded signature with `e`
pub fn verify_file(
    path: &Path,
    primes: &PrimePair,
    e: &RsaBigInt,
    tail_window: usize,
) -> Result<VerifyReport> {
    let modulus = primes.modulus();
    let decoded = load_signed_message(path, &modulus, tail_window)?;
    let verification = verify(&decoded.signature, e, &modulus, &decoded.content_hash)?;

    if verification.is_valid {
        tracing::info!(path = %path.display(), "signature is valid");
    } else {
        tracing::warn!(
            path = %path.display(),
            recovered = %verification.recovered_hash,
            expected = %decoded.content_hash,
            "signature mismatch"
        );
    }

    Ok(VerifyReport {
        content_hash: decoded.content_hash,
        signature: decoded.signature,
        verification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::rsa::bigint::from_u64;
    use crate::util::signed_file::DEFAULT_TAIL_WINDOW;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;

    fn primes() -> PrimePair {
        PrimePair::new(from_u64(61), from_u64(53), 10).unwrap()
    }

    #[test]
    fn test_sign_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("message.txt");
        let output = dir.path().join("message.signed.txt");
        fs::write(&input, b"A").unwrap();

        let mut rng = StdRng::seed_from_u64(11);
        let report = sign_file_with(&mut rng, &input, &primes(), &output).unwrap();
        assert_eq!(report.hash, from_u64(1361));
        assert_eq!(report.keypair.n, from_u64(3233));

        let check = verify_file(&output, &primes(), &report.keypair.e, DEFAULT_TAIL_WINDOW).unwrap();
        assert!(check.verification.is_valid);
        assert_eq!(check.content_hash, from_u64(1361));
        assert_eq!(check.signature, report.signature);
    }

    #[test]
    fn test_verify_with_wrong_exponent() {
        let dir = tempfile::tempdir().unwrap();
        let signed = dir.path().join("signed.txt");
        // signature 1388 belongs to e = 17; e = 7 recovers something else
        fs::write(&signed, b"A--SIGNATURE--1388").unwrap();

        let check = verify_file(&signed, &primes(), &from_u64(7), DEFAULT_TAIL_WINDOW).unwrap();
        assert!(!check.verification.is_valid);
        assert_ne!(check.verification.recovered_hash, from_u64(1361));
    }

    #[test]
    fn test_verify_signature_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let signed = dir.path().join("signed.txt");
        fs::write(&signed, b"A--SIGNATURE--99999").unwrap();

        let err = verify_file(&signed, &primes(), &from_u64(17), DEFAULT_TAIL_WINDOW).unwrap_err();
        assert!(matches!(err, Error::Range { what: "signature", .. }));
    }

    #[test]
    fn test_hash_file_missing() {
        let err = hash_file(Path::new("/no/such/file"), &primes()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
