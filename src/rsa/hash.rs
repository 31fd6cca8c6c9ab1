// Block Hash
// Keyed iterated hash H_i = (H_{i-1} + M_i)^2 mod n over a byte stream

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use num_traits::Zero;

use super::bigint::{from_u64, sum_square_mod, RsaBigInt};
use crate::error::{Error, Result};
use crate::util::file_ops::open_for_read;

/// Seed value of the hash state before any byte is absorbed
pub const INITIAL_HASH: u64 = 100;

/// Chunk size used when streaming input
pub const HASH_BUFFER_SIZE: usize = 4096;

/// Incremental block hasher.
///
/// Bytes are absorbed strictly in the order they are fed. This is a
/// teaching hash with a tiny state space and no collision resistance.
#[derive(Debug, Clone)]
pub struct BlockHasher {
    state: RsaBigInt,
    modulus: RsaBigInt,
}

impl BlockHasher {
    /// Fails with [`Error::InvalidInput`] if the modulus is zero
    pub fn new(modulus: &RsaBigInt) -> Result<Self> {
        if modulus.is_zero() {
            return Err(Error::InvalidInput("hash modulus must be non-zero".to_string()));
        }

        Ok(Self {
            state: from_u64(INITIAL_HASH),
            modulus: modulus.clone(),
        })
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = sum_square_mod(&self.state, &RsaBigInt::from(b), &self.modulus);
        }
    }

    pub fn finalize(self) -> RsaBigInt {
        self.state
    }
}

/// Hash every byte of `reader` under `modulus`, reading in fixed-size chunks
pub fn compute_hash<R: Read>(reader: &mut R, modulus: &RsaBigInt) -> Result<RsaBigInt> {
    let mut hasher = BlockHasher::new(modulus)?;
    let mut buffer = [0u8; HASH_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..read]);
        total += read as u64;
    }

    let hash = hasher.finalize();
    tracing::trace!(bytes = total, %hash, "block hash computed");
    Ok(hash)
}

/// Hash at most `length` bytes starting at `offset`
///
/// Stops early if the stream ends before `offset + length`.
pub fn compute_hash_range<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    length: u64,
    modulus: &RsaBigInt,
) -> Result<RsaBigInt> {
    reader.seek(SeekFrom::Start(offset))?;
    compute_hash(&mut reader.by_ref().take(length), modulus)
}

/// Hash an in-memory byte slice
pub fn hash_bytes(bytes: &[u8], modulus: &RsaBigInt) -> Result<RsaBigInt> {
    let mut hasher = BlockHasher::new(modulus)?;
    hasher.update(bytes);
    Ok(hasher.finalize())
}

/// Hash the whole file at `path`
pub fn compute_file_hash(path: &Path, modulus: &RsaBigInt) -> Result<RsaBigInt> {
    let mut file = open_for_read(path)?;
    compute_hash(&mut file, modulus)
}
