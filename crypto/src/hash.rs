//! SHA-256 transaction hashing and Blake2b sketch hashing.

use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};
use sha2::Sha256;
use txindex_types::{TxHash, TxResult};

type Blake2b64 = Blake2b<U8>;

/// Compute the SHA-256 digest of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash raw transaction bytes to produce their `TxHash`.
pub fn hash_transaction(tx_bytes: &[u8]) -> TxHash {
    TxHash::new(sha256(tx_bytes))
}

/// The `TxHash` a stored result is keyed by.
pub fn tx_result_hash(result: &TxResult) -> TxHash {
    hash_transaction(&result.tx)
}

/// 64-bit Blake2b digest, little-endian, used to place items in sketch registers.
pub fn blake2b_64(data: &[u8]) -> u64 {
    let mut hasher = Blake2b64::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 8];
    output.copy_from_slice(&result);
    u64::from_le_bytes(output)
}
