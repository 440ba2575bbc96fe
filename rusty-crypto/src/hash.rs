//! Hashing algorithms for Rusty Coin.

use ripemd::Ripemd160;
use rusty_shared_types::{Hash, PubKeyHash};
use sha2::{Digest, Sha256};

/// Calculate SHA256 hash of input data
pub fn calculate_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA256 applied twice. Used as the checksum of on-disk snapshots.
pub fn double_sha256(data: &[u8]) -> Hash {
    calculate_sha256(&calculate_sha256(data))
}

/// RIPEMD160(SHA256(data)), the key hash committed to by P2PKH scripts.
pub fn hash160(data: &[u8]) -> PubKeyHash {
    let sha = calculate_sha256(data);
    let mut hasher = Ripemd160::new();
    hasher.update(sha);
    hasher.finalize().into()
}

/// BLAKE3 digest, used for content identities (vote hashes, inventory keys).
pub fn blake3_hash(data: &[u8]) -> Hash {
    blake3::hash(data).into()
}
