//! # Hashing
//!
//! SHA-256 is the only hash function in Blocker. Transaction identities,
//! header hashes and Merkle nodes are all plain SHA-256 over the canonical
//! byte encoding.

use sha2::{Digest, Sha256};

use crate::config::HASH_LENGTH;

/// A 32-byte SHA-256 digest.
pub type Hash32 = [u8; HASH_LENGTH];

/// The all-zero hash. Used as `prev_hash` of genesis and as the root of a
/// block with no transactions.
pub const ZERO_HASH: Hash32 = [0u8; HASH_LENGTH];

/// SHA-256 of `data`.
///
/// ```
/// use blocker_protocol::crypto::sha256;
///
/// assert_eq!(sha256(b"blocker").len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of `left ++ right`, without allocating the concatenation.
pub fn sha256_pair(left: &[u8], right: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // NIST test vector for "abc".
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_pair_matches_concatenation() {
        let mut joined = b"left".to_vec();
        joined.extend_from_slice(b"right");
        assert_eq!(sha256_pair(b"left", b"right"), sha256(&joined));
    }

    #[test]
    fn test_pair_is_order_sensitive() {
        assert_ne!(sha256_pair(b"a", b"b"), sha256_pair(b"b", b"a"));
    }
}
