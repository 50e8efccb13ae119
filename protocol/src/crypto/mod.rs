//! # Cryptographic Primitives
//!
//! Everything security-related in Blocker flows through here: Ed25519 keys
//! and signatures, SHA-256 hashing, and the Merkle tree that ties a block's
//! transactions to its header.
//!
//! All of it is a thin, typed wrapper around audited crates
//! (`ed25519-dalek`, `sha2`). Nothing in this module invents cryptography.

pub mod hash;
pub mod keys;
pub mod merkle;
pub mod signatures;

pub use hash::{sha256, Hash32, ZERO_HASH};
pub use keys::{Address, KeyError, PrivateKey, PublicKey, Signature};
pub use merkle::{merkle_root, Hashable, MerkleTree};
pub use signatures::{sign, verify};
