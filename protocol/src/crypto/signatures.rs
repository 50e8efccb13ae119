//! # Digital Signatures
//!
//! Free-function facade over Ed25519 signing. Blocks and transaction inputs
//! are both signed through here, so there is exactly one place to look when
//! auditing what gets signed and how.
//!
//! `verify` returns a boolean. Callers never need to know *why* a signature
//! failed, only that it did.

use super::keys::{PrivateKey, PublicKey, Signature};

/// Sign `message` with `key`.
///
/// ```
/// use blocker_protocol::crypto::{sign, verify, PrivateKey};
///
/// let key = PrivateKey::generate();
/// let sig = sign(&key, b"block header bytes");
/// assert!(verify(&sig, b"block header bytes", &key.public_key()));
/// ```
pub fn sign(key: &PrivateKey, message: &[u8]) -> Signature {
    key.sign(message)
}

/// Verify `signature` over `message` under `public_key`.
pub fn verify(signature: &Signature, message: &[u8], public_key: &PublicKey) -> bool {
    public_key.verify(message, signature)
}

/// Verify a batch of `(signature, message, key)` triples. True only if every
/// one of them verifies; an empty batch is trivially valid.
pub fn verify_all<'a, I>(items: I) -> bool
where
    I: IntoIterator<Item = (&'a Signature, &'a [u8], &'a PublicKey)>,
{
    items
        .into_iter()
        .all(|(sig, msg, key)| verify(sig, msg, key))
}
