//! # Key Management
//!
//! Ed25519 keys, signatures and addresses for Blocker.
//!
//! Every value here is a fixed-length byte string with a strict parser: a
//! slice of the wrong length is rejected with [`KeyError::InvalidLength`],
//! never truncated or padded. On the JSON wire all of them travel as hex
//! strings and go through the same length checks when decoded.
//!
//! ## Addresses
//!
//! An [`Address`] is the last 20 bytes of the 32-byte public key. It is a
//! plain projection, not a hash, so it is one-way only in the sense that the
//! first 12 bytes are gone.
//!
//! Key bytes are never logged. `Debug` on [`PrivateKey`] prints the public
//! half only.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{ADDRESS_LENGTH, PUBLIC_KEY_LENGTH, SEED_LENGTH, SIGNATURE_LENGTH};

/// Errors produced when parsing key material from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid {what} length: expected {expected} bytes, got {got}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for KeyError {
    fn from(err: hex::FromHexError) -> Self {
        KeyError::InvalidHex(err.to_string())
    }
}

/// Copies `slice` into a fixed array, refusing anything that isn't exactly `N` bytes.
fn fixed<const N: usize>(what: &'static str, slice: &[u8]) -> Result<[u8; N], KeyError> {
    slice.try_into().map_err(|_| KeyError::InvalidLength {
        what,
        expected: N,
        got: slice.len(),
    })
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// An Ed25519 signing key.
///
/// Deliberately not `Serialize`. Exporting a secret should be an explicit
/// call to [`PrivateKey::seed_bytes`], not a side effect of putting a struct
/// into a JSON response.
///
/// # Examples
///
/// ```
/// use blocker_protocol::crypto::keys::PrivateKey;
///
/// let key = PrivateKey::generate();
/// let sig = key.sign(b"send 10 to bob");
/// assert!(key.public_key().verify(b"send 10 to bob", &sig));
/// ```
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Derive a key deterministically from a 32-byte seed.
    ///
    /// The same seed always yields the same key pair. This is how the
    /// genesis key and configured validator keys are loaded.
    pub fn from_seed(seed: &[u8; SEED_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte seed.
    pub fn from_seed_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim())?;
        Self::try_from(bytes.as_slice())
    }

    /// The public half of this key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign an arbitrary message. Ed25519 is deterministic, so the same
    /// (key, message) pair always yields the same signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Raw seed bytes. Handle with care.
    pub fn seed_bytes(&self) -> [u8; SEED_LENGTH] {
        self.signing_key.to_bytes()
    }
}

impl TryFrom<&[u8]> for PrivateKey {
    type Error = KeyError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let seed = fixed::<SEED_LENGTH>("seed", slice)?;
        Ok(Self::from_seed(&seed))
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// An Ed25519 verifying key, 32 bytes.
///
/// Construction only checks the length. Whether the bytes decode to a curve
/// point is decided at verification time, where a bad point simply fails.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey {
    bytes: [u8; PUBLIC_KEY_LENGTH],
}

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.bytes
    }

    /// The address owned by this key: its last 20 bytes.
    pub fn address(&self) -> Address {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&self.bytes[PUBLIC_KEY_LENGTH - ADDRESS_LENGTH..]);
        Address { bytes }
    }

    /// Check `signature` over `message`. Never panics: a key that is not a
    /// valid curve point just returns `false`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify(message, &sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        Self::try_from(hex::decode(s)?.as_slice())
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self {
            bytes: fixed("public key", slice)?,
        })
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// An Ed25519 signature, always exactly 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        Self::try_from(hex::decode(s)?.as_slice())
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = KeyError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self {
            bytes: fixed("signature", slice)?,
        })
    }
}

impl TryFrom<String> for Signature {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_hex()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address. See [`PublicKey::address`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    bytes: [u8; ADDRESS_LENGTH],
}

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        Self::try_from(hex::decode(s)?.as_slice())
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = KeyError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self {
            bytes: fixed("address", slice)?,
        })
    }
}

impl TryFrom<String> for Address {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_hex()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}
