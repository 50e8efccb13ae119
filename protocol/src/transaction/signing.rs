//! Transaction signing with Ed25519 keys.
//!
//! Every input signs the same message: [`Transaction::signing_hash`], the
//! hash of the transaction with all signature slots blanked. Inputs can
//! therefore be signed in any order and by different keys.

use thiserror::Error;

use super::types::Transaction;
use crate::crypto::keys::PrivateKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("input index {index} out of range ({len} inputs)")]
    InputOutOfRange { index: usize, len: usize },

    #[error("input {index} is claimed by a different key")]
    KeyMismatch { index: usize },
}

/// Sign a single input.
///
/// Fails if `index` doesn't exist or the input names a different public key
/// than `key`; signing someone else's input would only produce a signature
/// that fails verification later.
pub fn sign_input(tx: &mut Transaction, index: usize, key: &PrivateKey) -> Result<(), SigningError> {
    let len = tx.inputs.len();
    let message = tx.signing_hash();
    let input = tx
        .inputs
        .get_mut(index)
        .ok_or(SigningError::InputOutOfRange { index, len })?;
    if input.public_key != key.public_key() {
        return Err(SigningError::KeyMismatch { index });
    }
    input.signature = Some(key.sign(&message));
    Ok(())
}

/// Sign every input claimed by `key`. Returns how many inputs were signed.
pub fn sign_transaction(tx: &mut Transaction, key: &PrivateKey) -> usize {
    let message = tx.signing_hash();
    let public_key = key.public_key();
    let signature = key.sign(&message);
    let mut signed = 0;
    for input in tx.inputs.iter_mut().filter(|i| i.public_key == public_key) {
        input.signature = Some(signature);
        signed += 1;
    }
    signed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::verification::verify_signatures;

    #[test]
    fn sign_sets_signature_field() {
        let key = PrivateKey::generate();
        let mut tx = TransactionBuilder::new()
            .input([1u8; 32], 0, key.public_key())
            .output(5, key.public_key().address())
            .build();

        assert!(!tx.is_signed());
        assert_eq!(sign_transaction(&mut tx, &key), 1);
        assert!(tx.is_signed());
        assert!(verify_signatures(&tx).is_ok());
    }

    #[test]
    fn signing_is_deterministic() {
        let key = PrivateKey::from_seed(&[9u8; 32]);
        let build = || {
            TransactionBuilder::new()
                .input([1u8; 32], 0, key.public_key())
                .output(5, key.public_key().address())
                .build()
        };
        let mut a = build();
        let mut b = build();
        sign_transaction(&mut a, &key);
        sign_transaction(&mut b, &key);
        assert_eq!(a, b);
    }

    #[test]
    fn multi_key_inputs_sign_independently() {
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();
        let mut tx = TransactionBuilder::new()
            .input([1u8; 32], 0, alice.public_key())
            .input([2u8; 32], 0, bob.public_key())
            .output(5, bob.public_key().address())
            .build();

        sign_input(&mut tx, 1, &bob).unwrap();
        assert!(!tx.is_signed());
        sign_input(&mut tx, 0, &alice).unwrap();
        assert!(verify_signatures(&tx).is_ok());
    }

    #[test]
    fn sign_input_rejects_foreign_key_and_bad_index() {
        let alice = PrivateKey::generate();
        let mallory = PrivateKey::generate();
        let mut tx = TransactionBuilder::new()
            .input([1u8; 32], 0, alice.public_key())
            .build();

        assert_eq!(
            sign_input(&mut tx, 0, &mallory),
            Err(SigningError::KeyMismatch { index: 0 })
        );
        assert_eq!(
            sign_input(&mut tx, 4, &alice),
            Err(SigningError::InputOutOfRange { index: 4, len: 1 })
        );
    }
}
