//! Stateless transaction verification.
//!
//! These checks need nothing but the transaction itself, which is why the
//! node runs them on submission before a transaction ever reaches the
//! mempool. Whether the referenced outputs exist and are unspent is a chain
//! question and lives in [`crate::storage::chain`].

use thiserror::Error;

use super::types::Transaction;

/// Reasons a transaction fails stateless verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("input {index} is unsigned")]
    MissingSignature { index: usize },

    #[error("input {index} signature does not verify")]
    InvalidSignature { index: usize },

    #[error("output amounts overflow u64")]
    AmountOverflow,
}

/// Check every input's signature against the transaction's signing hash.
///
/// A transaction without inputs trivially passes; that case is only legal
/// for genesis and is rejected by [`verify_transaction`].
pub fn verify_signatures(tx: &Transaction) -> Result<(), TransactionError> {
    let message = tx.signing_hash();
    for (index, input) in tx.inputs.iter().enumerate() {
        let signature = input
            .signature
            .as_ref()
            .ok_or(TransactionError::MissingSignature { index })?;
        if !input.public_key.verify(&message, signature) {
            return Err(TransactionError::InvalidSignature { index });
        }
    }
    Ok(())
}

/// Full stateless check for a user-submitted transaction: it must spend
/// something, its outputs must sum without overflow, and every input must be
/// validly signed.
pub fn verify_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() {
        return Err(TransactionError::NoInputs);
    }
    if tx.total_output().is_none() {
        return Err(TransactionError::AmountOverflow);
    }
    verify_signatures(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrivateKey;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::signing::sign_transaction;

    fn signed(key: &PrivateKey) -> Transaction {
        let mut tx = TransactionBuilder::new()
            .input([4u8; 32], 1, key.public_key())
            .output(10, key.public_key().address())
            .build();
        sign_transaction(&mut tx, key);
        tx
    }

    #[test]
    fn valid_transaction_passes() {
        let key = PrivateKey::generate();
        assert_eq!(verify_transaction(&signed(&key)), Ok(()));
    }

    #[test]
    fn unsigned_input_rejected() {
        let key = PrivateKey::generate();
        let mut tx = signed(&key);
        tx.inputs[0].signature = None;
        assert_eq!(
            verify_signatures(&tx),
            Err(TransactionError::MissingSignature { index: 0 })
        );
    }

    #[test]
    fn tampered_output_invalidates_signature() {
        let key = PrivateKey::generate();
        let mut tx = signed(&key);
        tx.outputs[0].amount = 11;
        assert_eq!(
            verify_signatures(&tx),
            Err(TransactionError::InvalidSignature { index: 0 })
        );
    }

    #[test]
    fn signature_by_another_key_rejected() {
        let owner = PrivateKey::generate();
        let thief = PrivateKey::generate();
        let mut tx = signed(&owner);
        let forged = thief.sign(&tx.signing_hash());
        tx.inputs[0].signature = Some(forged);
        assert!(verify_signatures(&tx).is_err());
    }

    #[test]
    fn no_inputs_rejected() {
        let key = PrivateKey::generate();
        let tx = TransactionBuilder::new()
            .output(1, key.public_key().address())
            .build();
        assert_eq!(verify_transaction(&tx), Err(TransactionError::NoInputs));
    }

    #[test]
    fn overflowing_outputs_rejected() {
        let key = PrivateKey::generate();
        let mut tx = TransactionBuilder::new()
            .input([4u8; 32], 1, key.public_key())
            .output(u64::MAX, key.public_key().address())
            .output(1, key.public_key().address())
            .build();
        sign_transaction(&mut tx, &key);
        assert_eq!(verify_transaction(&tx), Err(TransactionError::AmountOverflow));
    }
}
