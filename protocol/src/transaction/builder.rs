//! Transaction construction via the builder pattern.
//!
//! The builder only assembles inputs and outputs. It never signs; that
//! happens in [`super::signing`] once every input and output is in place,
//! because any later change would alter the signing hash.

use super::types::{Transaction, TxInput, TxOutput};
use crate::config::TX_VERSION;
use crate::crypto::hash::Hash32;
use crate::crypto::keys::{Address, PublicKey};

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```
/// use blocker_protocol::crypto::PrivateKey;
/// use blocker_protocol::transaction::{sign_transaction, TransactionBuilder};
///
/// let alice = PrivateKey::generate();
/// let bob = PrivateKey::generate();
///
/// let mut tx = TransactionBuilder::new()
///     .input([0u8; 32], 0, alice.public_key())
///     .output(600, bob.public_key().address())
///     .output(400, alice.public_key().address())
///     .build();
///
/// sign_transaction(&mut tx, &alice);
/// assert!(tx.is_signed());
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    version: u32,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Overrides the format version. Only useful in tests.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Spend output `prev_out_index` of transaction `prev_tx_hash`, claimed by `owner`.
    pub fn input(mut self, prev_tx_hash: Hash32, prev_out_index: u32, owner: PublicKey) -> Self {
        self.inputs.push(TxInput {
            prev_tx_hash,
            prev_out_index,
            public_key: owner,
            signature: None,
        });
        self
    }

    /// Lock `amount` to `address`.
    pub fn output(mut self, amount: u64, address: Address) -> Self {
        self.outputs.push(TxOutput { amount, address });
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            version: self.version,
            inputs: self.inputs,
            outputs: self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrivateKey;

    #[test]
    fn builder_preserves_order() {
        let key = PrivateKey::generate();
        let addr = key.public_key().address();
        let tx = TransactionBuilder::new()
            .input([1u8; 32], 3, key.public_key())
            .input([2u8; 32], 0, key.public_key())
            .output(10, addr)
            .output(20, addr)
            .build();

        assert_eq!(tx.version, TX_VERSION);
        assert_eq!(tx.inputs[0].prev_out_index, 3);
        assert_eq!(tx.inputs[1].prev_tx_hash, [2u8; 32]);
        assert_eq!(tx.outputs.iter().map(|o| o.amount).collect::<Vec<_>>(), vec![10, 20]);
        assert!(!tx.is_signed());
    }

    #[test]
    fn version_participates_in_hash() {
        let key = PrivateKey::from_seed(&[3u8; 32]);
        let build = |v| {
            TransactionBuilder::new()
                .version(v)
                .input([0u8; 32], 0, key.public_key())
                .build()
        };
        assert_ne!(build(1).hash(), build(2).hash());
    }
}
