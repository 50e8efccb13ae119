//! Core transaction types and their canonical byte encoding.
//!
//! A [`Transaction`] consumes previously created outputs ([`TxInput`]) and
//! creates new ones ([`TxOutput`]). There are no accounts and no balances,
//! only unspent outputs.
//!
//! ## Canonical Byte Format
//!
//! All integers little-endian, fields in this exact order:
//!
//! ```text
//! version u32 | n_inputs u32 | inputs... | n_outputs u32 | outputs...
//!
//! input  = prev_tx_hash [32] | prev_out_index u32 | public_key [32]
//!          | sig_flag u8 | signature [64] (only if sig_flag == 1)
//! output = amount u64 | address [20]
//! ```
//!
//! serde/JSON is never used for hashing. JSON is a transport detail and
//! its field ordering is not something consensus should depend on.

use serde::{Deserialize, Serialize};

use crate::config::TX_VERSION;
use crate::crypto::hash::{sha256, Hash32};
use crate::crypto::keys::{Address, PublicKey, Signature};
use crate::crypto::merkle::Hashable;

// ---------------------------------------------------------------------------
// TxInput / TxOutput
// ---------------------------------------------------------------------------

/// A reference to an earlier output, plus the key that claims it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Hash of the transaction that created the output being spent.
    #[serde(with = "hex::serde")]
    pub prev_tx_hash: Hash32,
    /// Position of that output in its transaction.
    pub prev_out_index: u32,
    /// Key whose address must own the referenced output.
    pub public_key: PublicKey,
    /// Signature over [`Transaction::signing_hash`]. `None` until signed.
    pub signature: Option<Signature>,
}

impl TxInput {
    /// Key of the UTXO this input consumes, `"<txHashHex>_<outIndex>"`.
    pub fn utxo_key(&self) -> String {
        crate::storage::store::utxo_key(&self.prev_tx_hash, self.prev_out_index)
    }
}

/// An amount locked to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    pub address: Address,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A UTXO transaction.
///
/// Two hashes matter:
///
/// - [`hash`](Self::hash) covers everything including signatures. It is the
///   identity used by the tx store, the mempool and UTXO keys.
/// - [`signing_hash`](Self::signing_hash) blanks every input signature first.
///   It is the message each input signs, so adding one signature never
///   invalidates another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: TX_VERSION,
            inputs,
            outputs,
        }
    }

    /// Canonical encoding with signatures as they currently are.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.encode(true)
    }

    /// Canonical encoding with every signature slot blanked.
    pub fn signable_bytes(&self) -> Vec<u8> {
        self.encode(false)
    }

    fn encode(&self, with_signatures: bool) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + self.inputs.len() * 133 + self.outputs.len() * 28);

        buf.extend_from_slice(&self.version.to_le_bytes());

        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.prev_tx_hash);
            buf.extend_from_slice(&input.prev_out_index.to_le_bytes());
            buf.extend_from_slice(input.public_key.as_bytes());
            match (&input.signature, with_signatures) {
                (Some(sig), true) => {
                    buf.push(0x01);
                    buf.extend_from_slice(sig.as_bytes());
                }
                _ => buf.push(0x00),
            }
        }

        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(&output.amount.to_le_bytes());
            buf.extend_from_slice(output.address.as_bytes());
        }

        buf
    }

    /// SHA-256 of the full canonical encoding.
    pub fn hash(&self) -> Hash32 {
        sha256(&self.canonical_bytes())
    }

    /// SHA-256 of the encoding with signatures blanked.
    pub fn signing_hash(&self) -> Hash32 {
        sha256(&self.signable_bytes())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// Sum of all output amounts, or `None` on overflow.
    pub fn total_output(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.amount))
    }

    /// True once every input carries a signature.
    pub fn is_signed(&self) -> bool {
        self.inputs.iter().all(|input| input.signature.is_some())
    }

    /// A transaction with no inputs can only be a genesis allocation.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl Hashable for Transaction {
    fn hash(&self) -> Hash32 {
        Transaction::hash(self)
    }
}
