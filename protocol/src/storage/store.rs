//! # Stores
//!
//! Key-value interfaces for blocks, transactions and unspent outputs, plus
//! in-memory implementations backed by [`DashMap`].
//!
//! | Store        | Key                        | Value          |
//! |--------------|----------------------------|----------------|
//! | `BlockStore` | block hash (hex)           | [`Block`]      |
//! | `TxStore`    | tx hash (hex)              | [`Transaction`]|
//! | `UtxoStore`  | `"<txHashHex>_<outIndex>"` | [`Utxo`]       |
//!
//! Stores know nothing about validation. The [`Chain`](super::chain::Chain)
//! serializes all writes; the stores only have to give read-your-writes
//! and tolerate concurrent puts to different keys, both of which `DashMap`
//! provides for free.
//!
//! A block's UTXO changes go through [`UtxoStore::apply`] as one batch, and
//! the chain undoes a batch with [`UtxoStore::revert`] (plus
//! [`TxStore::remove`]) when a later write for the same block fails.

use std::collections::HashSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::block::Block;
use crate::crypto::hash::Hash32;
use crate::crypto::keys::Address;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("utxo already spent: {0}")]
    AlreadySpent(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Utxo
// ---------------------------------------------------------------------------

/// An output created by an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Hex hash of the transaction that created this output.
    pub hash: String,
    pub out_index: u32,
    pub amount: u64,
    /// Owner. Only a key whose address matches may spend it.
    pub address: Address,
    pub spent: bool,
}

impl Utxo {
    pub fn key(&self) -> String {
        format!("{}_{}", self.hash, self.out_index)
    }
}

/// UTXO key for output `index` of the transaction hashing to `tx_hash`.
pub fn utxo_key(tx_hash: &Hash32, index: u32) -> String {
    format!("{}_{}", hex::encode(tx_hash), index)
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait BlockStore: Send + Sync {
    fn put(&self, block: &Block) -> StoreResult<()>;
    fn get(&self, hash_hex: &str) -> StoreResult<Block>;
}

pub trait TxStore: Send + Sync {
    fn put(&self, tx: &Transaction) -> StoreResult<()>;
    fn get(&self, hash_hex: &str) -> StoreResult<Transaction>;
    /// Drop a record. Removing a missing key is not an error.
    fn remove(&self, hash_hex: &str) -> StoreResult<()>;
}

pub trait UtxoStore: Send + Sync {
    fn put(&self, utxo: &Utxo) -> StoreResult<()>;
    fn get(&self, key: &str) -> StoreResult<Utxo>;
    /// Flip `spent` on an existing, currently unspent entry.
    fn mark_spent(&self, key: &str) -> StoreResult<()>;

    /// Insert `created` and mark every key in `spent` spent, all or nothing.
    /// On error the store is unchanged.
    fn apply(&self, created: &[Utxo], spent: &[String]) -> StoreResult<()>;

    /// Undo a successful [`apply`](UtxoStore::apply) of the same batch.
    fn revert(&self, created: &[Utxo], spent: &[String]) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: DashMap<String, Block>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, block: &Block) -> StoreResult<()> {
        self.blocks.insert(block.hash_hex(), block.clone());
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> StoreResult<Block> {
        self.blocks
            .get(hash_hex)
            .map(|b| b.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: "block",
                key: hash_hex.to_string(),
            })
    }
}

#[derive(Debug, Default)]
pub struct MemoryTxStore {
    txs: DashMap<String, Transaction>,
}

impl MemoryTxStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

impl TxStore for MemoryTxStore {
    fn put(&self, tx: &Transaction) -> StoreResult<()> {
        self.txs.insert(tx.hash_hex(), tx.clone());
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> StoreResult<Transaction> {
        self.txs
            .get(hash_hex)
            .map(|t| t.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: "transaction",
                key: hash_hex.to_string(),
            })
    }

    fn remove(&self, hash_hex: &str) -> StoreResult<()> {
        self.txs.remove(hash_hex);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUtxoStore {
    utxos: DashMap<String, Utxo>,
}

impl MemoryUtxoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

impl UtxoStore for MemoryUtxoStore {
    fn put(&self, utxo: &Utxo) -> StoreResult<()> {
        self.utxos.insert(utxo.key(), utxo.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Utxo> {
        self.utxos
            .get(key)
            .map(|u| u.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: "utxo",
                key: key.to_string(),
            })
    }

    fn mark_spent(&self, key: &str) -> StoreResult<()> {
        match self.utxos.entry(key.to_string()) {
            Entry::Occupied(e) if e.get().spent => Err(StoreError::AlreadySpent(key.to_string())),
            Entry::Occupied(mut e) => {
                e.get_mut().spent = true;
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::NotFound {
                kind: "utxo",
                key: key.to_string(),
            }),
        }
    }

    fn apply(&self, created: &[Utxo], spent: &[String]) -> StoreResult<()> {
        // Check every spend before touching the map. The chain holds its
        // write lock across the call, so nothing changes in between.
        let mut seen = HashSet::with_capacity(spent.len());
        for key in spent {
            if !seen.insert(key.as_str()) {
                return Err(StoreError::AlreadySpent(key.clone()));
            }
            match self.utxos.get(key) {
                Some(utxo) if utxo.spent => return Err(StoreError::AlreadySpent(key.clone())),
                Some(_) => {}
                None => {
                    return Err(StoreError::NotFound {
                        kind: "utxo",
                        key: key.clone(),
                    })
                }
            }
        }

        for utxo in created {
            self.utxos.insert(utxo.key(), utxo.clone());
        }
        for key in spent {
            if let Some(mut utxo) = self.utxos.get_mut(key) {
                utxo.spent = true;
            }
        }
        Ok(())
    }

    fn revert(&self, created: &[Utxo], spent: &[String]) -> StoreResult<()> {
        for key in spent {
            if let Some(mut utxo) = self.utxos.get_mut(key) {
                utxo.spent = false;
            }
        }
        for utxo in created {
            self.utxos.remove(&utxo.key());
        }
        Ok(())
    }
}
