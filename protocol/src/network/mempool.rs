//! Pending transaction pool.
//!
//! Transactions wait here between submission and block inclusion. The pool
//! deduplicates by transaction hash and remembers insertion order so blocks
//! are assembled first-come first-served.
//!
//! ## Design
//!
//! - One `parking_lot::RwLock` around the index and the order list. `has` and
//!   `len` take the read side; everything that mutates takes the write side.
//! - `clear` drains under a single write lock, so a transaction is either in
//!   the returned batch or still in the pool, never both and never lost.
//! - Admission does no chain lookups. Signatures are checked by the node
//!   before `add`; spendability is decided at block assembly.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use parking_lot::RwLock;
use thiserror::Error;

use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MempoolConfig {
    /// Maximum number of transactions the pool will hold.
    pub max_size: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { max_size: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    #[error("transaction already exists in mempool")]
    Duplicate,

    #[error("mempool is full ({size} transactions)")]
    Full { size: usize },
}

// ---------------------------------------------------------------------------
// Mempool
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    by_hash: HashMap<String, Transaction>,
    order: VecDeque<String>,
}

/// A thread-safe, insertion-ordered transaction pool.
pub struct Mempool {
    inner: RwLock<Inner>,
    config: MempoolConfig,
}

impl fmt::Debug for Mempool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mempool")
            .field("size", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(MempoolConfig::default())
    }
}

impl Mempool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    /// Insert `tx` unless an identical transaction is already pooled or the
    /// pool is full.
    pub fn try_add(&self, tx: Transaction) -> Result<(), MempoolError> {
        let hash = tx.hash_hex();
        let mut inner = self.inner.write();
        if inner.by_hash.contains_key(&hash) {
            return Err(MempoolError::Duplicate);
        }
        if inner.by_hash.len() >= self.config.max_size {
            return Err(MempoolError::Full {
                size: inner.by_hash.len(),
            });
        }
        inner.order.push_back(hash.clone());
        inner.by_hash.insert(hash, tx);
        Ok(())
    }

    /// Insert `tx`. Returns `true` only the first time a given transaction
    /// is seen; the check and the insert are one atomic step.
    pub fn add(&self, tx: Transaction) -> bool {
        self.try_add(tx).is_ok()
    }

    pub fn has(&self, tx: &Transaction) -> bool {
        self.contains(&tx.hash_hex())
    }

    pub fn contains(&self, hash_hex: &str) -> bool {
        self.inner.read().by_hash.contains_key(hash_hex)
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every pooled transaction in insertion order.
    pub fn clear(&self) -> Vec<Transaction> {
        let mut inner = self.inner.write();
        let Inner { by_hash, order } = &mut *inner;
        let drained = order
            .drain(..)
            .filter_map(|hash| by_hash.remove(&hash))
            .collect();
        by_hash.clear();
        drained
    }

    /// Remove and return up to `max` of the oldest transactions.
    pub fn take(&self, max: usize) -> Vec<Transaction> {
        let mut inner = self.inner.write();
        let Inner { by_hash, order } = &mut *inner;
        let n = max.min(order.len());
        order
            .drain(..n)
            .filter_map(|hash| by_hash.remove(&hash))
            .collect()
    }

    /// Drop a transaction, typically because a block included it.
    pub fn remove(&self, hash_hex: &str) -> Option<Transaction> {
        let mut inner = self.inner.write();
        let tx = inner.by_hash.remove(hash_hex)?;
        inner.order.retain(|h| h != hash_hex);
        Some(tx)
    }

    /// Drop every transaction in `txs` that is pooled.
    pub fn remove_all<'a, I>(&self, txs: I) -> usize
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let hashes: Vec<String> = txs.into_iter().map(Transaction::hash_hex).collect();
        let mut inner = self.inner.write();
        let before = inner.by_hash.len();
        for hash in &hashes {
            inner.by_hash.remove(hash);
        }
        let Inner { by_hash, order } = &mut *inner;
        order.retain(|h| by_hash.contains_key(h));
        before - by_hash.len()
    }
}
