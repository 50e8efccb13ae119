//! # Chain
//!
//! The ledger: an append-only list of headers plus the three stores, and
//! the validation pipeline every block goes through before it touches any
//! of them.
//!
//! ## Validation Order
//!
//! First failure wins, and nothing is written until every check passes:
//!
//! 1. Merkle root matches the transactions.
//! 2. Block signature verifies under the embedded key.
//! 3. `prev_hash` is the hash of the current tip, and height is tip + 1.
//! 4. Every transaction: has inputs, every input signature verifies, every
//!    referenced UTXO exists, is unspent, hasn't already been consumed
//!    earlier in this block, and belongs to the spending key. Outputs never
//!    exceed inputs.
//!
//! ## Apply
//!
//! The UTXO changes (one output per transaction output, every input marked
//! spent) go to the store as one batch first. Then each transaction record,
//! then the block, and only then the header. If a write after the batch
//! fails, the transaction records written so far are removed and the batch
//! is reverted, so a failed apply leaves nothing behind. Validation and
//! apply happen under one write lock, so readers (which take the read lock)
//! either see the block entirely or not at all.
//!
//! There is no fork choice. A block that doesn't extend the tip is rejected.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use super::block::{Block, Header};
use super::store::{
    BlockStore, MemoryBlockStore, MemoryTxStore, MemoryUtxoStore, StoreError, TxStore, Utxo,
    UtxoStore,
};
use crate::crypto::hash::Hash32;
use crate::crypto::keys::KeyError;
use crate::transaction::{verify_signatures, Transaction, TransactionError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a block or transaction was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("merkle root does not match block transactions")]
    InvalidMerkleRoot,

    #[error("invalid block signature")]
    InvalidBlockSignature,

    #[error("prev hash mismatch: tip is {expected}, block links to {got}")]
    PrevHashMismatch { expected: String, got: String },

    #[error("height mismatch: expected {expected}, got {got}")]
    HeightMismatch { expected: u64, got: u64 },

    #[error("transaction {tx} has no inputs")]
    NoInputs { tx: String },

    #[error("transaction {tx} input {index}: {reason}")]
    InvalidTxSignature {
        tx: String,
        index: usize,
        reason: TransactionError,
    },

    #[error("transaction {tx} references unknown utxo {utxo}")]
    MissingUtxo { tx: String, utxo: String },

    #[error("transaction {tx} spends already spent utxo {utxo}")]
    DoubleSpend { tx: String, utxo: String },

    #[error("transaction {tx} spends utxo {utxo} owned by another address")]
    UnauthorizedSpend { tx: String, utxo: String },

    #[error("transaction {tx} outputs {outputs} exceed inputs {inputs}")]
    OutputsExceedInputs { tx: String, inputs: u64, outputs: u64 },

    #[error("transaction {tx} amounts overflow")]
    AmountOverflow { tx: String },
}

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("block rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("genesis key error: {0}")]
    Genesis(#[from] KeyError),

    #[error("height {height} out of range (tip is {tip})")]
    HeightOutOfRange { height: u64, tip: u64 },
}

pub type ChainResult<T> = Result<T, ChainError>;

// ---------------------------------------------------------------------------
// HeaderList
// ---------------------------------------------------------------------------

/// Headers in height order. Genesis is held apart so the list is never
/// empty and the tip always exists.
#[derive(Debug)]
struct HeaderList {
    genesis: Header,
    rest: Vec<Header>,
}

impl HeaderList {
    fn new(genesis: Header) -> Self {
        Self {
            genesis,
            rest: Vec::new(),
        }
    }

    fn push(&mut self, header: Header) {
        self.rest.push(header);
    }

    fn get(&self, height: u64) -> Option<&Header> {
        match height {
            0 => Some(&self.genesis),
            h => usize::try_from(h - 1).ok().and_then(|i| self.rest.get(i)),
        }
    }

    fn height(&self) -> u64 {
        self.rest.len() as u64
    }

    fn tip(&self) -> &Header {
        self.rest.last().unwrap_or(&self.genesis)
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// The validated ledger.
///
/// Shared behind an `Arc`; every method takes `&self`. Writers (block
/// acceptance) are serialized by the internal lock.
pub struct Chain {
    block_store: Arc<dyn BlockStore>,
    tx_store: Arc<dyn TxStore>,
    utxo_store: Arc<dyn UtxoStore>,
    headers: RwLock<HeaderList>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Create a chain over the given stores and apply genesis.
    pub fn new(
        block_store: Arc<dyn BlockStore>,
        tx_store: Arc<dyn TxStore>,
        utxo_store: Arc<dyn UtxoStore>,
    ) -> ChainResult<Self> {
        let genesis = Block::genesis()?;
        let chain = Self {
            block_store,
            tx_store,
            utxo_store,
            headers: RwLock::new(HeaderList::new(genesis.header.clone())),
        };
        chain.persist(&genesis)?;
        info!(hash = %genesis.hash_hex(), "genesis applied");
        Ok(chain)
    }

    /// A chain over fresh in-memory stores.
    pub fn in_memory() -> ChainResult<Self> {
        Self::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(MemoryTxStore::new()),
            Arc::new(MemoryUtxoStore::new()),
        )
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Height of the tip. Genesis is height 0.
    pub fn height(&self) -> u64 {
        self.headers.read().height()
    }

    pub fn tip_header(&self) -> Header {
        self.headers.read().tip().clone()
    }

    pub fn tip_hash(&self) -> Hash32 {
        self.tip_header().hash()
    }

    pub fn get_header(&self, height: u64) -> ChainResult<Header> {
        let headers = self.headers.read();
        headers
            .get(height)
            .cloned()
            .ok_or(ChainError::HeightOutOfRange {
                height,
                tip: headers.height(),
            })
    }

    pub fn get_block_by_height(&self, height: u64) -> ChainResult<Block> {
        let header = self.get_header(height)?;
        Ok(self.block_store.get(&header.hash_hex())?)
    }

    pub fn get_block_by_hash(&self, hash: &Hash32) -> ChainResult<Block> {
        let _guard = self.headers.read();
        Ok(self.block_store.get(&hex::encode(hash))?)
    }

    /// True if a block with this header hash has been accepted.
    pub fn contains_block(&self, hash: &Hash32) -> bool {
        self.get_block_by_hash(hash).is_ok()
    }

    pub fn get_transaction(&self, hash_hex: &str) -> ChainResult<Transaction> {
        let _guard = self.headers.read();
        Ok(self.tx_store.get(hash_hex)?)
    }

    pub fn get_utxo(&self, key: &str) -> ChainResult<Utxo> {
        let _guard = self.headers.read();
        Ok(self.utxo_store.get(key)?)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Validate `block` against the tip and append it. On error nothing has
    /// changed.
    pub fn add_block(&self, block: &Block) -> ChainResult<()> {
        let mut headers = self.headers.write();
        self.validate_against(&headers, block)?;
        self.apply(&mut headers, block)?;
        info!(
            height = block.height(),
            hash = %block.hash_hex(),
            txs = block.transactions.len(),
            "block added"
        );
        Ok(())
    }

    /// Build a block on the current tip and append it, all under the write
    /// lock so no other block can slip in between.
    ///
    /// `build` receives the tip header and may decline by returning `None`,
    /// in which case nothing happens. It runs while the lock is held and
    /// must not call lock-taking `Chain` methods; [`Chain::check_transaction`]
    /// is lock-free and safe to use from inside it.
    pub fn extend<F>(&self, build: F) -> ChainResult<Option<Block>>
    where
        F: FnOnce(&Header) -> Option<Block>,
    {
        let mut headers = self.headers.write();
        let Some(block) = build(headers.tip()) else {
            return Ok(None);
        };
        self.validate_against(&headers, &block)?;
        self.apply(&mut headers, &block)?;
        info!(
            height = block.height(),
            hash = %block.hash_hex(),
            txs = block.transactions.len(),
            "block produced"
        );
        Ok(Some(block))
    }

    /// Run the full validation pipeline without applying anything.
    pub fn validate_block(&self, block: &Block) -> ChainResult<()> {
        let headers = self.headers.read();
        self.validate_against(&headers, block)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    fn validate_against(&self, headers: &HeaderList, block: &Block) -> ChainResult<()> {
        if !block.verify_root() {
            return Err(ValidationError::InvalidMerkleRoot.into());
        }

        if !block.verify_signature() {
            return Err(ValidationError::InvalidBlockSignature.into());
        }

        let tip = headers.tip();
        let tip_hash = tip.hash();
        if block.header.prev_hash != tip_hash {
            return Err(ValidationError::PrevHashMismatch {
                expected: hex::encode(tip_hash),
                got: hex::encode(block.header.prev_hash),
            }
            .into());
        }
        if block.header.height != tip.height + 1 {
            return Err(ValidationError::HeightMismatch {
                expected: tip.height + 1,
                got: block.header.height,
            }
            .into());
        }

        let mut spent_in_block = HashSet::new();
        for tx in &block.transactions {
            self.check_transaction(tx, &mut spent_in_block)?;
        }

        debug!(height = block.height(), "block validated");
        Ok(())
    }

    /// Stateful check of one transaction against the committed UTXO set.
    ///
    /// `spent` collects the UTXO keys consumed so far by the block being
    /// checked; on success this transaction's inputs are added to it. Inputs
    /// can only reference outputs from earlier blocks.
    pub fn check_transaction(
        &self,
        tx: &Transaction,
        spent: &mut HashSet<String>,
    ) -> ChainResult<()> {
        let tx_hex = tx.hash_hex();

        if tx.is_coinbase() {
            return Err(ValidationError::NoInputs { tx: tx_hex }.into());
        }

        if let Err(reason) = verify_signatures(tx) {
            let index = match reason {
                TransactionError::MissingSignature { index }
                | TransactionError::InvalidSignature { index } => index,
                _ => 0,
            };
            return Err(ValidationError::InvalidTxSignature {
                tx: tx_hex,
                index,
                reason,
            }
            .into());
        }

        let mut consumed = Vec::with_capacity(tx.inputs.len());
        let mut total_in: u64 = 0;
        for input in &tx.inputs {
            let key = input.utxo_key();
            if spent.contains(&key) || consumed.contains(&key) {
                return Err(ValidationError::DoubleSpend { tx: tx_hex, utxo: key }.into());
            }
            let utxo = match self.utxo_store.get(&key) {
                Ok(utxo) => utxo,
                Err(StoreError::NotFound { .. }) => {
                    return Err(ValidationError::MissingUtxo { tx: tx_hex, utxo: key }.into())
                }
                Err(e) => return Err(e.into()),
            };
            if utxo.spent {
                return Err(ValidationError::DoubleSpend { tx: tx_hex, utxo: key }.into());
            }
            if utxo.address != input.public_key.address() {
                return Err(ValidationError::UnauthorizedSpend { tx: tx_hex, utxo: key }.into());
            }
            total_in = total_in
                .checked_add(utxo.amount)
                .ok_or_else(|| ValidationError::AmountOverflow { tx: tx_hex.clone() })?;
            consumed.push(key);
        }

        let total_out = tx
            .total_output()
            .ok_or_else(|| ValidationError::AmountOverflow { tx: tx_hex.clone() })?;
        if total_out > total_in {
            return Err(ValidationError::OutputsExceedInputs {
                tx: tx_hex,
                inputs: total_in,
                outputs: total_out,
            }
            .into());
        }

        spent.extend(consumed);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Apply
    // -----------------------------------------------------------------------

    fn apply(&self, headers: &mut HeaderList, block: &Block) -> ChainResult<()> {
        self.persist(block)?;
        headers.push(block.header.clone());
        Ok(())
    }

    /// Everything in apply except the header append.
    fn persist(&self, block: &Block) -> ChainResult<()> {
        let (created, spent) = utxo_changes(block);
        self.utxo_store.apply(&created, &spent)?;

        let mut written = Vec::with_capacity(block.transactions.len());
        if let Err(err) = self.write_records(block, &mut written) {
            self.roll_back(&written, &created, &spent);
            return Err(err.into());
        }
        Ok(())
    }

    /// Transaction records, then the block. The block goes last so it is
    /// never visible while the rest is missing.
    fn write_records(&self, block: &Block, written: &mut Vec<String>) -> Result<(), StoreError> {
        for tx in &block.transactions {
            self.tx_store.put(tx)?;
            written.push(tx.hash_hex());
        }
        self.block_store.put(block)
    }

    fn roll_back(&self, written: &[String], created: &[Utxo], spent: &[String]) {
        for hash in written {
            if let Err(err) = self.tx_store.remove(hash) {
                error!(tx = %hash, error = %err, "failed to remove transaction during rollback");
            }
        }
        if let Err(err) = self.utxo_store.revert(created, spent) {
            error!(error = %err, "failed to revert utxo batch during rollback");
        }
    }
}

/// Outputs a block creates and UTXO keys it consumes.
fn utxo_changes(block: &Block) -> (Vec<Utxo>, Vec<String>) {
    let mut created = Vec::new();
    let mut spent = Vec::new();
    for tx in &block.transactions {
        let hash = tx.hash_hex();
        for (index, output) in tx.outputs.iter().enumerate() {
            created.push(Utxo {
                hash: hash.clone(),
                out_index: index as u32,
                amount: output.amount,
                address: output.address,
                spent: false,
            });
        }
        spent.extend(tx.inputs.iter().map(|input| input.utxo_key()));
    }
    (created, spent)
}
