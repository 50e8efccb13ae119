//! # Block Production Pipeline
//!
//! Turns whatever is sitting in the mempool into a signed block on the tip.
//!
//! ```text
//! 1. SELECT   — Take up to `max_txs` of the oldest pooled transactions
//! 2. FILTER   — Check each against the UTXO set; drop failures
//! 3. BUILD    — Merkle root, header, signature
//! 4. COMMIT   — Run the normal block validation and append to the chain
//! ```
//!
//! Steps 2 to 4 run inside [`Chain::extend`], under the chain's write lock,
//! so the filter and the final validation see the same UTXO set and a
//! surviving transaction can't be invalidated by an inbound block in
//! between.
//!
//! Failed transactions are dropped, not retried. A transaction that spends
//! an unknown or already spent output won't become valid by waiting, and
//! keeping it around would only make every future round re-check it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::MAX_BLOCK_TRANSACTIONS;
use crate::crypto::keys::PrivateKey;
use crate::network::mempool::Mempool;
use crate::storage::{Block, Chain, ChainError};
use crate::transaction::Transaction;

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Upper bound on transactions per block.
    pub max_txs: usize,
    /// Produce a block even when no transaction survives selection.
    pub produce_empty_blocks: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_txs: MAX_BLOCK_TRANSACTIONS,
            produce_empty_blocks: false,
        }
    }
}

/// A block the producer appended, and what it left out.
#[derive(Debug, Clone)]
pub struct ProducedBlock {
    pub block: Block,
    /// Candidates that failed the UTXO check and were discarded.
    pub dropped: Vec<(Transaction, ChainError)>,
}

pub struct BlockProducer {
    chain: Arc<Chain>,
    mempool: Arc<Mempool>,
    key: PrivateKey,
    config: ProducerConfig,
}

impl fmt::Debug for BlockProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockProducer")
            .field("validator", &self.key.public_key())
            .field("config", &self.config)
            .finish()
    }
}

impl BlockProducer {
    pub fn new(
        chain: Arc<Chain>,
        mempool: Arc<Mempool>,
        key: PrivateKey,
        config: ProducerConfig,
    ) -> Self {
        Self {
            chain,
            mempool,
            key,
            config,
        }
    }

    /// Run one production round.
    ///
    /// Returns `Ok(None)` when there was nothing worth putting in a block.
    /// If the chain refuses the assembled block the surviving transactions
    /// go back into the mempool and the error is returned.
    pub fn produce_block(&self) -> Result<Option<ProducedBlock>, ChainError> {
        let candidates = self.mempool.take(self.config.max_txs);
        if candidates.is_empty() && !self.config.produce_empty_blocks {
            return Ok(None);
        }

        let mut dropped = Vec::new();
        let mut included = Vec::new();
        let timestamp = Utc::now().timestamp();

        let result = self.chain.extend(|tip| {
            let mut spent = HashSet::new();
            for tx in candidates {
                match self.chain.check_transaction(&tx, &mut spent) {
                    Ok(()) => included.push(tx),
                    Err(err) => {
                        debug!(tx = %tx.hash_hex(), error = %err, "dropping transaction");
                        dropped.push((tx, err));
                    }
                }
            }
            if included.is_empty() && !self.config.produce_empty_blocks {
                return None;
            }
            Some(Block::build(tip, included.clone(), timestamp, &self.key))
        });

        match result {
            Ok(Some(block)) => Ok(Some(ProducedBlock { block, dropped })),
            Ok(None) => Ok(None),
            Err(err) => {
                for tx in included {
                    self.mempool.add(tx);
                }
                Err(err)
            }
        }
    }

    pub fn validator(&self) -> crate::crypto::keys::PublicKey {
        self.key.public_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::Hash32;
    use crate::storage::genesis_key;
    use crate::transaction::{sign_transaction, TransactionBuilder};

    fn setup(produce_empty_blocks: bool) -> (BlockProducer, Arc<Chain>, Arc<Mempool>) {
        let chain = Arc::new(Chain::in_memory().unwrap());
        let mempool = Arc::new(Mempool::default());
        let producer = BlockProducer::new(
            Arc::clone(&chain),
            Arc::clone(&mempool),
            PrivateKey::generate(),
            ProducerConfig {
                produce_empty_blocks,
                ..ProducerConfig::default()
            },
        );
        (producer, chain, mempool)
    }

    fn genesis_tx(chain: &Chain) -> Hash32 {
        chain.get_block_by_height(0).unwrap().transactions[0].hash()
    }

    fn pay(from: &PrivateKey, prev: Hash32, amount: u64, to: &PrivateKey) -> Transaction {
        let mut tx = TransactionBuilder::new()
            .input(prev, 0, from.public_key())
            .output(amount, to.public_key().address())
            .build();
        sign_transaction(&mut tx, from);
        tx
    }

    #[test]
    fn empty_mempool_skips_block() {
        let (producer, chain, _) = setup(false);
        assert!(producer.produce_block().unwrap().is_none());
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn empty_blocks_when_enabled() {
        let (producer, chain, _) = setup(true);
        let produced = producer.produce_block().unwrap().unwrap();
        assert!(produced.block.transactions.is_empty());
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn produce_block_with_transfer() {
        let (producer, chain, mempool) = setup(false);
        let god = genesis_key().unwrap();
        let alice = PrivateKey::generate();
        mempool.add(pay(&god, genesis_tx(&chain), 1000, &alice));

        let produced = producer.produce_block().unwrap().unwrap();
        assert_eq!(produced.block.transactions.len(), 1);
        assert!(produced.dropped.is_empty());
        assert_eq!(chain.height(), 1);
        assert!(mempool.is_empty());
        assert_eq!(produced.block.public_key, producer.validator());
    }

    #[test]
    fn conflicting_spend_is_dropped() {
        let (producer, chain, mempool) = setup(false);
        let god = genesis_key().unwrap();
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();
        let prev = genesis_tx(&chain);
        mempool.add(pay(&god, prev, 1000, &alice));
        mempool.add(pay(&god, prev, 1000, &bob));

        let produced = producer.produce_block().unwrap().unwrap();
        assert_eq!(produced.block.transactions.len(), 1);
        assert_eq!(produced.dropped.len(), 1);
        assert_eq!(
            produced.block.transactions[0].outputs[0].address,
            alice.public_key().address()
        );
    }

    #[test]
    fn all_invalid_means_no_block() {
        let (producer, chain, mempool) = setup(false);
        let thief = PrivateKey::generate();
        mempool.add(pay(&thief, genesis_tx(&chain), 1000, &thief));

        assert!(producer.produce_block().unwrap().is_none());
        assert_eq!(chain.height(), 0);
        assert!(mempool.is_empty());
    }

    #[test]
    fn respects_max_txs() {
        let (mut producer, chain, mempool) = setup(false);
        producer.config.max_txs = 1;
        let god = genesis_key().unwrap();
        let prev = genesis_tx(&chain);
        mempool.add(pay(&god, prev, 10, &god));
        mempool.add(pay(&god, prev, 20, &god));

        let produced = producer.produce_block().unwrap().unwrap();
        assert_eq!(produced.block.transactions.len(), 1);
        assert_eq!(mempool.len(), 1);
    }
}
