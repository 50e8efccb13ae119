//! # Storage Module
//!
//! Blocks, the stores that hold them, and the chain that decides what gets
//! stored.
//!
//! ## Architecture
//!
//! ```text
//! block.rs  — Header/Block, canonical header hash, genesis, signing
//! store.rs  — BlockStore/TxStore/UtxoStore traits + in-memory DashMap impls
//! chain.rs  — Header list, validation pipeline, atomic apply
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! Block → Chain::add_block → validate → BlockStore
//!                                     → TxStore
//!                                     → UtxoStore (new outputs, spent inputs)
//!                                     → HeaderList (last)
//! ```
//!
//! Only in-memory stores ship here. The traits are the seam for anything
//! persistent.

pub mod block;
pub mod chain;
pub mod store;

pub use block::{compute_root, genesis_key, Block, Header};
pub use chain::{Chain, ChainError, ChainResult, ValidationError};
pub use store::{
    utxo_key, BlockStore, MemoryBlockStore, MemoryTxStore, MemoryUtxoStore, StoreError, TxStore,
    Utxo, UtxoStore,
};
