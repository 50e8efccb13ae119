//! # Network Module
//!
//! Everything a node does beyond validating its own chain: holding pending
//! transactions, knowing its peers, talking to them, and producing blocks.
//!
//! ## Architecture
//!
//! ```text
//! mempool.rs   — Insertion-ordered, deduplicated pending transaction pool
//! peers.rs     — Known peers keyed by listen address
//! rpc.rs       — Handshake/Ack messages and the PeerClient transport trait
//! producer.rs  — Assembles mempool transactions into a block on the tip
//! node.rs      — Node runtime: handshake, gossip, validator loop, shutdown
//! ```
//!
//! ## Design Decisions
//!
//! - The mempool and peer table sit behind `parking_lot::RwLock`. Nothing
//!   holds either lock across an `.await`; broadcasts work from snapshots.
//! - The crate stays transport-agnostic. `PeerClient` is the only seam; the
//!   node binary implements it over HTTP and the integration tests implement
//!   it in-process.
//! - Gossip terminates because admission is idempotent: a transaction or
//!   block is relayed only the first time this node accepts it.

pub mod mempool;
pub mod node;
pub mod peers;
pub mod producer;
pub mod rpc;

pub use mempool::{Mempool, MempoolConfig, MempoolError};
pub use node::{Node, NodeConfig, NodeError};
pub use peers::PeerTable;
pub use producer::{BlockProducer, ProducedBlock, ProducerConfig};
pub use rpc::{
    Ack, NetworkError, PeerClient, Version, BLOCKS_PATH, HANDSHAKE_PATH, ORIGIN_HEADER,
    TRANSACTIONS_PATH,
};
