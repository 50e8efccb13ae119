//! # Node
//!
//! The runtime of one network participant. It owns the chain, the mempool
//! and the peer table, answers the three peer endpoints, and (when it holds
//! a signing key) drives the validator loop.
//!
//! ```text
//! Node::new() -> start() -> [serving, gossiping, validating] -> shutdown().await
//! ```
//!
//! ## Gossip
//!
//! - **Peers**: a handshake adds the caller to our table. If the caller
//!   advertises addresses we don't know yet, a background bootstrap dials
//!   them, which is how one well-known address is enough to find everyone.
//! - **Transactions**: admitted to the mempool once, and on that first
//!   admission relayed to every peer except the one it came from. Duplicates
//!   are acknowledged and go no further.
//! - **Blocks**: validated and appended, then relayed the same way. Blocks
//!   we already have are acknowledged silently, which is what stops the
//!   flood.
//!
//! ## Tasks
//!
//! Everything that runs in the background (bootstrap dials, broadcasts,
//! the validator loop) lives in one `JoinSet` owned by the node, and the
//! periodic work also watches a shutdown channel. `shutdown()` flips the
//! channel, aborts the set and waits for it to drain. Every outbound call is
//! bounded by `rpc_timeout`, so one dead peer costs at most that much.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config;
use crate::crypto::keys::PrivateKey;
use crate::network::mempool::{Mempool, MempoolConfig, MempoolError};
use crate::network::peers::PeerTable;
use crate::network::producer::{BlockProducer, ProducerConfig};
use crate::network::rpc::{Ack, NetworkError, PeerClient, Version};
use crate::storage::{Block, Chain, ChainError};
use crate::transaction::{verify_transaction, Transaction, TransactionError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Version string sent in handshakes.
    pub version: String,
    /// Address peers use to reach us. Also our identity in their tables.
    pub listen_addr: String,
    /// Signing key. `Some` makes this node a validator.
    pub validator_key: Option<PrivateKey>,
    /// Addresses dialed once on start.
    pub bootstrap_nodes: Vec<String>,
    pub block_interval: Duration,
    pub rpc_timeout: Duration,
    pub produce_empty_blocks: bool,
    pub max_block_txs: usize,
    pub mempool: MempoolConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            version: config::PROTOCOL_VERSION.to_string(),
            listen_addr: "127.0.0.1:3000".to_string(),
            validator_key: None,
            bootstrap_nodes: Vec::new(),
            block_interval: config::BLOCK_INTERVAL,
            rpc_timeout: config::RPC_TIMEOUT,
            produce_empty_blocks: false,
            max_block_txs: config::MAX_BLOCK_TRANSACTIONS,
            mempool: MempoolConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),

    #[error("mempool rejected transaction: {0}")]
    Mempool(#[from] MempoolError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("block production not available (node is not a validator)")]
    NotValidator,

    #[error("node is shutting down")]
    ShuttingDown,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

pub struct Node {
    config: NodeConfig,
    chain: Arc<Chain>,
    mempool: Arc<Mempool>,
    peers: PeerTable,
    client: Arc<dyn PeerClient>,
    producer: Option<BlockProducer>,
    tasks: Mutex<JoinSet<()>>,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("listen_addr", &self.config.listen_addr)
            .field("height", &self.chain.height())
            .field("peers", &self.peers.len())
            .field("mempool", &self.mempool.len())
            .field("validator", &self.producer.is_some())
            .finish()
    }
}

impl Node {
    /// Create a node. Nothing runs until [`Node::start`].
    pub fn new(config: NodeConfig, chain: Arc<Chain>, client: Arc<dyn PeerClient>) -> Arc<Self> {
        let mempool = Arc::new(Mempool::new(config.mempool.clone()));
        let producer = config.validator_key.clone().map(|key| {
            BlockProducer::new(
                Arc::clone(&chain),
                Arc::clone(&mempool),
                key,
                ProducerConfig {
                    max_txs: config.max_block_txs,
                    produce_empty_blocks: config.produce_empty_blocks,
                },
            )
        });
        let (shutdown, _) = watch::channel(false);

        info!(
            listen_addr = %config.listen_addr,
            validator = producer.is_some(),
            "creating node"
        );

        Arc::new(Self {
            config,
            chain,
            mempool,
            peers: PeerTable::new(),
            client,
            producer,
            tasks: Mutex::new(JoinSet::new()),
            shutdown,
        })
    }

    /// Dial the bootstrap nodes and, for validators, start the block loop.
    pub fn start(self: &Arc<Self>) {
        info!(listen_addr = %self.config.listen_addr, "starting node");

        if !self.config.bootstrap_nodes.is_empty() {
            let node = Arc::clone(self);
            let addrs = self.config.bootstrap_nodes.clone();
            self.spawn(async move { node.bootstrap(addrs).await });
        }

        if self.producer.is_some() {
            let node = Arc::clone(self);
            let shutdown = self.shutdown.subscribe();
            self.spawn(async move { node.validator_loop(shutdown).await });
        }
    }

    /// Stop every background task and wait for them to finish.
    pub async fn shutdown(&self) {
        info!(listen_addr = %self.config.listen_addr, "shutting down node");
        // Flip the flag under the task lock so `spawn` can't slip a task into
        // the fresh set after the old one has been taken.
        let mut tasks = {
            let mut guard = self.tasks.lock();
            self.shutdown.send_replace(true);
            std::mem::take(&mut *guard)
        };
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        info!(listen_addr = %self.config.listen_addr, "node stopped");
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Track a background task. Finished tasks are reaped on the way in.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if self.is_shutting_down() {
            return;
        }
        while tasks.try_join_next().is_some() {}
        tasks.spawn(fut);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn listen_addr(&self) -> &str {
        &self.config.listen_addr
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn is_validator(&self) -> bool {
        self.producer.is_some()
    }

    /// What we tell peers about ourselves.
    pub fn version(&self) -> Version {
        Version {
            version: self.config.version.clone(),
            height: self.chain.height() as i64,
            listen_addr: self.config.listen_addr.clone(),
            peer_list: self.peers.addresses(),
        }
    }

    // -----------------------------------------------------------------------
    // Endpoints
    // -----------------------------------------------------------------------

    /// Record the caller and return our own version.
    pub fn handshake(self: &Arc<Self>, remote: Version) -> Version {
        self.add_peer(remote);
        self.version()
    }

    /// Accept a transaction from a client or a peer.
    ///
    /// Signatures are checked here, before the mempool, so garbage never
    /// gets relayed. Spendability is left to block assembly.
    pub fn submit_transaction(
        self: &Arc<Self>,
        tx: Transaction,
        origin: Option<String>,
    ) -> Result<Ack, NodeError> {
        if self.is_shutting_down() {
            return Err(NodeError::ShuttingDown);
        }
        verify_transaction(&tx)?;
        // Late gossip for a transaction that already made it into a block.
        if self.chain.get_transaction(&tx.hash_hex()).is_ok() {
            return Ok(Ack {});
        }

        match self.mempool.try_add(tx.clone()) {
            Ok(()) => {
                debug!(tx = %tx.hash_hex(), origin = ?origin, "transaction admitted");
                let node = Arc::clone(self);
                self.spawn(async move { node.broadcast_transaction(&tx, origin.as_deref()).await });
                Ok(Ack {})
            }
            Err(MempoolError::Duplicate) => Ok(Ack {}),
            Err(err) => Err(err.into()),
        }
    }

    /// Accept a block from a peer: validate, append, drop its transactions
    /// from the mempool, relay.
    pub fn submit_block(
        self: &Arc<Self>,
        block: Block,
        origin: Option<String>,
    ) -> Result<Ack, NodeError> {
        if self.is_shutting_down() {
            return Err(NodeError::ShuttingDown);
        }
        let hash = block.hash();
        if self.chain.contains_block(&hash) {
            return Ok(Ack {});
        }

        if let Err(err) = self.chain.add_block(&block) {
            // Lost a race with the same block arriving from another peer.
            if self.chain.contains_block(&hash) {
                return Ok(Ack {});
            }
            warn!(
                height = block.height(),
                hash = %block.hash_hex(),
                origin = ?origin,
                error = %err,
                "rejected block"
            );
            return Err(err.into());
        }

        self.mempool.remove_all(&block.transactions);
        let node = Arc::clone(self);
        self.spawn(async move { node.broadcast_block(&block, origin.as_deref()).await });
        Ok(Ack {})
    }

    // -----------------------------------------------------------------------
    // Peers
    // -----------------------------------------------------------------------

    /// Add `remote` to the peer table. Our own address is never added.
    /// Addresses it knows and we don't are dialed in the background.
    pub fn add_peer(self: &Arc<Self>, remote: Version) -> bool {
        if remote.listen_addr == self.config.listen_addr {
            return false;
        }

        let unknown: Vec<String> = remote
            .peer_list
            .iter()
            .filter(|addr| self.is_dialable(addr))
            .cloned()
            .collect();

        let addr = remote.listen_addr.clone();
        let height = remote.height;
        let added = self.peers.add(remote);
        if added {
            info!(peer = %addr, height, "peer added");
        }

        if !unknown.is_empty() {
            let node = Arc::clone(self);
            self.spawn(async move { node.bootstrap(unknown).await });
        }
        added
    }

    fn is_dialable(&self, addr: &str) -> bool {
        addr != self.config.listen_addr && !self.peers.contains(addr)
    }

    /// Handshake with each address not already known. Failures are logged
    /// and skipped.
    pub async fn bootstrap(self: Arc<Self>, addrs: Vec<String>) {
        for addr in addrs {
            if !self.is_dialable(&addr) {
                continue;
            }
            debug!(peer = %addr, "dialing");
            let call = self.client.handshake(&addr, self.version());
            match self.with_timeout(&addr, call).await {
                Ok(remote) => {
                    self.add_peer(remote);
                }
                Err(err) => warn!(peer = %addr, error = %err, "handshake failed"),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Broadcast
    // -----------------------------------------------------------------------

    async fn with_timeout<T, F>(&self, addr: &str, call: F) -> Result<T, NetworkError>
    where
        F: Future<Output = Result<T, NetworkError>>,
    {
        tokio::time::timeout(self.config.rpc_timeout, call)
            .await
            .map_err(|_| NetworkError::Timeout {
                addr: addr.to_string(),
            })?
    }

    fn fanout(&self, origin: Option<&str>) -> Vec<String> {
        self.peers
            .addresses()
            .into_iter()
            .filter(|addr| Some(addr.as_str()) != origin)
            .collect()
    }

    /// Send `tx` to every peer but `origin`, one at a time.
    pub async fn broadcast_transaction(&self, tx: &Transaction, origin: Option<&str>) {
        for addr in self.fanout(origin) {
            let call = self
                .client
                .submit_transaction(&addr, &self.config.listen_addr, tx);
            if let Err(err) = self.with_timeout(&addr, call).await {
                warn!(peer = %addr, tx = %tx.hash_hex(), error = %err, "transaction delivery failed");
            }
        }
    }

    /// Send `block` to every peer but `origin`, one at a time.
    pub async fn broadcast_block(&self, block: &Block, origin: Option<&str>) {
        for addr in self.fanout(origin) {
            let call = self
                .client
                .submit_block(&addr, &self.config.listen_addr, block);
            if let Err(err) = self.with_timeout(&addr, call).await {
                warn!(peer = %addr, height = block.height(), error = %err, "block delivery failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validator
    // -----------------------------------------------------------------------

    /// One production round: assemble, append and broadcast a block.
    pub fn produce_block(self: &Arc<Self>) -> Result<Option<Block>, NodeError> {
        let producer = self.producer.as_ref().ok_or(NodeError::NotValidator)?;
        let Some(produced) = producer.produce_block()? else {
            return Ok(None);
        };
        if !produced.dropped.is_empty() {
            debug!(dropped = produced.dropped.len(), "transactions dropped from block");
        }
        let block = produced.block;
        let node = Arc::clone(self);
        let relay = block.clone();
        self.spawn(async move { node.broadcast_block(&relay, None).await });
        Ok(Some(block))
    }

    async fn validator_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.config.block_interval.as_millis() as u64,
            "validator loop started"
        );
        // `interval` panics on a zero period.
        let period = self.config.block_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the first block
        // comes one interval after start.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if *shutdown.borrow() {
                break;
            }
            if let Err(err) = self.produce_block() {
                warn!(error = %err, "block production failed");
            }
        }
        info!("validator loop stopped");
    }
}
