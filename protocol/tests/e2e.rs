//! End-to-end integration tests.
//!
//! The first half drives a single chain through multi-block payment flows.
//! The second half wires several [`Node`]s together through an in-process
//! [`PeerClient`] and checks that discovery, transaction gossip and block
//! propagation converge the way they would over HTTP.
//!
//! Each test builds its own chains and nodes. No shared state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use blocker_protocol::crypto::hash::Hash32;
use blocker_protocol::crypto::keys::PrivateKey;
use blocker_protocol::network::{
    Ack, BlockProducer, Mempool, NetworkError, Node, NodeConfig, NodeError, PeerClient,
    ProducerConfig, Version,
};
use blocker_protocol::storage::{genesis_key, utxo_key, Block, Chain, ChainError, ValidationError};
use blocker_protocol::transaction::{sign_transaction, Transaction, TransactionBuilder};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn genesis_tx(chain: &Chain) -> Hash32 {
    chain.get_block_by_height(0).unwrap().transactions[0].hash()
}

/// Spend output `index` of `prev` (owned by `from`) into `outputs`.
fn transfer(
    from: &PrivateKey,
    prev: Hash32,
    index: u32,
    outputs: &[(u64, &PrivateKey)],
) -> Transaction {
    let mut builder = TransactionBuilder::new().input(prev, index, from.public_key());
    for (amount, to) in outputs {
        builder = builder.output(*amount, to.public_key().address());
    }
    let mut tx = builder.build();
    sign_transaction(&mut tx, from);
    tx
}

fn balance(chain: &Chain, tx: &Transaction, index: u32) -> (u64, bool) {
    let utxo = chain.get_utxo(&utxo_key(&tx.hash(), index)).unwrap();
    (utxo.amount, utxo.spent)
}

/// Poll `check` until it holds or five seconds pass.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

/// Nodes addressed by name, reached by direct calls instead of HTTP.
#[derive(Default)]
struct LocalNetwork {
    nodes: RwLock<HashMap<String, Weak<Node>>>,
}

impl LocalNetwork {
    fn spawn_node(self: &Arc<Self>, addr: &str, validator: Option<PrivateKey>) -> Arc<Node> {
        let config = NodeConfig {
            listen_addr: addr.to_string(),
            validator_key: validator,
            block_interval: Duration::from_millis(50),
            ..NodeConfig::default()
        };
        let chain = Arc::new(Chain::in_memory().unwrap());
        let client: Arc<dyn PeerClient> = Arc::clone(self) as Arc<dyn PeerClient>;
        let node = Node::new(config, chain, client);
        self.nodes
            .write()
            .insert(addr.to_string(), Arc::downgrade(&node));
        node
    }

    fn lookup(&self, addr: &str) -> Result<Arc<Node>, NetworkError> {
        self.nodes
            .read()
            .get(addr)
            .and_then(Weak::upgrade)
            .ok_or_else(|| NetworkError::Transport {
                addr: addr.to_string(),
                reason: "no such node".into(),
            })
    }
}

fn rejected(addr: &str, err: NodeError) -> NetworkError {
    NetworkError::Rejected {
        addr: addr.to_string(),
        status: 422,
        reason: err.to_string(),
    }
}

#[async_trait]
impl PeerClient for LocalNetwork {
    async fn handshake(&self, addr: &str, version: Version) -> Result<Version, NetworkError> {
        Ok(self.lookup(addr)?.handshake(version))
    }

    async fn submit_transaction(
        &self,
        addr: &str,
        origin: &str,
        tx: &Transaction,
    ) -> Result<Ack, NetworkError> {
        self.lookup(addr)?
            .submit_transaction(tx.clone(), Some(origin.to_string()))
            .map_err(|e| rejected(addr, e))
    }

    async fn submit_block(
        &self,
        addr: &str,
        origin: &str,
        block: &Block,
    ) -> Result<Ack, NetworkError> {
        self.lookup(addr)?
            .submit_block(block.clone(), Some(origin.to_string()))
            .map_err(|e| rejected(addr, e))
    }
}

async fn connect(from: &Arc<Node>, to: &str) {
    Arc::clone(from).bootstrap(vec![to.to_string()]).await;
}

// ---------------------------------------------------------------------------
// Single chain
// ---------------------------------------------------------------------------

#[test]
fn payment_chain_across_blocks() {
    let chain = Arc::new(Chain::in_memory().unwrap());
    let mempool = Arc::new(Mempool::default());
    let validator = PrivateKey::generate();
    let producer = BlockProducer::new(
        Arc::clone(&chain),
        Arc::clone(&mempool),
        validator.clone(),
        ProducerConfig::default(),
    );
    let god = genesis_key().unwrap();
    let alice = PrivateKey::generate();
    let bob = PrivateKey::generate();

    // Block 1: genesis pays alice 600, keeps 400.
    let tx1 = transfer(&god, genesis_tx(&chain), 0, &[(600, &alice), (400, &god)]);
    mempool.add(tx1.clone());
    let b1 = producer.produce_block().unwrap().unwrap().block;
    assert_eq!(b1.height(), 1);
    assert_eq!(b1.public_key, validator.public_key());

    // Block 2: alice pays bob 250 with 350 change, god pays bob 400.
    let tx2 = transfer(&alice, tx1.hash(), 0, &[(250, &bob), (350, &alice)]);
    let tx3 = transfer(&god, tx1.hash(), 1, &[(400, &bob)]);
    mempool.add(tx2.clone());
    mempool.add(tx3.clone());
    let b2 = producer.produce_block().unwrap().unwrap().block;
    assert_eq!(b2.transactions, vec![tx2.clone(), tx3.clone()]);
    assert_eq!(b2.header.prev_hash, b1.hash());

    assert_eq!(chain.height(), 2);
    assert_eq!(balance(&chain, &tx1, 0), (600, true));
    assert_eq!(balance(&chain, &tx1, 1), (400, true));
    assert_eq!(balance(&chain, &tx2, 0), (250, false));
    assert_eq!(balance(&chain, &tx2, 1), (350, false));
    assert_eq!(balance(&chain, &tx3, 0), (400, false));

    assert_eq!(chain.get_transaction(&tx2.hash_hex()).unwrap(), tx2);
    assert_eq!(chain.get_block_by_hash(&b2.hash()).unwrap(), b2);
}

#[test]
fn double_spend_across_blocks_rejected() {
    let chain = Chain::in_memory().unwrap();
    let god = genesis_key().unwrap();
    let alice = PrivateKey::generate();
    let bob = PrivateKey::generate();
    let validator = PrivateKey::generate();
    let prev = genesis_tx(&chain);

    let first = transfer(&god, prev, 0, &[(1000, &alice)]);
    let b1 = Block::build(&chain.tip_header(), vec![first], 1, &validator);
    chain.add_block(&b1).unwrap();

    let again = transfer(&god, prev, 0, &[(1000, &bob)]);
    let b2 = Block::build(&chain.tip_header(), vec![again], 2, &validator);
    assert!(matches!(
        chain.add_block(&b2),
        Err(ChainError::Validation(ValidationError::DoubleSpend { .. }))
    ));
    assert_eq!(chain.height(), 1);
    assert_eq!(chain.tip_hash(), b1.hash());
}

#[test]
fn stolen_output_rejected() {
    let chain = Chain::in_memory().unwrap();
    let thief = PrivateKey::generate();
    let validator = PrivateKey::generate();

    let theft = transfer(&thief, genesis_tx(&chain), 0, &[(1000, &thief)]);
    let block = Block::build(&chain.tip_header(), vec![theft], 1, &validator);
    assert!(matches!(
        chain.add_block(&block),
        Err(ChainError::Validation(ValidationError::UnauthorizedSpend { .. }))
    ));
    assert_eq!(chain.height(), 0);
}

#[test]
fn every_node_agrees_on_genesis() {
    let a = Chain::in_memory().unwrap();
    let b = Chain::in_memory().unwrap();
    assert_eq!(a.tip_hash(), b.tip_hash());
    assert_eq!(genesis_tx(&a), genesis_tx(&b));
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[tokio::test]
async fn peers_discover_each_other_transitively() {
    let net = Arc::new(LocalNetwork::default());
    let a = net.spawn_node("node-a", None);
    let b = net.spawn_node("node-b", None);
    let c = net.spawn_node("node-c", None);

    connect(&b, "node-c").await;
    assert_eq!(b.peers().addresses(), vec!["node-c"]);
    assert_eq!(c.peers().addresses(), vec!["node-b"]);

    connect(&a, "node-b").await;
    eventually("full mesh", || {
        let (a, b, c) = (Arc::clone(&a), Arc::clone(&b), Arc::clone(&c));
        async move {
            a.peers().addresses() == vec!["node-b", "node-c"]
                && b.peers().addresses() == vec!["node-a", "node-c"]
                && c.peers().addresses() == vec!["node-a", "node-b"]
        }
    })
    .await;

    for node in [&a, &b, &c] {
        assert!(!node.peers().contains(node.listen_addr()));
        node.shutdown().await;
    }
}

#[tokio::test]
async fn unreachable_bootstrap_is_skipped() {
    let net = Arc::new(LocalNetwork::default());
    let a = net.spawn_node("node-a", None);
    let _b = net.spawn_node("node-b", None);

    Arc::clone(&a)
        .bootstrap(vec!["node-gone".into(), "node-b".into()])
        .await;
    assert_eq!(a.peers().addresses(), vec!["node-b"]);
    a.shutdown().await;
}

#[tokio::test]
async fn transaction_gossips_along_a_line() {
    let net = Arc::new(LocalNetwork::default());
    let a = net.spawn_node("node-a", None);
    let b = net.spawn_node("node-b", None);
    let c = net.spawn_node("node-c", None);

    // a - b - c, with a and c not directly connected.
    connect(&a, "node-b").await;
    b.peers().add(c.version());
    c.peers().add(b.version());
    assert!(!a.peers().contains("node-c"));

    let tx = transfer(
        &genesis_key().unwrap(),
        genesis_tx(a.chain()),
        0,
        &[(1000, &PrivateKey::generate())],
    );
    a.submit_transaction(tx.clone(), None).unwrap();

    let hash = tx.hash_hex();
    eventually("tx reaches every mempool", || {
        let nodes = [Arc::clone(&a), Arc::clone(&b), Arc::clone(&c)];
        let hash = hash.clone();
        async move { nodes.iter().all(|n| n.mempool().contains(&hash)) }
    })
    .await;

    for node in [&a, &b, &c] {
        assert_eq!(node.mempool().len(), 1);
        node.shutdown().await;
    }
}

#[tokio::test]
async fn validator_block_reaches_every_node() {
    let net = Arc::new(LocalNetwork::default());
    let v = net.spawn_node("validator", Some(PrivateKey::generate()));
    let a = net.spawn_node("node-a", None);
    let b = net.spawn_node("node-b", None);

    connect(&a, "validator").await;
    connect(&b, "node-a").await;
    eventually("mesh", || {
        let v = Arc::clone(&v);
        async move { v.peers().len() == 2 }
    })
    .await;

    v.start();

    // Submitted to a non-validator; gossip carries it to the validator.
    let tx = transfer(
        &genesis_key().unwrap(),
        genesis_tx(b.chain()),
        0,
        &[(1000, &PrivateKey::generate())],
    );
    b.submit_transaction(tx.clone(), None).unwrap();

    eventually("every chain includes the tx", || {
        let nodes = [Arc::clone(&v), Arc::clone(&a), Arc::clone(&b)];
        let hash = tx.hash_hex();
        async move {
            nodes
                .iter()
                .all(|n| n.chain().get_transaction(&hash).is_ok() && n.mempool().is_empty())
        }
    })
    .await;

    let tip = v.chain().tip_hash();
    v.shutdown().await;
    for node in [&a, &b] {
        assert_eq!(node.chain().height(), v.chain().height());
        assert_eq!(node.chain().tip_hash(), tip);
        node.shutdown().await;
    }
}

#[tokio::test]
async fn forged_block_is_not_relayed() {
    let net = Arc::new(LocalNetwork::default());
    let a = net.spawn_node("node-a", None);
    let b = net.spawn_node("node-b", None);
    connect(&a, "node-b").await;

    let mut block = Block::build(&a.chain().tip_header(), vec![], 1, &PrivateKey::generate());
    block.public_key = PrivateKey::generate().public_key();

    assert!(matches!(
        a.submit_block(block, Some("node-b".into())),
        Err(NodeError::Chain(ChainError::Validation(
            ValidationError::InvalidBlockSignature
        )))
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(a.chain().height(), 0);
    assert_eq!(b.chain().height(), 0);

    a.shutdown().await;
    b.shutdown().await;
}
