//! # Prometheus Metrics
//!
//! Operational metrics for the node, served at `GET /metrics`.
//!
//! Counters are bumped by the API handlers as requests arrive. Gauges that
//! mirror node state (height, peers, mempool) are refreshed from the node at
//! scrape time, so they are never stale and nothing has to push them.
//!
//! Everything lives in a dedicated [`Registry`] with the `blocker` prefix.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use blocker_protocol::network::Node;

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    pub transactions_received_total: IntCounter,
    pub transactions_rejected_total: IntCounter,
    pub blocks_received_total: IntCounter,
    pub blocks_rejected_total: IntCounter,
    pub handshakes_total: IntCounter,
    pub chain_height: IntGauge,
    pub connected_peers: IntGauge,
    pub transactions_in_mempool: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let metric = IntCounter::new(name, help)?;
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntGauge> {
    let metric = IntGauge::new(name, help)?;
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl NodeMetrics {
    /// Create and register every metric. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("blocker".into()), None)?;

        Ok(Self {
            transactions_received_total: counter(
                &registry,
                "transactions_received_total",
                "Transactions submitted to this node by clients or peers",
            )?,
            transactions_rejected_total: counter(
                &registry,
                "transactions_rejected_total",
                "Submitted transactions that failed verification or admission",
            )?,
            blocks_received_total: counter(
                &registry,
                "blocks_received_total",
                "Blocks submitted to this node by peers",
            )?,
            blocks_rejected_total: counter(
                &registry,
                "blocks_rejected_total",
                "Submitted blocks that failed validation",
            )?,
            handshakes_total: counter(&registry, "handshakes_total", "Inbound handshakes")?,
            chain_height: gauge(&registry, "chain_height", "Height of the chain tip")?,
            connected_peers: gauge(&registry, "connected_peers", "Peers in the peer table")?,
            transactions_in_mempool: gauge(
                &registry,
                "transactions_in_mempool",
                "Pending transactions in the mempool",
            )?,
            registry,
        })
    }

    /// Copy current node state into the gauges.
    pub fn observe(&self, node: &Node) {
        self.chain_height
            .set(i64::try_from(node.chain().height()).unwrap_or(i64::MAX));
        self.connected_peers.set(node.peers().len() as i64);
        self.transactions_in_mempool
            .set(node.mempool().len() as i64);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
