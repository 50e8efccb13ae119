//! Known-peer table.
//!
//! Peers are keyed by the listen address they advertise in their handshake
//! and map to the last [`Version`] we saw from them. The table is the only
//! place peer membership lives; broadcast and discovery read snapshots of it
//! and never hold the lock across an await.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::rpc::Version;

#[derive(Debug, Default)]
pub struct PeerTable {
    peers: RwLock<HashMap<String, Version>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `version` under its `listen_addr`. Returns `true` if the peer
    /// was not known before; a known peer just has its version refreshed.
    pub fn add(&self, version: Version) -> bool {
        self.peers
            .write()
            .insert(version.listen_addr.clone(), version)
            .is_none()
    }

    pub fn remove(&self, addr: &str) -> Option<Version> {
        self.peers.write().remove(addr)
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.peers.read().contains_key(addr)
    }

    pub fn get(&self, addr: &str) -> Option<Version> {
        self.peers.read().get(addr).cloned()
    }

    /// Sorted snapshot of every known address.
    pub fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self.peers.read().keys().cloned().collect();
        addrs.sort();
        addrs
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
