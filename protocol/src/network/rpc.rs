//! # Peer RPC Definitions
//!
//! Message types exchanged between nodes and the [`PeerClient`] trait the
//! node uses to reach its peers. Like the rest of this crate, nothing here
//! knows about sockets: the node binary implements `PeerClient` over
//! HTTP/JSON and serves the matching routes with axum, and the integration
//! tests implement it with plain in-process calls.
//!
//! ## Method Index
//!
//! | Method               | Route               | Payload         | Reply     |
//! |----------------------|---------------------|-----------------|-----------|
//! | `handshake`          | `POST /handshake`   | [`Version`]     | [`Version`] |
//! | `submit_transaction` | `POST /transactions`| `Transaction`   | [`Ack`]   |
//! | `submit_block`       | `POST /blocks`      | `Block`         | [`Ack`]   |
//!
//! The sender's listen address rides along in the [`ORIGIN_HEADER`] so the
//! receiver can leave it out when relaying.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::Block;
use crate::transaction::Transaction;

/// Route of the handshake endpoint.
pub const HANDSHAKE_PATH: &str = "/handshake";
/// Route of the transaction submission endpoint.
pub const TRANSACTIONS_PATH: &str = "/transactions";
/// Route of the block submission endpoint.
pub const BLOCKS_PATH: &str = "/blocks";
/// Header naming the listen address of the node that sent a submission.
pub const ORIGIN_HEADER: &str = "x-blocker-origin";

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// What a node says about itself in a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Protocol version string, e.g. `blocker-0.1`.
    pub version: String,
    /// Chain height of the sender.
    pub height: i64,
    /// Address the sender accepts connections on. Also its key in our
    /// peer table.
    pub listen_addr: String,
    /// Addresses the sender already knows.
    pub peer_list: Vec<String>,
}

/// Empty acknowledgement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure talking to one peer. Never fatal to the node; callers log it and
/// move on to the next peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("peer {addr} timed out")]
    Timeout { addr: String },

    #[error("transport error talking to {addr}: {reason}")]
    Transport { addr: String, reason: String },

    #[error("peer {addr} rejected request ({status}): {reason}")]
    Rejected {
        addr: String,
        status: u16,
        reason: String,
    },

    #[error("could not decode reply from {addr}: {reason}")]
    Decode { addr: String, reason: String },
}

// ---------------------------------------------------------------------------
// PeerClient
// ---------------------------------------------------------------------------

/// Outbound calls to a remote node identified by its listen address.
///
/// Implementations need not enforce timeouts; the node wraps every call in
/// its own deadline.
#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    async fn handshake(&self, addr: &str, version: Version) -> Result<Version, NetworkError>;

    async fn submit_transaction(
        &self,
        addr: &str,
        origin: &str,
        tx: &Transaction,
    ) -> Result<Ack, NetworkError>;

    async fn submit_block(
        &self,
        addr: &str,
        origin: &str,
        block: &Block,
    ) -> Result<Ack, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_json_shape() {
        let v = Version {
            version: "blocker-0.1".into(),
            height: 3,
            listen_addr: ":3000".into(),
            peer_list: vec![":3001".into()],
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["listen_addr"], ":3000");
        assert_eq!(json["peer_list"][0], ":3001");
        let back: Version = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn ack_is_empty_object() {
        assert_eq!(serde_json::to_string(&Ack {}).unwrap(), "{}");
    }
}
