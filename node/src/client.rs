//! HTTP/JSON implementation of [`PeerClient`].
//!
//! Peers are addressed by the listen address they advertise (`host:port`,
//! or a full `http://` URL). Every call is a JSON `POST` to the matching
//! route served by [`crate::api`], with our own listen address in the
//! origin header on submissions.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use blocker_protocol::network::{
    Ack, NetworkError, PeerClient, Version, BLOCKS_PATH, HANDSHAKE_PATH, ORIGIN_HEADER,
    TRANSACTIONS_PATH,
};
use blocker_protocol::storage::Block;
use blocker_protocol::transaction::Transaction;

#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// A client whose connect and total request time are both bounded by
    /// `timeout`.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    async fn post<B, R>(
        &self,
        addr: &str,
        path: &str,
        origin: Option<&str>,
        body: &B,
    ) -> Result<R, NetworkError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.http.post(peer_url(addr, path)).json(body);
        if let Some(origin) = origin {
            request = request.header(ORIGIN_HEADER, origin);
        }

        let response = request.send().await.map_err(|e| transport(addr, e))?;
        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(NetworkError::Rejected {
                addr: addr.to_string(),
                status: status.as_u16(),
                reason,
            });
        }

        response.json().await.map_err(|e| NetworkError::Decode {
            addr: addr.to_string(),
            reason: e.to_string(),
        })
    }
}

fn transport(addr: &str, err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout {
            addr: addr.to_string(),
        }
    } else {
        NetworkError::Transport {
            addr: addr.to_string(),
            reason: err.to_string(),
        }
    }
}

/// `http://<addr><path>`, unless `addr` already carries a scheme.
pub fn peer_url(addr: &str, path: &str) -> String {
    let base = addr.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}{path}")
    } else {
        format!("http://{base}{path}")
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn handshake(&self, addr: &str, version: Version) -> Result<Version, NetworkError> {
        self.post(addr, HANDSHAKE_PATH, None, &version).await
    }

    async fn submit_transaction(
        &self,
        addr: &str,
        origin: &str,
        tx: &Transaction,
    ) -> Result<Ack, NetworkError> {
        self.post(addr, TRANSACTIONS_PATH, Some(origin), tx).await
    }

    async fn submit_block(
        &self,
        addr: &str,
        origin: &str,
        block: &Block,
    ) -> Result<Ack, NetworkError> {
        self.post(addr, BLOCKS_PATH, Some(origin), block).await
    }
}
