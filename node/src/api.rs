//! # HTTP API
//!
//! The axum router that puts a [`Node`] on the network. The three `POST`
//! routes are the peer protocol, matched one-to-one by
//! [`HttpPeerClient`](crate::client::HttpPeerClient); the `GET` routes are
//! for operators.
//!
//! ## Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | POST   | `/handshake`      | Exchange `Version`s, learn peers         |
//! | POST   | `/transactions`   | Submit a signed transaction              |
//! | POST   | `/blocks`         | Submit a block                           |
//! | GET    | `/health`         | Liveness probe                           |
//! | GET    | `/status`         | Height, tip, peers, mempool size         |
//! | GET    | `/blocks/:height` | Block by height                          |
//! | GET    | `/metrics`        | Prometheus text format                   |
//!
//! Submissions read the sender's listen address from the
//! `x-blocker-origin` header so the node can skip it when relaying.
//!
//! ## Errors
//!
//! Every failure is a JSON `{"error": "..."}` body. Validation failures are
//! `422`, unknown heights `404`, unparseable bodies `400`, a full mempool or
//! a node that is shutting down `503`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use blocker_protocol::config::REQUEST_TIMEOUT;
use blocker_protocol::network::{
    Ack, MempoolError, Node, NodeError, Version, BLOCKS_PATH, HANDSHAKE_PATH, ORIGIN_HEADER,
    TRANSACTIONS_PATH,
};
use blocker_protocol::storage::{Block, ChainError};
use blocker_protocol::transaction::Transaction;

use crate::metrics::NodeMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Software version reported by `/status`.
    pub version: String,
    pub node: Arc<Node>,
    pub metrics: Arc<NodeMetrics>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Build the full router with CORS, request tracing and a per-request
/// deadline.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route(HANDSHAKE_PATH, post(handshake_handler))
        .route(TRANSACTIONS_PATH, post(submit_transaction_handler))
        .route(BLOCKS_PATH, post(submit_block_handler))
        .route("/blocks/:height", get(block_by_height_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub protocol_version: String,
    pub listen_addr: String,
    pub height: u64,
    /// Hex hash of the tip header.
    pub tip_hash: String,
    pub peers: Vec<String>,
    pub mempool_size: usize,
    pub validator: bool,
    /// RFC 3339 time the response was generated.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying the HTTP status it maps to.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        let status = match &err {
            NodeError::InvalidTransaction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NodeError::Chain(ChainError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            NodeError::Chain(ChainError::HeightOutOfRange { .. }) => StatusCode::NOT_FOUND,
            NodeError::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NodeError::Mempool(MempoolError::Full { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            NodeError::Mempool(MempoolError::Duplicate) => StatusCode::CONFLICT,
            NodeError::NotValidator => StatusCode::CONFLICT,
            NodeError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

fn origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ORIGIN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

// ---------------------------------------------------------------------------
// Peer Protocol
// ---------------------------------------------------------------------------

/// `POST /handshake` — record the caller, answer with our own version.
async fn handshake_handler(
    State(state): State<AppState>,
    body: Result<Json<Version>, JsonRejection>,
) -> Result<Json<Version>, ApiError> {
    let Json(remote) = body?;
    state.metrics.handshakes_total.inc();
    Ok(Json(state.node.handshake(remote)))
}

/// `POST /transactions` — verify, pool and relay a transaction.
async fn submit_transaction_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Transaction>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(tx) = body?;
    state.metrics.transactions_received_total.inc();
    state
        .node
        .submit_transaction(tx, origin(&headers))
        .map(Json)
        .map_err(|err| {
            state.metrics.transactions_rejected_total.inc();
            err.into()
        })
}

/// `POST /blocks` — validate, append and relay a block.
async fn submit_block_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Block>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(block) = body?;
    state.metrics.blocks_received_total.inc();
    state
        .node
        .submit_block(block, origin(&headers))
        .map(Json)
        .map_err(|err| {
            state.metrics.blocks_rejected_total.inc();
            err.into()
        })
}

// ---------------------------------------------------------------------------
// Operator Endpoints
// ---------------------------------------------------------------------------

/// `GET /health` — 200 while the process is up.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let node = &state.node;
    let tip = node.chain().tip_header();
    Json(StatusResponse {
        version: state.version.clone(),
        protocol_version: node.config().version.clone(),
        listen_addr: node.listen_addr().to_string(),
        height: tip.height,
        tip_hash: tip.hash_hex(),
        peers: node.peers().addresses(),
        mempool_size: node.mempool().len(),
        validator: node.is_validator(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn block_by_height_handler(
    State(state): State<AppState>,
    Path(height): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    state
        .node
        .chain()
        .get_block_by_height(height)
        .map(Json)
        .map_err(|err| match err {
            ChainError::HeightOutOfRange { .. } => ApiError::new(
                StatusCode::NOT_FOUND,
                format!("block not found at height {height}"),
            ),
            other => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })
}

/// `GET /metrics` — Prometheus scrape endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    state.metrics.observe(&state.node);
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed")
                .into_response()
        }
    }
}
