// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Blocker Protocol — Core Library
//!
//! A small UTXO ledger shared by a network of peer nodes. Transactions move
//! value between Ed25519-controlled addresses, validators batch them into
//! signed blocks, and every node checks every block before appending it.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 keys and signatures, SHA-256, the Merkle tree.
//! - **transaction** — Transaction types, canonical encoding, signing, checks.
//! - **storage** — Blocks, the store traits with in-memory backends, and the
//!   chain that validates and applies blocks.
//! - **network** — Mempool, peer table, the peer RPC seam, block producer
//!   and the node runtime that ties them together.
//! - **config** — Protocol constants and defaults.
//!
//! ## Ground Rules
//!
//! 1. No I/O in this crate. Sockets live behind [`network::PeerClient`].
//! 2. A block is appended whole or not at all.
//! 3. No `unsafe`.

pub mod config;
pub mod crypto;
pub mod network;
pub mod storage;
pub mod transaction;
