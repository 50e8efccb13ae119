//! # Transaction Module
//!
//! UTXO transactions: construction, signing and stateless verification.
//!
//! ```text
//! types.rs        — Transaction, TxInput, TxOutput and the canonical encoding
//! builder.rs      — Fluent TransactionBuilder for unsigned transactions
//! signing.rs      — Per-input Ed25519 signing over the signing hash
//! verification.rs — Signature and structural checks that need no chain state
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build** with [`TransactionBuilder`], referencing outputs you own.
//! 2. **Sign** with [`sign_transaction`] (or [`sign_input`] per input).
//! 3. **Submit** to a node; it runs [`verify_transaction`] before the mempool.
//! 4. **Include**: a validator re-checks it against the UTXO set and puts
//!    it in a block. Its outputs become spendable once that block is applied.

pub mod builder;
pub mod signing;
pub mod types;
pub mod verification;

pub use builder::TransactionBuilder;
pub use signing::{sign_input, sign_transaction, SigningError};
pub use types::{Transaction, TxInput, TxOutput};
pub use verification::{verify_signatures, verify_transaction, TransactionError};
