//! # Protocol Configuration & Constants
//!
//! Every magic number in Blocker lives here. If you're hardcoding a length or
//! an interval somewhere else, move it here instead.
//!
//! The genesis seed and allocation are part of the chain's identity: two
//! nodes that disagree on them will disagree on the hash of block zero and
//! can never link a single block together.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Version string exchanged in the handshake.
pub const PROTOCOL_VERSION: &str = "blocker-0.1";

/// Header format version stamped on every block this node produces.
pub const BLOCK_VERSION: u32 = 1;

/// Transaction format version.
pub const TX_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 seed (private key) length in bytes.
pub const SEED_LENGTH: usize = 32;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Address length. An address is the trailing slice of the public key, not a
/// hash of it.
pub const ADDRESS_LENGTH: usize = 20;

/// Output length of SHA-256.
pub const HASH_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// Well-known seed of the key that signs the genesis block and owns the
/// initial allocation. Public on purpose: it is a devnet faucet, not a secret.
pub const GENESIS_SEED_HEX: &str =
    "b3853c01222f908d08a87d0dd8ce7b0d1324d9967b5da9342ee185d5c1ee295e";

/// Units allocated to the genesis key's address in block zero.
pub const GENESIS_AMOUNT: u64 = 1000;

/// Genesis timestamp. Fixed so every node derives the same genesis hash.
pub const GENESIS_TIMESTAMP: i64 = 0;

// ---------------------------------------------------------------------------
// Node Timing
// ---------------------------------------------------------------------------

/// How often a validator drains the mempool into a block.
pub const BLOCK_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on any single outbound peer call.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound on handling any single inbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Mempool
// ---------------------------------------------------------------------------

/// Maximum number of transactions a validator puts in one block. Anything
/// left over stays in the pool for the next round.
pub const MAX_BLOCK_TRANSACTIONS: usize = 1000;
