//! # Block Structure
//!
//! A block is a signed header plus an ordered list of transactions.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Header                                     │
//! │  ├── version: u32                           │
//! │  ├── height: u64                            │
//! │  ├── prev_hash: [u8; 32]                    │
//! │  ├── root_hash: [u8; 32]  (Merkle root)     │
//! │  └── timestamp: i64                         │
//! ├─────────────────────────────────────────────┤
//! │  transactions: Vec<Transaction>             │
//! │  signature: Signature    (over header hash) │
//! │  public_key: PublicKey   (the signer)       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The block hash is SHA-256 of the header's canonical bytes and nothing
//! else. Transactions are covered indirectly through `root_hash`; the
//! signature signs the hash, so it can't be part of it.
//!
//! ## Signing Order
//!
//! The Merkle root is computed and written into the header *before* the
//! header is signed. Signing first and filling in the root afterwards would
//! produce a signature over a header that no longer exists.

use serde::{Deserialize, Serialize};

use crate::config::{BLOCK_VERSION, GENESIS_AMOUNT, GENESIS_SEED_HEX, GENESIS_TIMESTAMP};
use crate::crypto::hash::{sha256, Hash32, ZERO_HASH};
use crate::crypto::keys::{KeyError, PrivateKey, PublicKey, Signature};
use crate::crypto::merkle::MerkleTree;
use crate::transaction::{Transaction, TxOutput};

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Block metadata and chain linkage. Immutable once the block is signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    /// 0 for genesis.
    pub height: u64,
    /// Hash of the previous header. All zeros for genesis.
    #[serde(with = "hex::serde")]
    pub prev_hash: Hash32,
    /// Merkle root of `transactions`, or all zeros for an empty block.
    #[serde(with = "hex::serde")]
    pub root_hash: Hash32,
    /// Unix seconds.
    pub timestamp: i64,
}

impl Header {
    /// `version u32 | height u64 | prev_hash [32] | root_hash [32] | timestamp i64`, little-endian.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut preimage = Vec::with_capacity(84);
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(&self.height.to_le_bytes());
        preimage.extend_from_slice(&self.prev_hash);
        preimage.extend_from_slice(&self.root_hash);
        preimage.extend_from_slice(&self.timestamp.to_le_bytes());
        preimage
    }

    pub fn hash(&self) -> Hash32 {
        sha256(&self.canonical_bytes())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A signed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub signature: Signature,
    pub public_key: PublicKey,
}

impl Block {
    /// Assemble and sign a block on top of `parent`.
    ///
    /// Fills in height, `prev_hash` and the Merkle root, then signs. The
    /// result is ready to hand to the chain.
    pub fn build(
        parent: &Header,
        transactions: Vec<Transaction>,
        timestamp: i64,
        key: &PrivateKey,
    ) -> Self {
        let header = Header {
            version: BLOCK_VERSION,
            height: parent.height + 1,
            prev_hash: parent.hash(),
            root_hash: compute_root(&transactions),
            timestamp,
        };
        Self::sign(header, transactions, key)
    }

    /// Sign `header` as-is. The caller is responsible for `root_hash`
    /// matching `transactions`.
    pub fn sign(header: Header, transactions: Vec<Transaction>, key: &PrivateKey) -> Self {
        let signature = key.sign(&header.hash());
        Self {
            header,
            transactions,
            signature,
            public_key: key.public_key(),
        }
    }

    /// The genesis block.
    ///
    /// Signed by the well-known genesis key, timestamp fixed at zero, and
    /// carrying a single input-less transaction that allocates
    /// [`GENESIS_AMOUNT`] to the genesis key's address. Every node computes
    /// exactly the same block.
    pub fn genesis() -> Result<Self, KeyError> {
        let key = genesis_key()?;
        let allocation = Transaction::new(
            Vec::new(),
            vec![TxOutput {
                amount: GENESIS_AMOUNT,
                address: key.public_key().address(),
            }],
        );
        let transactions = vec![allocation];
        let header = Header {
            version: BLOCK_VERSION,
            height: 0,
            prev_hash: ZERO_HASH,
            root_hash: compute_root(&transactions),
            timestamp: GENESIS_TIMESTAMP,
        };
        Ok(Self::sign(header, transactions, &key))
    }

    /// Hash of the header.
    pub fn hash(&self) -> Hash32 {
        self.header.hash()
    }

    pub fn hash_hex(&self) -> String {
        self.header.hash_hex()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// True if the embedded key signed this header.
    pub fn verify_signature(&self) -> bool {
        self.public_key.verify(&self.header.hash(), &self.signature)
    }

    /// True if `root_hash` commits to exactly these transactions, in order.
    /// An empty block must carry the zero root.
    pub fn verify_root(&self) -> bool {
        match MerkleTree::new(self.transactions.clone()) {
            Some(tree) => tree.verify() && tree.root() == self.header.root_hash,
            None => self.header.root_hash == ZERO_HASH,
        }
    }
}

/// Merkle root over `transactions`, zero for none.
pub fn compute_root(transactions: &[Transaction]) -> Hash32 {
    MerkleTree::new(transactions.to_vec())
        .map(|tree| tree.root())
        .unwrap_or(ZERO_HASH)
}

/// The key that signs genesis and owns its allocation.
pub fn genesis_key() -> Result<PrivateKey, KeyError> {
    PrivateKey::from_seed_hex(GENESIS_SEED_HEX)
}
