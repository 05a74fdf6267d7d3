//! Core types for the Meridian ledger.
//!
//! This crate provides the foundational types used throughout the node:
//!
//! - **Primitives**: Hash, cryptographic keys and signatures
//! - **Identifiers**: AccountId (`name@domain`), AssetId (`asset#domain`)
//! - **Ledger types**: Amount, permission sets, Transaction, Batch, Block,
//!   Proposal, Peer, LedgerState
//! - **Consensus types**: Round, YacHash, VoteMessage
//! - **Utilities**: deterministic seeded permutation generation
//!
//! # Design Philosophy
//!
//! This crate is self-contained and does not depend on any other workspace
//! crates, making it the foundation layer. Everything that crosses a wire or
//! lands in storage lives here so that hashing and serialization stay
//! bit-exact across subsystems.

mod amount;
mod batch;
mod block;
mod crypto;
mod hash;
mod identifiers;
mod peer;
mod permissions;
mod permutation;
mod proposal;
mod round;
mod transaction;
mod vote;

pub use amount::{Amount, AmountError};
pub use batch::Batch;
pub use block::Block;
pub use crypto::{KeyPair, PublicKey, Signature, SignatureError};
pub use hash::{Hash, HexError};
pub use identifiers::{AccountId, AssetId, IdParseError};
pub use peer::{LedgerState, Peer};
pub use permissions::{
    GrantablePermission, GrantablePermissionSet, PermissionParseError, RolePermission,
    RolePermissionSet,
};
pub use permutation::{generate_permutation, Seeder};
pub use proposal::Proposal;
pub use round::{Round, FIRST_REJECT_ROUND};
pub use transaction::{Command, Transaction, TransactionSignature};
pub use vote::{VoteMessage, YacHash};

/// Test utilities shared across the workspace test suites.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;

    /// Deterministic keypair from a seed byte.
    pub fn test_keypair(seed: u8) -> KeyPair {
        KeyPair::from_seed(&[seed; 32])
    }

    /// A transaction with a single detail-setting command, unique per `nonce`.
    pub fn test_transaction(creator: &str, nonce: u64, quorum: u32) -> Transaction {
        let creator_id = AccountId::parse(creator).expect("test creator id");
        Transaction {
            creator: Some(creator_id.clone()),
            created_time_ms: 1_700_000_000_000 + nonce,
            quorum,
            commands: vec![Command::SetAccountDetail {
                account_id: creator_id,
                key: format!("k{nonce}"),
                value: format!("v{nonce}"),
            }],
            signatures: vec![],
        }
    }

    /// A transaction carrying one signature made with `signer`.
    pub fn signed_transaction(
        creator: &str,
        nonce: u64,
        quorum: u32,
        signer: &KeyPair,
    ) -> Transaction {
        let mut tx = test_transaction(creator, nonce, quorum);
        let payload = tx.payload_hash();
        let signature = signer.sign(payload.as_bytes());
        tx.signatures.push(TransactionSignature {
            public_key: signer.public_key(),
            signature,
        });
        tx
    }

    /// Batch of one transaction per creator, each with one signature.
    pub fn test_batch(creators: &[&str], base_nonce: u64, quorum: u32) -> Batch {
        let txs = creators
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let kp = test_keypair(i as u8 + 1);
                signed_transaction(c, base_nonce + i as u64, quorum, &kp)
            })
            .collect();
        Batch::new(txs)
    }
}
