//! Consensus votes.

use crate::hash::FieldHasher;
use crate::{Hash, KeyPair, PublicKey, Round, Signature, SignatureError};
use serde::{Deserialize, Serialize};

/// What a consensus vote is about: a round plus the proposal and block
/// digests the voter stands behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YacHash {
    pub round: Round,
    pub proposal_hash: Hash,
    pub block_hash: Hash,
}

impl YacHash {
    pub fn new(round: Round, proposal_hash: Hash, block_hash: Hash) -> Self {
        YacHash {
            round,
            proposal_hash,
            block_hash,
        }
    }

    /// Canonical digest signed by voters.
    pub fn signing_digest(&self) -> Hash {
        FieldHasher::new("meridian.vote.v1")
            .field(&self.round)
            .field(&self.proposal_hash)
            .field(&self.block_hash)
            .finish()
    }
}

/// A signed consensus vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMessage {
    pub hash: YacHash,
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl VoteMessage {
    /// Sign a vote for `hash` with `keypair`.
    pub fn sign(hash: YacHash, keypair: &KeyPair) -> Self {
        let digest = hash.signing_digest();
        VoteMessage {
            hash,
            public_key: keypair.public_key(),
            signature: keypair.sign(digest.as_bytes()),
        }
    }

    /// Verify the signature against the claimed public key.
    pub fn verify(&self) -> Result<(), SignatureError> {
        let digest = self.hash.signing_digest();
        self.public_key.verify(digest.as_bytes(), &self.signature)
    }
}
