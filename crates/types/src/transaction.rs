//! Transactions and the domain command set.

use crate::hash::FieldHasher;
use crate::{AccountId, Amount, AssetId, GrantablePermission, Hash, PublicKey, RolePermissionSet,
    Signature};
use serde::{Deserialize, Serialize};

/// The closed set of domain commands.
///
/// Every state transition of the WSV is expressed as one of these. The
/// executor dispatches over this enum exhaustively; adding a variant is a
/// protocol change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    AddAssetQuantity {
        asset_id: AssetId,
        amount: Amount,
    },
    AddPeer {
        public_key: String,
        address: String,
        tls_certificate: Option<String>,
    },
    AddSignatory {
        account_id: AccountId,
        public_key: String,
    },
    AppendRole {
        account_id: AccountId,
        role_name: String,
    },
    CallEngine {
        callee: String,
        input: String,
    },
    CompareAndSetAccountDetail {
        account_id: AccountId,
        key: String,
        value: String,
        old_value: Option<String>,
        check_empty: bool,
    },
    CreateAccount {
        account_name: String,
        domain_id: String,
        public_key: String,
    },
    CreateAsset {
        asset_name: String,
        domain_id: String,
        precision: u8,
    },
    CreateDomain {
        domain_id: String,
        default_role: String,
    },
    CreateRole {
        role_name: String,
        permissions: RolePermissionSet,
    },
    DetachRole {
        account_id: AccountId,
        role_name: String,
    },
    GrantPermission {
        account_id: AccountId,
        permission: GrantablePermission,
    },
    RemovePeer {
        public_key: String,
    },
    RemoveSignatory {
        account_id: AccountId,
        public_key: String,
    },
    RevokePermission {
        account_id: AccountId,
        permission: GrantablePermission,
    },
    SetAccountDetail {
        account_id: AccountId,
        key: String,
        value: String,
    },
    SetQuorum {
        account_id: AccountId,
        quorum: u32,
    },
    SetSettingValue {
        key: String,
        value: String,
    },
    SubtractAssetQuantity {
        asset_id: AssetId,
        amount: Amount,
    },
    TransferAsset {
        src_account_id: AccountId,
        dest_account_id: AccountId,
        asset_id: AssetId,
        description: String,
        amount: Amount,
    },
}

impl Command {
    /// Stable textual name, used in error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddAssetQuantity { .. } => "AddAssetQuantity",
            Command::AddPeer { .. } => "AddPeer",
            Command::AddSignatory { .. } => "AddSignatory",
            Command::AppendRole { .. } => "AppendRole",
            Command::CallEngine { .. } => "CallEngine",
            Command::CompareAndSetAccountDetail { .. } => "CompareAndSetAccountDetail",
            Command::CreateAccount { .. } => "CreateAccount",
            Command::CreateAsset { .. } => "CreateAsset",
            Command::CreateDomain { .. } => "CreateDomain",
            Command::CreateRole { .. } => "CreateRole",
            Command::DetachRole { .. } => "DetachRole",
            Command::GrantPermission { .. } => "GrantPermission",
            Command::RemovePeer { .. } => "RemovePeer",
            Command::RemoveSignatory { .. } => "RemoveSignatory",
            Command::RevokePermission { .. } => "RevokePermission",
            Command::SetAccountDetail { .. } => "SetAccountDetail",
            Command::SetQuorum { .. } => "SetQuorum",
            Command::SetSettingValue { .. } => "SetSettingValue",
            Command::SubtractAssetQuantity { .. } => "SubtractAssetQuantity",
            Command::TransferAsset { .. } => "TransferAsset",
        }
    }
}

/// One signature over a transaction payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// A signed list of commands from one creator.
///
/// Genesis transactions may have no creator and no signatures; they are only
/// accepted inside block 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub creator: Option<AccountId>,
    pub created_time_ms: u64,
    /// Number of signatures required before the transaction leaves the
    /// pending pool.
    pub quorum: u32,
    pub commands: Vec<Command>,
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// Digest over the payload (creator, time, quorum, commands).
    ///
    /// Signatures are excluded so that adding one does not change the
    /// transaction's identity.
    pub fn payload_hash(&self) -> Hash {
        FieldHasher::new("meridian.tx.v1")
            .field(&self.creator)
            .field(&self.created_time_ms)
            .field(&self.quorum)
            .field(&self.commands)
            .finish()
    }

    /// Transaction identity; alias of [`Self::payload_hash`].
    pub fn hash(&self) -> Hash {
        self.payload_hash()
    }

    /// Whether the transaction carries at least `quorum` distinct signatures.
    pub fn has_quorum(&self) -> bool {
        let mut keys: Vec<&PublicKey> = self.signatures.iter().map(|s| &s.public_key).collect();
        keys.sort();
        keys.dedup();
        keys.len() as u64 >= u64::from(self.quorum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    fn sample_tx() -> Transaction {
        Transaction {
            creator: Some(AccountId::new("alice", "wonderland")),
            created_time_ms: 1_700_000_000_000,
            quorum: 2,
            commands: vec![Command::SetSettingValue {
                key: "max_description_size".into(),
                value: "64".into(),
            }],
            signatures: vec![],
        }
    }

    #[test]
    fn hash_ignores_signatures() {
        let tx = sample_tx();
        let before = tx.hash();

        let kp = KeyPair::from_seed(&[1u8; 32]);
        let mut signed = tx.clone();
        signed.signatures.push(TransactionSignature {
            public_key: kp.public_key(),
            signature: kp.sign(before.as_bytes()),
        });
        assert_eq!(signed.hash(), before);
    }

    #[test]
    fn hash_depends_on_commands() {
        let a = sample_tx();
        let mut b = sample_tx();
        b.commands.push(Command::CreateDomain {
            domain_id: "looking-glass".into(),
            default_role: "user".into(),
        });
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn quorum_counts_distinct_keys() {
        let mut tx = sample_tx();
        let kp = KeyPair::from_seed(&[2u8; 32]);
        let sig = TransactionSignature {
            public_key: kp.public_key(),
            signature: kp.sign(tx.hash().as_bytes()),
        };
        tx.signatures = vec![sig, sig];
        assert!(!tx.has_quorum(), "duplicate keys must not count twice");

        let kp2 = KeyPair::from_seed(&[3u8; 32]);
        tx.signatures.push(TransactionSignature {
            public_key: kp2.public_key(),
            signature: kp2.sign(tx.hash().as_bytes()),
        });
        assert!(tx.has_quorum());
    }
}
