//! Typed store access helpers.
//!
//! Every WSV access from the executor is one of four operations crossed with
//! an expected-entry policy, routed through a single generic helper. The
//! typed wrappers bind the key template, the value codec and the domain
//! error code reported when the expectation fails.
//!
//! Writes go through the context's value buffer: the caller stages the value
//! with [`DbContext::set_value`] or [`DbContext::encode`], then issues a
//! `Put`.

use crate::error::{codes, DbError};
use meridian_store::{codec, keys, KvTransaction, StoreError};
use meridian_types::{AccountId, AssetId, GrantablePermissionSet, RolePermissionSet};

/// Store operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOp {
    /// Return the value (or absence).
    Get,
    /// Assert presence/absence only.
    Check,
    /// Write the staged value buffer.
    Put,
    /// Delete the key.
    Del,
}

/// Expected entry policy for an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    MustExist,
    MustNotExist,
    CanExist,
}

/// Access context over one store transaction.
///
/// Owns the shared value buffer used by `Put` operations and the u64 scalar
/// codec.
pub struct DbContext<'t> {
    tx: &'t mut dyn KvTransaction,
    value: String,
}

impl<'t> DbContext<'t> {
    pub fn new(tx: &'t mut dyn KvTransaction) -> Self {
        DbContext {
            tx,
            value: String::new(),
        }
    }

    /// Stage a string value for the next `Put`.
    pub fn set_value(&mut self, value: &str) {
        self.value.clear();
        self.value.push_str(value);
    }

    /// Stage an encoded u64 for the next `Put`.
    pub fn encode(&mut self, value: u64) {
        self.value = codec::encode_u64(value);
    }

    /// Direct access to the underlying transaction (savepoints, iteration).
    pub fn tx(&mut self) -> &mut dyn KvTransaction {
        &mut *self.tx
    }

    /// The generic access helper: one operation, one expectation, one key.
    ///
    /// `entity` names the touched entity in error messages; `absent_code` and
    /// `exists_code` tag expectation failures.
    pub fn access(
        &mut self,
        op: DbOp,
        expect: Expect,
        key: &str,
        entity: &str,
        absent_code: u32,
        exists_code: u32,
    ) -> Result<Option<String>, DbError> {
        let existing = self.tx.get(key).map_err(store_failure)?;

        match expect {
            Expect::MustExist if existing.is_none() => {
                return Err(DbError::new(
                    absent_code,
                    format!("{entity} does not exist: {key}"),
                ));
            }
            Expect::MustNotExist if existing.is_some() => {
                return Err(DbError::new(
                    exists_code,
                    format!("{entity} already exists: {key}"),
                ));
            }
            _ => {}
        }

        match op {
            DbOp::Get => Ok(existing),
            DbOp::Check => Ok(None),
            DbOp::Put => {
                self.tx.put(key, &self.value);
                Ok(None)
            }
            DbOp::Del => {
                self.tx.delete(key);
                Ok(None)
            }
        }
    }

    /// Count keys under a prefix.
    pub fn count_prefix(&mut self, prefix: &str) -> Result<u64, DbError> {
        let mut count = 0u64;
        self.tx
            .iterate_prefix(prefix, &mut |_, _| {
                count += 1;
                true
            })
            .map_err(store_failure)?;
        Ok(count)
    }

    // ───────────────────────── typed helpers ─────────────────────────

    /// Account marker / quorum value.
    pub fn quorum(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AccountId,
    ) -> Result<Option<u64>, DbError> {
        self.access(
            op,
            expect,
            &keys::account(id),
            "account",
            codes::NO_ACCOUNT,
            codes::ENTITY_ALREADY_EXISTS,
        )?
        .map(|v| decode(&v))
        .transpose()
    }

    /// Account existence only.
    pub fn account(&mut self, op: DbOp, expect: Expect, id: &AccountId) -> Result<(), DbError> {
        self.access(
            op,
            expect,
            &keys::account(id),
            "account",
            codes::NO_ACCOUNT,
            codes::ENTITY_ALREADY_EXISTS,
        )?;
        Ok(())
    }

    pub fn signatory(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AccountId,
        pubkey: &str,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::signatory(id, pubkey),
            "signatory",
            codes::NO_SIGNATORY,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    pub fn signatory_count(&mut self, id: &AccountId) -> Result<u64, DbError> {
        self.count_prefix(&keys::signatories_prefix(id))
    }

    pub fn account_role(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AccountId,
        role: &str,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::account_role(id, role),
            "account role",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    pub fn account_asset(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AccountId,
        asset: &AssetId,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::account_asset(id, asset),
            "account asset",
            codes::NOT_ENOUGH_ASSETS,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    pub fn account_asset_size(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AccountId,
    ) -> Result<Option<u64>, DbError> {
        self.access(
            op,
            expect,
            &keys::account_asset_size(id),
            "account asset size",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )?
        .map(|v| decode(&v))
        .transpose()
    }

    pub fn account_detail(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AccountId,
        writer: &str,
        key: &str,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::account_detail(id, writer, key),
            "account detail",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    pub fn account_details_count(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AccountId,
    ) -> Result<Option<u64>, DbError> {
        self.access(
            op,
            expect,
            &keys::account_details_count(id),
            "account details count",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )?
        .map(|v| decode(&v))
        .transpose()
    }

    /// Domain record; the value is the domain's default role.
    pub fn domain(
        &mut self,
        op: DbOp,
        expect: Expect,
        domain_id: &str,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::domain(domain_id),
            "domain",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    pub fn domains_total_count(
        &mut self,
        op: DbOp,
        expect: Expect,
    ) -> Result<Option<u64>, DbError> {
        self.access(
            op,
            expect,
            keys::DOMAINS_TOTAL_COUNT,
            "domains total count",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )?
        .map(|v| decode(&v))
        .transpose()
    }

    /// Asset record; the value is the asset's precision.
    pub fn asset(
        &mut self,
        op: DbOp,
        expect: Expect,
        id: &AssetId,
    ) -> Result<Option<u64>, DbError> {
        self.access(
            op,
            expect,
            &keys::asset(id),
            "asset",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )?
        .map(|v| decode(&v))
        .transpose()
    }

    /// Role record; the value is the role's permission bitstring.
    pub fn role(
        &mut self,
        op: DbOp,
        expect: Expect,
        name: &str,
    ) -> Result<Option<RolePermissionSet>, DbError> {
        self.access(
            op,
            expect,
            &keys::role(name),
            "role",
            codes::NO_ENTITY,
            codes::ROLE_ALREADY_EXISTS,
        )?
        .map(|v| {
            RolePermissionSet::from_bitstring(&v)
                .map_err(|e| DbError::new(codes::STORE_FAILURE, e.to_string()))
        })
        .transpose()
    }

    pub fn grantable(
        &mut self,
        op: DbOp,
        expect: Expect,
        grantee: &AccountId,
        grantor: &AccountId,
    ) -> Result<Option<GrantablePermissionSet>, DbError> {
        self.access(
            op,
            expect,
            &keys::grantable(grantee, grantor),
            "grantable permissions",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )?
        .map(|v| {
            GrantablePermissionSet::from_bitstring(&v)
                .map_err(|e| DbError::new(codes::STORE_FAILURE, e.to_string()))
        })
        .transpose()
    }

    pub fn peer_address(
        &mut self,
        op: DbOp,
        expect: Expect,
        pubkey: &str,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::peer_address(pubkey),
            "peer",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    pub fn peer_tls(
        &mut self,
        op: DbOp,
        expect: Expect,
        pubkey: &str,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::peer_tls(pubkey),
            "peer TLS certificate",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    pub fn peers_count(&mut self, op: DbOp, expect: Expect) -> Result<Option<u64>, DbError> {
        self.access(
            op,
            expect,
            keys::PEERS_COUNT,
            "peers count",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )?
        .map(|v| decode(&v))
        .transpose()
    }

    pub fn setting(
        &mut self,
        op: DbOp,
        expect: Expect,
        key: &str,
    ) -> Result<Option<String>, DbError> {
        self.access(
            op,
            expect,
            &keys::setting(key),
            "setting",
            codes::NO_ENTITY,
            codes::ENTITY_ALREADY_EXISTS,
        )
    }

    /// Union of the permission sets of every role held by `id`.
    ///
    /// Fails with `NO_ACCOUNT` when the account does not exist.
    pub fn account_permissions(&mut self, id: &AccountId) -> Result<RolePermissionSet, DbError> {
        self.account(DbOp::Check, Expect::MustExist, id)?;

        let mut role_names = Vec::new();
        let prefix = keys::account_roles_prefix(id);
        self.tx
            .iterate_prefix(&prefix, &mut |key, _| {
                if let Some(name) = key.rsplit('/').next() {
                    role_names.push(name.to_owned());
                }
                true
            })
            .map_err(store_failure)?;

        let mut permissions = RolePermissionSet::empty();
        for name in role_names {
            if let Some(role_perms) = self.role(DbOp::Get, Expect::MustExist, &name)? {
                for p in meridian_types::RolePermission::ALL {
                    if role_perms.is_set(p) {
                        permissions.set(p);
                    }
                }
            }
        }
        Ok(permissions)
    }
}

fn decode(value: &str) -> Result<u64, DbError> {
    codec::decode_u64(value).map_err(store_failure)
}

fn store_failure(err: StoreError) -> DbError {
    DbError::new(codes::STORE_FAILURE, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_store::{MemoryStore, WsvStore};
    use meridian_types::RolePermission;

    #[test]
    fn must_exist_reports_domain_code() {
        let store = MemoryStore::new();
        let mut tx = store.begin();
        let mut ctx = DbContext::new(tx.as_mut());
        let alice = AccountId::new("alice", "wonderland");
        let err = ctx
            .quorum(DbOp::Get, Expect::MustExist, &alice)
            .unwrap_err();
        assert_eq!(err.code, codes::NO_ACCOUNT);
    }

    #[test]
    fn must_not_exist_detects_duplicates() {
        let store = MemoryStore::new();
        let mut tx = store.begin();
        let mut ctx = DbContext::new(tx.as_mut());
        ctx.set_value(&RolePermissionSet::all().to_bitstring());
        ctx.role(DbOp::Put, Expect::CanExist, "admin").unwrap();
        let err = ctx
            .role(DbOp::Check, Expect::MustNotExist, "admin")
            .unwrap_err();
        assert_eq!(err.code, codes::ROLE_ALREADY_EXISTS);
    }

    #[test]
    fn account_permissions_union_over_roles() {
        let store = MemoryStore::new();
        let mut tx = store.begin();
        let alice = AccountId::new("alice", "wonderland");
        {
            let mut ctx = DbContext::new(tx.as_mut());
            ctx.encode(1);
            ctx.quorum(DbOp::Put, Expect::CanExist, &alice).unwrap();
            ctx.set_value(
                &RolePermissionSet::from_iter([RolePermission::Transfer]).to_bitstring(),
            );
            ctx.role(DbOp::Put, Expect::CanExist, "payer").unwrap();
            ctx.set_value(
                &RolePermissionSet::from_iter([RolePermission::Receive]).to_bitstring(),
            );
            ctx.role(DbOp::Put, Expect::CanExist, "payee").unwrap();
            ctx.set_value("");
            ctx.account_role(DbOp::Put, Expect::CanExist, &alice, "payer")
                .unwrap();
            ctx.set_value("");
            ctx.account_role(DbOp::Put, Expect::CanExist, &alice, "payee")
                .unwrap();

            let perms = ctx.account_permissions(&alice).unwrap();
            assert!(perms.is_set(RolePermission::Transfer));
            assert!(perms.is_set(RolePermission::Receive));
            assert!(!perms.is_set(RolePermission::AddPeer));
        }
    }
}
