//! The command executor.
//!
//! One command at a time is applied against a store transaction. Validation
//! covers permissions and preconditions; existence checks that guard state
//! integrity and all amount arithmetic run unconditionally.

use crate::access::{DbContext, DbOp, Expect};
use crate::error::{codes, CommandError, DbError};
use meridian_store::keys;
use meridian_types::{
    AccountId, Amount, AssetId, Command, GrantablePermission, GrantablePermissionSet, Hash,
    RolePermission, RolePermissionSet,
};
use tracing::instrument;

/// Writer recorded for details set by creator-less (genesis) transactions.
const GENESIS_WRITER: &str = "genesis";

/// Stateless entry point for command execution.
pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute `command` on behalf of `creator`.
    ///
    /// With `do_validation` the creator's permissions are loaded and every
    /// authorization/precondition contract is enforced; without it the
    /// caller (block replay) is trusted.
    #[instrument(skip_all, fields(command = command.name(), tx_hash = %tx_hash, cmd_index))]
    pub fn execute(
        ctx: &mut DbContext<'_>,
        command: &Command,
        creator: Option<&AccountId>,
        tx_hash: &Hash,
        cmd_index: usize,
        do_validation: bool,
    ) -> Result<(), CommandError> {
        let wrap = |err: DbError| CommandError::from_db(command.name(), err);

        let creator_permissions = if do_validation {
            let creator = creator.ok_or_else(|| {
                CommandError::new(command.name(), codes::NO_ACCOUNT, "Missing creator account")
            })?;
            ctx.account_permissions(creator).map_err(wrap)?
        } else {
            RolePermissionSet::empty()
        };

        Self::dispatch(
            ctx,
            command,
            creator,
            do_validation,
            &creator_permissions,
        )
        .map_err(wrap)
    }

    fn dispatch(
        ctx: &mut DbContext<'_>,
        command: &Command,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        match command {
            Command::AddAssetQuantity { asset_id, amount } => {
                Self::add_asset_quantity(ctx, asset_id, amount, creator, validate, creator_permissions)
            }
            Command::AddPeer {
                public_key,
                address,
                tls_certificate,
            } => Self::add_peer(
                ctx,
                public_key,
                address,
                tls_certificate.as_deref(),
                validate,
                creator_permissions,
            ),
            Command::AddSignatory {
                account_id,
                public_key,
            } => Self::add_signatory(
                ctx,
                account_id,
                public_key,
                creator,
                validate,
                creator_permissions,
            ),
            Command::AppendRole {
                account_id,
                role_name,
            } => Self::append_role(ctx, account_id, role_name, validate, creator_permissions),
            Command::CallEngine { .. } => {
                Err(DbError::new(codes::NO_IMPLEMENTATION, "Not implemented"))
            }
            Command::CompareAndSetAccountDetail {
                account_id,
                key,
                value,
                old_value,
                check_empty,
            } => Self::compare_and_set_account_detail(
                ctx,
                account_id,
                key,
                value,
                old_value.as_deref(),
                *check_empty,
                creator,
                validate,
                creator_permissions,
            ),
            Command::CreateAccount {
                account_name,
                domain_id,
                public_key,
            } => Self::create_account(
                ctx,
                account_name,
                domain_id,
                public_key,
                validate,
                creator_permissions,
            ),
            Command::CreateAsset {
                asset_name,
                domain_id,
                precision,
            } => Self::create_asset(
                ctx,
                asset_name,
                domain_id,
                *precision,
                validate,
                creator_permissions,
            ),
            Command::CreateDomain {
                domain_id,
                default_role,
            } => Self::create_domain(ctx, domain_id, default_role, validate, creator_permissions),
            Command::CreateRole {
                role_name,
                permissions,
            } => Self::create_role(ctx, role_name, *permissions, validate, creator_permissions),
            Command::DetachRole {
                account_id,
                role_name,
            } => Self::detach_role(ctx, account_id, role_name, validate, creator_permissions),
            Command::GrantPermission {
                account_id,
                permission,
            } => Self::grant_permission(
                ctx,
                account_id,
                *permission,
                creator,
                validate,
                creator_permissions,
            ),
            Command::RemovePeer { public_key } => {
                Self::remove_peer(ctx, public_key, validate, creator_permissions)
            }
            Command::RemoveSignatory {
                account_id,
                public_key,
            } => Self::remove_signatory(
                ctx,
                account_id,
                public_key,
                creator,
                validate,
                creator_permissions,
            ),
            Command::RevokePermission {
                account_id,
                permission,
            } => Self::revoke_permission(
                ctx,
                account_id,
                *permission,
                creator,
                validate,
                creator_permissions,
            ),
            Command::SetAccountDetail {
                account_id,
                key,
                value,
            } => Self::set_account_detail(
                ctx,
                account_id,
                key,
                value,
                creator,
                validate,
                creator_permissions,
            ),
            Command::SetQuorum { account_id, quorum } => Self::set_quorum(
                ctx,
                account_id,
                *quorum,
                creator,
                validate,
                creator_permissions,
            ),
            Command::SetSettingValue { key, value } => {
                ctx.set_value(value);
                ctx.setting(DbOp::Put, Expect::CanExist, key)?;
                Ok(())
            }
            Command::SubtractAssetQuantity { asset_id, amount } => Self::subtract_asset_quantity(
                ctx,
                asset_id,
                amount,
                creator,
                validate,
                creator_permissions,
            ),
            Command::TransferAsset {
                src_account_id,
                dest_account_id,
                asset_id,
                description,
                amount,
            } => Self::transfer_asset(
                ctx,
                src_account_id,
                dest_account_id,
                asset_id,
                description,
                amount,
                creator,
                validate,
                creator_permissions,
            ),
        }
    }

    // ─────────────────────── permission helpers ───────────────────────

    /// Require one role permission (Root passes everything).
    fn check_permission(
        permissions: &RolePermissionSet,
        required: RolePermission,
    ) -> Result<(), DbError> {
        if permissions.is_set(RolePermission::Root) || permissions.is_set(required) {
            Ok(())
        } else {
            Err(DbError::new(codes::NO_PERMISSIONS, "Not enough permissions"))
        }
    }

    /// Require a role permission or a granted permission.
    fn check_grantable_permission(
        permissions: &RolePermissionSet,
        granted: &GrantablePermissionSet,
        role_perm: RolePermission,
        grantable: GrantablePermission,
    ) -> Result<(), DbError> {
        if permissions.is_set(RolePermission::Root)
            || permissions.is_set(role_perm)
            || granted.is_set(grantable)
        {
            Ok(())
        } else {
            Err(DbError::new(codes::NO_PERMISSIONS, "Not enough permissions"))
        }
    }

    /// Require the all-domain permission, or the same-domain permission when
    /// the target domain equals the creator's.
    fn check_domain_scoped_permission(
        target_domain: &str,
        creator_domain: &str,
        permissions: &RolePermissionSet,
        all_domains: RolePermission,
        same_domain: RolePermission,
    ) -> Result<(), DbError> {
        if permissions.is_set(RolePermission::Root)
            || permissions.is_set(all_domains)
            || (target_domain == creator_domain && permissions.is_set(same_domain))
        {
            Ok(())
        } else {
            Err(DbError::new(codes::NO_PERMISSIONS, "Not enough permissions"))
        }
    }

    fn require_creator<'a>(creator: Option<&'a AccountId>) -> Result<&'a AccountId, DbError> {
        creator.ok_or_else(|| DbError::new(codes::NO_ACCOUNT, "Missing creator account"))
    }

    fn granted_to_creator(
        ctx: &mut DbContext<'_>,
        creator: &AccountId,
        owner: &AccountId,
    ) -> Result<GrantablePermissionSet, DbError> {
        Ok(ctx
            .grantable(DbOp::Get, Expect::CanExist, creator, owner)?
            .unwrap_or_default())
    }

    // ─────────────────────────── commands ───────────────────────────

    fn add_asset_quantity(
        ctx: &mut DbContext<'_>,
        asset_id: &AssetId,
        amount: &Amount,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let creator = Self::require_creator(creator)?;
        if validate {
            Self::check_domain_scoped_permission(
                &asset_id.domain,
                &creator.domain,
                creator_permissions,
                RolePermission::AddAssetQty,
                RolePermission::AddDomainAssetQty,
            )?;
        }

        let precision = ctx
            .asset(DbOp::Get, Expect::MustExist, asset_id)?
            .unwrap_or_default();
        if u64::from(amount.precision()) > precision {
            return Err(DbError::new(
                codes::INVALID_ASSET_AMOUNT,
                format!("Invalid asset {asset_id} amount {amount}"),
            ));
        }

        let mut asset_size = ctx
            .account_asset_size(DbOp::Get, Expect::CanExist, creator)?
            .unwrap_or(0);

        let balance = match ctx.account_asset(DbOp::Get, Expect::CanExist, creator, asset_id)? {
            Some(raw) => parse_amount(&raw)?,
            None => {
                asset_size += 1;
                Amount::zero(precision as u8)
            }
        };

        let result = balance.checked_add(amount).map_err(|_| {
            DbError::new(
                codes::INVALID_ASSET_AMOUNT,
                format!("Invalid asset {asset_id} amount {amount}"),
            )
        })?;

        ctx.set_value(&result.to_storage_string());
        ctx.account_asset(DbOp::Put, Expect::CanExist, creator, asset_id)?;

        ctx.encode(asset_size);
        ctx.account_asset_size(DbOp::Put, Expect::CanExist, creator)?;
        Ok(())
    }

    fn add_peer(
        ctx: &mut DbContext<'_>,
        public_key: &str,
        address: &str,
        tls_certificate: Option<&str>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            Self::check_permission(creator_permissions, RolePermission::AddPeer)?;
        }

        let pubkey = public_key.to_lowercase();
        ctx.peer_address(DbOp::Check, Expect::MustNotExist, &pubkey)?;

        let count = ctx.peers_count(DbOp::Get, Expect::CanExist)?.unwrap_or(0);
        ctx.encode(count + 1);
        ctx.peers_count(DbOp::Put, Expect::CanExist)?;

        ctx.set_value(address);
        ctx.peer_address(DbOp::Put, Expect::CanExist, &pubkey)?;

        if let Some(cert) = tls_certificate {
            ctx.set_value(cert);
            ctx.peer_tls(DbOp::Put, Expect::CanExist, &pubkey)?;
        }
        Ok(())
    }

    fn add_signatory(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        public_key: &str,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            let creator = Self::require_creator(creator)?;
            let granted = Self::granted_to_creator(ctx, creator, account_id)?;
            if creator == account_id {
                Self::check_permission(creator_permissions, RolePermission::AddSignatory)?;
            } else {
                Self::check_grantable_permission(
                    creator_permissions,
                    &granted,
                    RolePermission::AddSignatory,
                    GrantablePermission::AddMySignatory,
                )?;
            }
        }

        ctx.account(DbOp::Check, Expect::MustExist, account_id)?;

        let pubkey = public_key.to_lowercase();
        ctx.signatory(DbOp::Check, Expect::MustNotExist, account_id, &pubkey)?;

        ctx.set_value("");
        ctx.signatory(DbOp::Put, Expect::CanExist, account_id, &pubkey)?;
        Ok(())
    }

    fn append_role(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        role_name: &str,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            Self::check_permission(creator_permissions, RolePermission::AppendRole)?;

            let role_permissions = ctx
                .role(DbOp::Get, Expect::MustExist, role_name)?
                .unwrap_or_default();
            if !role_permissions.is_subset_of(creator_permissions) {
                return Err(DbError::new(
                    codes::NO_PERMISSIONS,
                    "Insufficient permissions",
                ));
            }
        } else {
            ctx.role(DbOp::Check, Expect::MustExist, role_name)?;
        }

        ctx.account(DbOp::Check, Expect::MustExist, account_id)?;
        ctx.account_role(DbOp::Check, Expect::MustNotExist, account_id, role_name)?;

        ctx.set_value("");
        ctx.account_role(DbOp::Put, Expect::CanExist, account_id, role_name)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compare_and_set_account_detail(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        key: &str,
        value: &str,
        old_value: Option<&str>,
        check_empty: bool,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            let creator = Self::require_creator(creator)?;
            let granted = Self::granted_to_creator(ctx, creator, account_id)?;
            Self::check_grantable_permission(
                creator_permissions,
                &granted,
                RolePermission::GetMyAccDetail,
                GrantablePermission::SetMyAccountDetail,
            )?;
        }

        let writer = creator
            .map(|c| c.to_string())
            .unwrap_or_else(|| GENESIS_WRITER.to_owned());

        ctx.account(DbOp::Check, Expect::MustExist, account_id)?;

        // One read of the stored value; it serves both the comparison and
        // the details-count bookkeeping.
        let stored = ctx.account_detail(DbOp::Get, Expect::CanExist, account_id, &writer, key)?;

        let matches_old = match (old_value, stored.as_deref()) {
            (Some(expected), Some(current)) => expected == current,
            _ => false,
        };
        let both_absent = if check_empty {
            old_value.is_none() && stored.is_none()
        } else {
            stored.is_none()
        };

        if !(matches_old || both_absent) {
            return Err(DbError::new(
                codes::INCORRECT_OLD_VALUE,
                "Old value incorrect",
            ));
        }

        ctx.set_value(value);
        ctx.account_detail(DbOp::Put, Expect::CanExist, account_id, &writer, key)?;

        if stored.is_none() {
            let count = ctx
                .account_details_count(DbOp::Get, Expect::CanExist, account_id)?
                .unwrap_or(0);
            ctx.encode(count + 1);
            ctx.account_details_count(DbOp::Put, Expect::CanExist, account_id)?;
        }
        Ok(())
    }

    fn create_account(
        ctx: &mut DbContext<'_>,
        account_name: &str,
        domain_id: &str,
        public_key: &str,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let pubkey = public_key.to_lowercase();
        let account_id = AccountId::new(account_name, domain_id);

        if validate {
            Self::check_permission(creator_permissions, RolePermission::CreateAccount)?;
        }

        let default_role = ctx
            .domain(DbOp::Get, Expect::MustExist, domain_id)?
            .unwrap_or_default();
        let role_permissions = ctx
            .role(DbOp::Get, Expect::MustExist, &default_role)?
            .unwrap_or_default();

        // No privilege escalation through the domain's default role.
        if validate && !role_permissions.is_subset_of(creator_permissions) {
            return Err(DbError::new(
                codes::NO_PERMISSIONS,
                "Insufficient permissions",
            ));
        }

        if validate {
            ctx.account(DbOp::Check, Expect::MustNotExist, &account_id)?;
        }

        ctx.set_value("");
        ctx.account_role(DbOp::Put, Expect::CanExist, &account_id, &default_role)?;

        ctx.set_value("");
        ctx.signatory(DbOp::Put, Expect::CanExist, &account_id, &pubkey)?;

        ctx.encode(1);
        ctx.quorum(DbOp::Put, Expect::CanExist, &account_id)?;
        Ok(())
    }

    fn create_asset(
        ctx: &mut DbContext<'_>,
        asset_name: &str,
        domain_id: &str,
        precision: u8,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let asset_id = AssetId::new(asset_name, domain_id);
        if validate {
            Self::check_permission(creator_permissions, RolePermission::CreateAsset)?;
            ctx.asset(DbOp::Check, Expect::MustNotExist, &asset_id)?;
            ctx.domain(DbOp::Check, Expect::MustExist, domain_id)?;
        }

        ctx.encode(u64::from(precision));
        ctx.asset(DbOp::Put, Expect::CanExist, &asset_id)?;
        Ok(())
    }

    fn create_domain(
        ctx: &mut DbContext<'_>,
        domain_id: &str,
        default_role: &str,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            // No privilege escalation check here.
            Self::check_permission(creator_permissions, RolePermission::CreateDomain)?;
            ctx.domain(DbOp::Check, Expect::MustNotExist, domain_id)?;
            ctx.role(DbOp::Check, Expect::MustExist, default_role)?;
        }

        let count = ctx
            .domains_total_count(DbOp::Get, Expect::CanExist)?
            .unwrap_or(0);
        ctx.encode(count + 1);
        ctx.domains_total_count(DbOp::Put, Expect::CanExist)?;

        ctx.set_value(default_role);
        ctx.domain(DbOp::Put, Expect::CanExist, domain_id)?;
        Ok(())
    }

    fn create_role(
        ctx: &mut DbContext<'_>,
        role_name: &str,
        permissions: RolePermissionSet,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let mut role_permissions = permissions;
        if role_permissions.is_set(RolePermission::Root) {
            role_permissions = RolePermissionSet::all();
        }

        if validate {
            Self::check_permission(creator_permissions, RolePermission::CreateRole)?;
            if !role_permissions.is_subset_of(creator_permissions) {
                return Err(DbError::new(
                    codes::NO_PERMISSIONS,
                    "Insufficient permissions",
                ));
            }
        }

        ctx.role(DbOp::Check, Expect::MustNotExist, role_name)?;

        ctx.set_value(&role_permissions.to_bitstring());
        ctx.role(DbOp::Put, Expect::CanExist, role_name)?;
        Ok(())
    }

    fn detach_role(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        role_name: &str,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            Self::check_permission(creator_permissions, RolePermission::DetachRole)?;
        }

        ctx.role(DbOp::Check, Expect::MustExist, role_name)?;

        if validate {
            ctx.account_role(DbOp::Check, Expect::MustExist, account_id, role_name)?;
        }

        ctx.account_role(DbOp::Del, Expect::CanExist, account_id, role_name)?;
        Ok(())
    }

    fn grant_permission(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        permission: GrantablePermission,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let creator = Self::require_creator(creator)?;

        if validate {
            Self::check_permission(creator_permissions, permission.required_role_permission())?;
            ctx.account(DbOp::Check, Expect::MustExist, account_id)?;
        }

        // The granted account acts (grantee); the creator owns (grantor).
        let mut granted = ctx
            .grantable(DbOp::Get, Expect::CanExist, account_id, creator)?
            .unwrap_or_default();

        if granted.is_set(permission) {
            return Err(DbError::new(
                codes::PERMISSION_ALREADY_SET,
                "Permission is already set.",
            ));
        }

        granted.set(permission);
        ctx.set_value(&granted.to_bitstring());
        ctx.grantable(DbOp::Put, Expect::CanExist, account_id, creator)?;
        Ok(())
    }

    fn remove_peer(
        ctx: &mut DbContext<'_>,
        public_key: &str,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if public_key.is_empty() {
            return Err(DbError::new(codes::PUBLIC_KEY_EMPTY, "Pubkey empty."));
        }
        if validate {
            Self::check_permission(creator_permissions, RolePermission::RemovePeer)?;
        }

        let pubkey = public_key.to_lowercase();
        ctx.peer_address(DbOp::Check, Expect::MustExist, &pubkey)?;

        let count = ctx
            .peers_count(DbOp::Get, Expect::MustExist)?
            .unwrap_or_default();
        if count == 1 {
            return Err(DbError::new(
                codes::PEERS_COUNT_NOT_ENOUGH,
                format!("Can not remove last peer {pubkey}."),
            ));
        }

        ctx.encode(count - 1);
        ctx.peers_count(DbOp::Put, Expect::CanExist)?;

        ctx.peer_address(DbOp::Del, Expect::CanExist, &pubkey)?;
        ctx.peer_tls(DbOp::Del, Expect::CanExist, &pubkey)?;
        Ok(())
    }

    fn remove_signatory(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        public_key: &str,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let pubkey = public_key.to_lowercase();

        if validate {
            let creator = Self::require_creator(creator)?;
            let quorum = ctx
                .quorum(DbOp::Get, Expect::MustExist, account_id)?
                .unwrap_or_default();

            let granted = Self::granted_to_creator(ctx, creator, account_id)?;
            if creator == account_id {
                Self::check_permission(creator_permissions, RolePermission::RemoveSignatory)?;
            } else {
                Self::check_grantable_permission(
                    creator_permissions,
                    &granted,
                    RolePermission::RemoveSignatory,
                    GrantablePermission::RemoveMySignatory,
                )?;
            }

            ctx.signatory(DbOp::Check, Expect::MustExist, account_id, &pubkey)?;

            // The account must keep at least `quorum` signatories after the
            // removal.
            let count = ctx.signatory_count(account_id)?;
            if count <= quorum {
                return Err(DbError::new(
                    codes::COUNT_NOT_ENOUGH,
                    format!(
                        "Remove signatory {pubkey} for account {account_id} with quorum {quorum} failed."
                    ),
                ));
            }
        }

        ctx.signatory(DbOp::Del, Expect::CanExist, account_id, &pubkey)?;
        Ok(())
    }

    fn revoke_permission(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        permission: GrantablePermission,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let creator = Self::require_creator(creator)?;

        if validate {
            Self::check_permission(creator_permissions, permission.required_role_permission())?;
            ctx.account(DbOp::Check, Expect::MustExist, account_id)?;
        }

        let mut granted = ctx
            .grantable(DbOp::Get, Expect::CanExist, account_id, creator)?
            .unwrap_or_default();

        if !granted.is_set(permission) {
            return Err(DbError::new(codes::NO_PERMISSIONS, "Permission not set"));
        }

        granted.unset(permission);
        ctx.set_value(&granted.to_bitstring());
        ctx.grantable(DbOp::Put, Expect::CanExist, account_id, creator)?;
        Ok(())
    }

    fn set_account_detail(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        key: &str,
        value: &str,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            let creator = Self::require_creator(creator)?;
            if creator != account_id {
                let granted = Self::granted_to_creator(ctx, creator, account_id)?;
                Self::check_grantable_permission(
                    creator_permissions,
                    &granted,
                    RolePermission::SetDetail,
                    GrantablePermission::SetMyAccountDetail,
                )?;
            }
            ctx.account(DbOp::Check, Expect::MustExist, account_id)?;
        }

        let writer = creator
            .map(|c| c.to_string())
            .unwrap_or_else(|| GENESIS_WRITER.to_owned());

        let stored = ctx.account_detail(DbOp::Get, Expect::CanExist, account_id, &writer, key)?;

        ctx.set_value(value);
        ctx.account_detail(DbOp::Put, Expect::CanExist, account_id, &writer, key)?;

        if stored.is_none() {
            let count = ctx
                .account_details_count(DbOp::Get, Expect::CanExist, account_id)?
                .unwrap_or(0);
            ctx.encode(count + 1);
            ctx.account_details_count(DbOp::Put, Expect::CanExist, account_id)?;
        }
        Ok(())
    }

    fn set_quorum(
        ctx: &mut DbContext<'_>,
        account_id: &AccountId,
        quorum: u32,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        if validate {
            let creator = Self::require_creator(creator)?;
            ctx.account(DbOp::Check, Expect::MustExist, account_id)?;

            let granted = Self::granted_to_creator(ctx, creator, account_id)?;
            Self::check_grantable_permission(
                creator_permissions,
                &granted,
                RolePermission::SetQuorum,
                GrantablePermission::SetMyQuorum,
            )?;
        }

        if quorum == 0 {
            return Err(DbError::new(
                codes::COUNT_NOT_ENOUGH,
                "Quorum must be positive.",
            ));
        }

        let count = ctx.signatory_count(account_id)?;
        if u64::from(quorum) > count {
            return Err(DbError::new(
                codes::COUNT_NOT_ENOUGH,
                format!("Quorum value more than signatories. SetQuorum {account_id} {quorum}"),
            ));
        }

        ctx.encode(u64::from(quorum));
        ctx.quorum(DbOp::Put, Expect::CanExist, account_id)?;
        Ok(())
    }

    fn subtract_asset_quantity(
        ctx: &mut DbContext<'_>,
        asset_id: &AssetId,
        amount: &Amount,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        let creator = Self::require_creator(creator)?;
        if validate {
            Self::check_domain_scoped_permission(
                &asset_id.domain,
                &creator.domain,
                creator_permissions,
                RolePermission::SubtractAssetQty,
                RolePermission::SubtractDomainAssetQty,
            )?;
        }

        let precision = ctx
            .asset(DbOp::Get, Expect::MustExist, asset_id)?
            .unwrap_or_default();
        if precision < u64::from(amount.precision()) {
            return Err(DbError::new(
                codes::INVALID_AMOUNT,
                format!(
                    "Invalid precision of asset: {asset_id} from: {creator}. Expected: {precision}, but got: {got}",
                    got = amount.precision()
                ),
            ));
        }

        let balance = match ctx.account_asset(DbOp::Get, Expect::CanExist, creator, asset_id)? {
            Some(raw) => parse_amount(&raw)?,
            None => Amount::zero(precision as u8),
        };

        let result = balance.checked_sub(amount).map_err(|_| {
            DbError::new(
                codes::INVALID_AMOUNT,
                format!("Invalid SubtractAssetQuantity amount {amount} from {creator}"),
            )
        })?;

        ctx.set_value(&result.to_storage_string());
        ctx.account_asset(DbOp::Put, Expect::CanExist, creator, asset_id)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer_asset(
        ctx: &mut DbContext<'_>,
        src_account_id: &AccountId,
        dest_account_id: &AccountId,
        asset_id: &AssetId,
        description: &str,
        amount: &Amount,
        creator: Option<&AccountId>,
        validate: bool,
        creator_permissions: &RolePermissionSet,
    ) -> Result<(), DbError> {
        ctx.account(DbOp::Check, Expect::MustExist, dest_account_id)?;
        ctx.account(DbOp::Check, Expect::MustExist, src_account_id)?;

        if validate {
            let creator = Self::require_creator(creator)?;

            let destination_permissions = ctx.account_permissions(dest_account_id)?;
            if !destination_permissions.is_set(RolePermission::Receive)
                && !destination_permissions.is_set(RolePermission::Root)
            {
                return Err(DbError::new(
                    codes::NO_PERMISSIONS,
                    format!("Not enough permissions. TransferAsset to {dest_account_id}"),
                ));
            }

            if src_account_id != creator {
                let granted = Self::granted_to_creator(ctx, creator, src_account_id)?;
                Self::check_grantable_permission(
                    creator_permissions,
                    &granted,
                    RolePermission::Transfer,
                    GrantablePermission::TransferMyAssets,
                )?;
            } else {
                Self::check_permission(creator_permissions, RolePermission::Transfer)?;
            }

            ctx.asset(DbOp::Check, Expect::MustExist, asset_id)?;

            if let Some(raw) =
                ctx.setting(DbOp::Get, Expect::CanExist, keys::MAX_DESCRIPTION_SIZE_KEY)?
            {
                let max = meridian_store::codec::decode_u64(&raw)
                    .map_err(|e| DbError::new(codes::STORE_FAILURE, e.to_string()))?;
                if description.len() as u64 > max {
                    return Err(DbError::new(
                        codes::INVALID_FIELD_SIZE,
                        "Too big description",
                    ));
                }
            }
        }

        let source_raw = ctx
            .account_asset(DbOp::Get, Expect::MustExist, src_account_id, asset_id)?
            .unwrap_or_default();
        let source_balance = parse_amount(&source_raw)?;

        let new_source_balance = source_balance
            .checked_sub(amount)
            .map_err(|_| DbError::new(codes::NOT_ENOUGH_ASSETS, "Not enough assets"))?;

        let mut dest_asset_size = ctx
            .account_asset_size(DbOp::Get, Expect::CanExist, dest_account_id)?
            .unwrap_or(0);

        let destination_balance = match ctx.account_asset(
            DbOp::Get,
            Expect::CanExist,
            dest_account_id,
            asset_id,
        )? {
            Some(raw) => parse_amount(&raw)?,
            None => {
                dest_asset_size += 1;
                Amount::zero(source_balance.precision())
            }
        };

        let new_destination_balance = destination_balance
            .checked_add(amount)
            .map_err(|_| DbError::new(codes::INCORRECT_BALANCE, "Incorrect balance"))?;

        ctx.set_value(&new_source_balance.to_storage_string());
        ctx.account_asset(DbOp::Put, Expect::CanExist, src_account_id, asset_id)?;

        ctx.set_value(&new_destination_balance.to_storage_string());
        ctx.account_asset(DbOp::Put, Expect::CanExist, dest_account_id, asset_id)?;

        ctx.encode(dest_asset_size);
        ctx.account_asset_size(DbOp::Put, Expect::CanExist, dest_account_id)?;
        Ok(())
    }
}

fn parse_amount(raw: &str) -> Result<Amount, DbError> {
    Amount::parse(raw)
        .map_err(|e| DbError::new(codes::STORE_FAILURE, format!("Corrupt stored amount: {e}")))
}
