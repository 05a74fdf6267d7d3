//! Role and grantable permission sets.
//!
//! Role permissions are a fixed enumerated set stored as a `'0'`/`'1'`
//! bitstring per role. Grantable permissions are held per (grantee, grantor)
//! pair; each grantable permission maps to the role permission required to
//! grant or revoke it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a permission bitstring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionParseError {
    #[error("Bitstring has wrong length: expected {expected}, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("Bitstring may contain only '0' and '1'")]
    BadCharacter,
}

/// Role permissions.
///
/// `Root` implies every other permission; setting it sets all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RolePermission {
    Root = 0,
    AddPeer,
    RemovePeer,
    CreateAccount,
    CreateAsset,
    CreateDomain,
    CreateRole,
    AppendRole,
    DetachRole,
    AddAssetQty,
    AddDomainAssetQty,
    SubtractAssetQty,
    SubtractDomainAssetQty,
    Transfer,
    Receive,
    AddSignatory,
    RemoveSignatory,
    SetQuorum,
    SetDetail,
    GetMyAccDetail,
    GrantAddMySignatory,
    GrantRemoveMySignatory,
    GrantSetMyQuorum,
    GrantSetMyAccountDetail,
    GrantTransferMyAssets,
}

impl RolePermission {
    /// All permissions, in bit order.
    pub const ALL: [RolePermission; 25] = [
        RolePermission::Root,
        RolePermission::AddPeer,
        RolePermission::RemovePeer,
        RolePermission::CreateAccount,
        RolePermission::CreateAsset,
        RolePermission::CreateDomain,
        RolePermission::CreateRole,
        RolePermission::AppendRole,
        RolePermission::DetachRole,
        RolePermission::AddAssetQty,
        RolePermission::AddDomainAssetQty,
        RolePermission::SubtractAssetQty,
        RolePermission::SubtractDomainAssetQty,
        RolePermission::Transfer,
        RolePermission::Receive,
        RolePermission::AddSignatory,
        RolePermission::RemoveSignatory,
        RolePermission::SetQuorum,
        RolePermission::SetDetail,
        RolePermission::GetMyAccDetail,
        RolePermission::GrantAddMySignatory,
        RolePermission::GrantRemoveMySignatory,
        RolePermission::GrantSetMyQuorum,
        RolePermission::GrantSetMyAccountDetail,
        RolePermission::GrantTransferMyAssets,
    ];

    const COUNT: usize = Self::ALL.len();

    fn bit(self) -> u32 {
        self as u32
    }
}

/// Grantable permissions: rights one account confers on another over itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GrantablePermission {
    AddMySignatory = 0,
    RemoveMySignatory,
    SetMyQuorum,
    SetMyAccountDetail,
    TransferMyAssets,
}

impl GrantablePermission {
    pub const ALL: [GrantablePermission; 5] = [
        GrantablePermission::AddMySignatory,
        GrantablePermission::RemoveMySignatory,
        GrantablePermission::SetMyQuorum,
        GrantablePermission::SetMyAccountDetail,
        GrantablePermission::TransferMyAssets,
    ];

    const COUNT: usize = Self::ALL.len();

    fn bit(self) -> u32 {
        self as u32
    }

    /// The role permission required to grant or revoke this permission.
    pub fn required_role_permission(self) -> RolePermission {
        match self {
            GrantablePermission::AddMySignatory => RolePermission::GrantAddMySignatory,
            GrantablePermission::RemoveMySignatory => RolePermission::GrantRemoveMySignatory,
            GrantablePermission::SetMyQuorum => RolePermission::GrantSetMyQuorum,
            GrantablePermission::SetMyAccountDetail => RolePermission::GrantSetMyAccountDetail,
            GrantablePermission::TransferMyAssets => RolePermission::GrantTransferMyAssets,
        }
    }
}

/// A set of role permissions, bitset-backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RolePermissionSet(u32);

impl RolePermissionSet {
    pub fn empty() -> Self {
        RolePermissionSet(0)
    }

    /// A set with every permission, `Root` included.
    pub fn all() -> Self {
        RolePermissionSet((1u32 << RolePermission::COUNT) - 1)
    }

    pub fn from_iter(perms: impl IntoIterator<Item = RolePermission>) -> Self {
        let mut set = Self::empty();
        for p in perms {
            set.set(p);
        }
        set
    }

    /// Set a permission. Setting `Root` sets everything.
    pub fn set(&mut self, p: RolePermission) {
        if p == RolePermission::Root {
            *self = Self::all();
        } else {
            self.0 |= 1 << p.bit();
        }
    }

    pub fn unset(&mut self, p: RolePermission) {
        self.0 &= !(1 << p.bit());
    }

    pub fn is_set(&self, p: RolePermission) -> bool {
        self.0 & (1 << p.bit()) != 0
    }

    pub fn is_subset_of(&self, other: &RolePermissionSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// `'0'`/`'1'` bitstring, one character per permission in bit order.
    pub fn to_bitstring(&self) -> String {
        (0..RolePermission::COUNT)
            .map(|i| if self.0 & (1 << i) != 0 { '1' } else { '0' })
            .collect()
    }

    pub fn from_bitstring(s: &str) -> Result<Self, PermissionParseError> {
        parse_bits(s, RolePermission::COUNT).map(RolePermissionSet)
    }
}

/// A set of grantable permissions, bitset-backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrantablePermissionSet(u32);

impl GrantablePermissionSet {
    pub fn empty() -> Self {
        GrantablePermissionSet(0)
    }

    pub fn set(&mut self, p: GrantablePermission) {
        self.0 |= 1 << p.bit();
    }

    pub fn unset(&mut self, p: GrantablePermission) {
        self.0 &= !(1 << p.bit());
    }

    pub fn is_set(&self, p: GrantablePermission) -> bool {
        self.0 & (1 << p.bit()) != 0
    }

    pub fn to_bitstring(&self) -> String {
        (0..GrantablePermission::COUNT)
            .map(|i| if self.0 & (1 << i) != 0 { '1' } else { '0' })
            .collect()
    }

    pub fn from_bitstring(s: &str) -> Result<Self, PermissionParseError> {
        parse_bits(s, GrantablePermission::COUNT).map(GrantablePermissionSet)
    }
}

fn parse_bits(s: &str, expected: usize) -> Result<u32, PermissionParseError> {
    if s.len() != expected {
        return Err(PermissionParseError::WrongLength {
            expected,
            got: s.len(),
        });
    }
    let mut bits = 0u32;
    for (i, c) in s.chars().enumerate() {
        match c {
            '1' => bits |= 1 << i,
            '0' => {}
            _ => return Err(PermissionParseError::BadCharacter),
        }
    }
    Ok(bits)
}
