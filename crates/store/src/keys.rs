//! WSV key templates.
//!
//! The template set is fixed and exhaustive; every store access goes through
//! one of these builders. The layout is part of the persisted format and
//! must remain stable across restarts.

use meridian_types::{AccountId, AssetId, Hash};

/// `accounts/{domain}/{account}` → quorum. Presence of the key is the
/// account's existence marker.
pub fn account(id: &AccountId) -> String {
    format!("accounts/{}/{}", id.domain, id.name)
}

/// `signatories/{domain}/{account}/{pubkey}` → "".
pub fn signatory(id: &AccountId, pubkey: &str) -> String {
    format!("signatories/{}/{}/{}", id.domain, id.name, pubkey)
}

/// Prefix for enumerating an account's signatories.
pub fn signatories_prefix(id: &AccountId) -> String {
    format!("signatories/{}/{}/", id.domain, id.name)
}

/// `account_roles/{domain}/{account}/{role}` → "".
pub fn account_role(id: &AccountId, role: &str) -> String {
    format!("account_roles/{}/{}/{}", id.domain, id.name, role)
}

/// Prefix for enumerating an account's roles.
pub fn account_roles_prefix(id: &AccountId) -> String {
    format!("account_roles/{}/{}/", id.domain, id.name)
}

/// `account_assets/{domain}/{account}/{asset_id}` → amount string.
pub fn account_asset(id: &AccountId, asset: &AssetId) -> String {
    format!("account_assets/{}/{}/{}", id.domain, id.name, asset)
}

/// `asset_size/{domain}/{account}` → number of distinct assets held.
pub fn account_asset_size(id: &AccountId) -> String {
    format!("asset_size/{}/{}", id.domain, id.name)
}

/// `details/{domain}/{account}/{writer}/{key}` → value.
pub fn account_detail(id: &AccountId, writer: &str, key: &str) -> String {
    format!("details/{}/{}/{}/{}", id.domain, id.name, writer, key)
}

/// `details_count/{domain}/{account}` → number of stored details.
pub fn account_details_count(id: &AccountId) -> String {
    format!("details_count/{}/{}", id.domain, id.name)
}

/// `domains/{domain}` → default role name.
pub fn domain(domain_id: &str) -> String {
    format!("domains/{domain_id}")
}

/// Total number of domains.
pub const DOMAINS_TOTAL_COUNT: &str = "domains_total_count";

/// `assets/{domain}/{asset}` → precision.
pub fn asset(id: &AssetId) -> String {
    format!("assets/{}/{}", id.domain, id.name)
}

/// `roles/{role}` → role permission bitstring.
pub fn role(name: &str) -> String {
    format!("roles/{name}")
}

/// `grantable/{grantee_domain}/{grantee}/{grantor_domain}/{grantor}` →
/// grantable permission bitstring. The grantee is the account that was
/// granted rights; the grantor owns the account the rights apply to.
pub fn grantable(grantee: &AccountId, grantor: &AccountId) -> String {
    format!(
        "grantable/{}/{}/{}/{}",
        grantee.domain, grantee.name, grantor.domain, grantor.name
    )
}

/// `peers/address/{pubkey}` → network address.
pub fn peer_address(pubkey: &str) -> String {
    format!("peers/address/{pubkey}")
}

/// Prefix for enumerating all peers.
pub const PEERS_ADDRESS_PREFIX: &str = "peers/address/";

/// `peers/tls/{pubkey}` → TLS certificate.
pub fn peer_tls(pubkey: &str) -> String {
    format!("peers/tls/{pubkey}")
}

/// Total number of peers.
pub const PEERS_COUNT: &str = "peers/count";

/// `settings/{key}` → value.
pub fn setting(key: &str) -> String {
    format!("settings/{key}")
}

/// Settings key bounding TransferAsset descriptions.
pub const MAX_DESCRIPTION_SIZE_KEY: &str = "max_description_size";

/// `tx_status/{hash}` → "committed" | "rejected".
pub fn tx_status(hash: &Hash) -> String {
    format!("tx_status/{}", hash.to_hex())
}

/// Height of the highest block applied to the WSV.
pub const LEDGER_HEIGHT: &str = "ledger/height";

/// Hash of the highest block applied to the WSV.
pub const LEDGER_TOP_HASH: &str = "ledger/top_hash";
