//! Command execution tests over an in-memory WSV.
//!
//! The fixture bootstraps the ledger with a genesis block (no validation) and
//! then drives individual commands with validation enabled.

use meridian_executor::{codes, read_ledger_state, BlockApplier, CommandExecutor, DbContext};
use meridian_store::{codec, keys, MemoryStore, WsvStore};
use meridian_types::{
    AccountId, Amount, AssetId, Block, Command, GrantablePermission, Hash, RolePermission,
    RolePermissionSet, Transaction,
};

fn alice() -> AccountId {
    AccountId::new("alice", "wonderland")
}

fn bob() -> AccountId {
    AccountId::new("bob", "wonderland")
}

fn coin() -> AssetId {
    AssetId::new("coin", "wonderland")
}

fn genesis_tx(creator: Option<AccountId>, commands: Vec<Command>) -> Transaction {
    Transaction {
        creator,
        created_time_ms: 0,
        quorum: 1,
        commands,
        signatures: vec![],
    }
}

fn genesis_block(transactions: Vec<Transaction>) -> Block {
    Block {
        height: 1,
        prev_hash: Hash::ZERO,
        created_time_ms: 0,
        transactions,
        rejected_tx_hashes: vec![],
        signatures: vec![],
    }
}

/// Genesis: admin role (all permissions), user role (Receive only), one
/// domain, alice (admin) and bob (user), a 2-digit asset, peers, and 100.00
/// coin on alice.
fn genesis() -> Block {
    let setup = genesis_tx(
        None,
        vec![
            Command::CreateRole {
                role_name: "admin".into(),
                permissions: RolePermissionSet::all(),
            },
            Command::CreateRole {
                role_name: "user".into(),
                permissions: RolePermissionSet::from_iter([RolePermission::Receive]),
            },
            Command::CreateDomain {
                domain_id: "wonderland".into(),
                default_role: "user".into(),
            },
            Command::CreateAccount {
                account_name: "alice".into(),
                domain_id: "wonderland".into(),
                public_key: "AA11".into(),
            },
            Command::AppendRole {
                account_id: alice(),
                role_name: "admin".into(),
            },
            Command::CreateAccount {
                account_name: "bob".into(),
                domain_id: "wonderland".into(),
                public_key: "bb22".into(),
            },
            Command::CreateAsset {
                asset_name: "coin".into(),
                domain_id: "wonderland".into(),
                precision: 2,
            },
            Command::AddPeer {
                public_key: "p1".into(),
                address: "127.0.0.1:10001".into(),
                tls_certificate: None,
            },
            Command::AddPeer {
                public_key: "p2".into(),
                address: "127.0.0.1:10002".into(),
                tls_certificate: None,
            },
        ],
    );
    let mint = genesis_tx(
        Some(alice()),
        vec![Command::AddAssetQuantity {
            asset_id: coin(),
            amount: Amount::parse("100.00").unwrap(),
        }],
    );
    genesis_block(vec![setup, mint])
}

fn bootstrap() -> MemoryStore {
    let store = MemoryStore::new();
    let rejected = BlockApplier::new(&store)
        .apply_block(&genesis(), true)
        .expect("genesis applies");
    assert!(rejected.is_empty(), "genesis must not reject: {rejected:?}");
    store
}

/// Run one command with validation as `creator`, committing on success.
fn run(
    store: &MemoryStore,
    creator: &AccountId,
    command: Command,
) -> Result<(), meridian_executor::CommandError> {
    let mut tx = store.begin();
    let result = {
        let mut ctx = DbContext::new(tx.as_mut());
        CommandExecutor::execute(
            &mut ctx,
            &command,
            Some(creator),
            &Hash::digest(b"test-tx"),
            0,
            true,
        )
    };
    match result {
        Ok(()) => {
            tx.commit().unwrap();
            Ok(())
        }
        Err(err) => {
            tx.rollback();
            Err(err)
        }
    }
}

fn balance(store: &MemoryStore, account: &AccountId) -> Option<String> {
    store.get(&keys::account_asset(account, &coin())).unwrap()
}

#[test]
fn bootstrap_builds_expected_state() {
    let store = bootstrap();

    assert_eq!(store.get(&keys::account(&alice())).unwrap(), Some("1".into()));
    assert_eq!(balance(&store, &alice()), Some("100.00".into()));
    assert_eq!(
        store.get(&keys::account_asset_size(&alice())).unwrap(),
        Some("1".into())
    );
    assert_eq!(store.get(keys::PEERS_COUNT).unwrap(), Some("2".into()));
    assert_eq!(store.get(keys::DOMAINS_TOTAL_COUNT).unwrap(), Some("1".into()));

    let state = read_ledger_state(&store).unwrap().unwrap();
    assert_eq!(state.height, 1);
    assert_eq!(state.peers.len(), 2);
}

#[test]
fn transfer_moves_balance_and_tracks_asset_size() {
    let store = bootstrap();
    run(
        &store,
        &alice(),
        Command::TransferAsset {
            src_account_id: alice(),
            dest_account_id: bob(),
            asset_id: coin(),
            description: "rent".into(),
            amount: Amount::parse("40.50").unwrap(),
        },
    )
    .unwrap();

    assert_eq!(balance(&store, &alice()), Some("59.50".into()));
    assert_eq!(balance(&store, &bob()), Some("40.50".into()));
    assert_eq!(
        store.get(&keys::account_asset_size(&bob())).unwrap(),
        Some("1".into())
    );
}

#[test]
fn transfer_without_permission_is_denied() {
    let store = bootstrap();
    // bob only holds Receive.
    let err = run(
        &store,
        &bob(),
        Command::TransferAsset {
            src_account_id: bob(),
            dest_account_id: alice(),
            asset_id: coin(),
            description: String::new(),
            amount: Amount::parse("1.00").unwrap(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::NO_PERMISSIONS);
}

#[test]
fn transfer_more_than_balance_fails() {
    let store = bootstrap();
    let err = run(
        &store,
        &alice(),
        Command::TransferAsset {
            src_account_id: alice(),
            dest_account_id: bob(),
            asset_id: coin(),
            description: String::new(),
            amount: Amount::parse("1000.00").unwrap(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::NOT_ENOUGH_ASSETS);
    assert_eq!(balance(&store, &alice()), Some("100.00".into()));
}

#[test]
fn transfer_description_bounded_by_setting() {
    let store = bootstrap();
    run(
        &store,
        &alice(),
        Command::SetSettingValue {
            key: keys::MAX_DESCRIPTION_SIZE_KEY.into(),
            value: "5".into(),
        },
    )
    .unwrap();

    let err = run(
        &store,
        &alice(),
        Command::TransferAsset {
            src_account_id: alice(),
            dest_account_id: bob(),
            asset_id: coin(),
            description: "far too long".into(),
            amount: Amount::parse("1.00").unwrap(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::INVALID_FIELD_SIZE);

    run(
        &store,
        &alice(),
        Command::TransferAsset {
            src_account_id: alice(),
            dest_account_id: bob(),
            asset_id: coin(),
            description: "ok".into(),
            amount: Amount::parse("1.00").unwrap(),
        },
    )
    .unwrap();
}

#[test]
fn subtract_with_wrong_precision_reports_code_3() {
    let store = bootstrap();
    let err = run(
        &store,
        &alice(),
        Command::SubtractAssetQuantity {
            asset_id: coin(),
            amount: Amount::parse("1.234").unwrap(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, 3);
    assert!(
        err.description.contains("Expected: 2"),
        "message must name the asset precision: {}",
        err.description
    );
    assert!(err.description.contains("got: 3"));
}

#[test]
fn subtract_below_zero_fails() {
    let store = bootstrap();
    let err = run(
        &store,
        &alice(),
        Command::SubtractAssetQuantity {
            asset_id: coin(),
            amount: Amount::parse("100.01").unwrap(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::INVALID_AMOUNT);
}

#[test]
fn remove_peer_keeps_at_least_one() {
    let store = bootstrap();
    run(
        &store,
        &alice(),
        Command::RemovePeer {
            public_key: "p1".into(),
        },
    )
    .unwrap();
    assert_eq!(store.get(keys::PEERS_COUNT).unwrap(), Some("1".into()));

    let err = run(
        &store,
        &alice(),
        Command::RemovePeer {
            public_key: "p2".into(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::PEERS_COUNT_NOT_ENOUGH);
    assert!(err.description.contains("last peer"));
}

#[test]
fn signatory_removal_respects_quorum() {
    let store = bootstrap();
    run(
        &store,
        &alice(),
        Command::AddSignatory {
            account_id: alice(),
            public_key: "cc33".into(),
        },
    )
    .unwrap();
    run(
        &store,
        &alice(),
        Command::SetQuorum {
            account_id: alice(),
            quorum: 2,
        },
    )
    .unwrap();

    // Two signatories, quorum two: removal would violate the invariant.
    let err = run(
        &store,
        &alice(),
        Command::RemoveSignatory {
            account_id: alice(),
            public_key: "cc33".into(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::COUNT_NOT_ENOUGH);
}

#[test]
fn set_quorum_above_signatory_count_fails() {
    let store = bootstrap();
    let err = run(
        &store,
        &alice(),
        Command::SetQuorum {
            account_id: alice(),
            quorum: 5,
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::COUNT_NOT_ENOUGH);
}

#[test]
fn grant_enables_detail_writes_and_is_not_idempotent() {
    let store = bootstrap();

    // Without a grant, bob cannot write alice's details.
    let err = run(
        &store,
        &bob(),
        Command::SetAccountDetail {
            account_id: alice(),
            key: "phone".into(),
            value: "123".into(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::NO_PERMISSIONS);

    run(
        &store,
        &alice(),
        Command::GrantPermission {
            account_id: bob(),
            permission: GrantablePermission::SetMyAccountDetail,
        },
    )
    .unwrap();

    run(
        &store,
        &bob(),
        Command::SetAccountDetail {
            account_id: alice(),
            key: "phone".into(),
            value: "123".into(),
        },
    )
    .unwrap();
    assert_eq!(
        store
            .get(&keys::account_detail(&alice(), "bob@wonderland", "phone"))
            .unwrap(),
        Some("123".into())
    );
    assert_eq!(
        store.get(&keys::account_details_count(&alice())).unwrap(),
        Some("1".into())
    );

    let err = run(
        &store,
        &alice(),
        Command::GrantPermission {
            account_id: bob(),
            permission: GrantablePermission::SetMyAccountDetail,
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::PERMISSION_ALREADY_SET);
}

#[test]
fn revoke_requires_a_prior_grant() {
    let store = bootstrap();
    let err = run(
        &store,
        &alice(),
        Command::RevokePermission {
            account_id: bob(),
            permission: GrantablePermission::TransferMyAssets,
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::NO_PERMISSIONS);

    run(
        &store,
        &alice(),
        Command::GrantPermission {
            account_id: bob(),
            permission: GrantablePermission::TransferMyAssets,
        },
    )
    .unwrap();
    run(
        &store,
        &alice(),
        Command::RevokePermission {
            account_id: bob(),
            permission: GrantablePermission::TransferMyAssets,
        },
    )
    .unwrap();
}

#[test]
fn granted_transfer_acts_on_behalf_of_owner() {
    let store = bootstrap();
    run(
        &store,
        &alice(),
        Command::AppendRole {
            account_id: bob(),
            role_name: "admin".into(),
        },
    )
    .unwrap();
    // bob now has Transfer, but alice's assets still need a grant.
    run(
        &store,
        &alice(),
        Command::GrantPermission {
            account_id: bob(),
            permission: GrantablePermission::TransferMyAssets,
        },
    )
    .unwrap();

    run(
        &store,
        &bob(),
        Command::TransferAsset {
            src_account_id: alice(),
            dest_account_id: bob(),
            asset_id: coin(),
            description: String::new(),
            amount: Amount::parse("10.00").unwrap(),
        },
    )
    .unwrap();
    assert_eq!(balance(&store, &alice()), Some("90.00".into()));
}

#[test]
fn compare_and_set_detail_single_read_semantics() {
    let store = bootstrap();

    // Unset value with check_empty and no expectation: writes.
    run(
        &store,
        &alice(),
        Command::CompareAndSetAccountDetail {
            account_id: alice(),
            key: "mood".into(),
            value: "curious".into(),
            old_value: None,
            check_empty: true,
        },
    )
    .unwrap();

    // Wrong expectation fails.
    let err = run(
        &store,
        &alice(),
        Command::CompareAndSetAccountDetail {
            account_id: alice(),
            key: "mood".into(),
            value: "bored".into(),
            old_value: Some("sleepy".into()),
            check_empty: false,
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::INCORRECT_OLD_VALUE);

    // Correct expectation replaces the value without bumping the count.
    run(
        &store,
        &alice(),
        Command::CompareAndSetAccountDetail {
            account_id: alice(),
            key: "mood".into(),
            value: "bored".into(),
            old_value: Some("curious".into()),
            check_empty: false,
        },
    )
    .unwrap();
    assert_eq!(
        store
            .get(&keys::account_detail(&alice(), "alice@wonderland", "mood"))
            .unwrap(),
        Some("bored".into())
    );
    assert_eq!(
        store.get(&keys::account_details_count(&alice())).unwrap(),
        Some("1".into())
    );
}

#[test]
fn create_role_duplicate_reports_code_3() {
    let store = bootstrap();
    let err = run(
        &store,
        &alice(),
        Command::CreateRole {
            role_name: "user".into(),
            permissions: RolePermissionSet::empty(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::ROLE_ALREADY_EXISTS);
}

#[test]
fn create_role_rejects_privilege_escalation() {
    let store = bootstrap();
    let err = run(
        &store,
        &bob(),
        Command::CreateRole {
            role_name: "sneaky".into(),
            permissions: RolePermissionSet::from_iter([RolePermission::AddPeer]),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::NO_PERMISSIONS);
}

#[test]
fn create_account_rejects_default_role_escalation() {
    let store = bootstrap();
    // A domain whose default role outranks bob's permissions.
    run(
        &store,
        &alice(),
        Command::CreateDomain {
            domain_id: "castle".into(),
            default_role: "admin".into(),
        },
    )
    .unwrap();
    // Give bob CreateAccount alone via a dedicated role.
    run(
        &store,
        &alice(),
        Command::CreateRole {
            role_name: "registrar".into(),
            permissions: RolePermissionSet::from_iter([RolePermission::CreateAccount]),
        },
    )
    .unwrap();
    run(
        &store,
        &alice(),
        Command::AppendRole {
            account_id: bob(),
            role_name: "registrar".into(),
        },
    )
    .unwrap();

    let err = run(
        &store,
        &bob(),
        Command::CreateAccount {
            account_name: "eve".into(),
            domain_id: "castle".into(),
            public_key: "EE55".into(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::NO_PERMISSIONS);
}

#[test]
fn create_account_lowercases_public_key() {
    let store = bootstrap();
    run(
        &store,
        &alice(),
        Command::CreateAccount {
            account_name: "carol".into(),
            domain_id: "wonderland".into(),
            public_key: "DD44FF".into(),
        },
    )
    .unwrap();
    let carol = AccountId::new("carol", "wonderland");
    assert_eq!(
        store.get(&keys::signatory(&carol, "dd44ff")).unwrap(),
        Some(String::new())
    );
}

#[test]
fn call_engine_is_not_implemented() {
    let store = bootstrap();
    let err = run(
        &store,
        &alice(),
        Command::CallEngine {
            callee: "0xdead".into(),
            input: String::new(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, codes::NO_IMPLEMENTATION);
    assert!(err.description.contains("Not implemented"));
}

#[test]
fn failing_tx_rolls_back_but_block_commits() {
    let store = bootstrap();
    let good = genesis_tx(
        Some(alice()),
        vec![Command::SetAccountDetail {
            account_id: alice(),
            key: "k".into(),
            value: "v".into(),
        }],
    );
    // Second command fails: the whole transaction must roll back.
    let bad = genesis_tx(
        Some(alice()),
        vec![
            Command::AddAssetQuantity {
                asset_id: coin(),
                amount: Amount::parse("5.00").unwrap(),
            },
            Command::SubtractAssetQuantity {
                asset_id: coin(),
                amount: Amount::parse("9999.00").unwrap(),
            },
        ],
    );
    let bad_hash = bad.hash();

    let prev = read_ledger_state(&store).unwrap().unwrap();
    let block = Block {
        height: 2,
        prev_hash: prev.top_block_hash,
        created_time_ms: 1,
        transactions: vec![good, bad],
        rejected_tx_hashes: vec![],
        signatures: vec![],
    };
    let rejected = BlockApplier::new(&store).apply_block(&block, true).unwrap();
    assert_eq!(rejected, vec![bad_hash]);

    // The failing transaction left no trace, including its first command.
    assert_eq!(balance(&store, &alice()), Some("100.00".into()));
    assert_eq!(
        store.get(&keys::tx_status(&bad_hash)).unwrap(),
        Some("rejected".into())
    );
    assert_eq!(
        store.get(keys::LEDGER_HEIGHT).unwrap(),
        Some(codec::encode_u64(2))
    );
}

#[test]
fn replay_without_validation_reproduces_state() {
    let store_a = bootstrap();

    // Apply a second block with one rejected transaction.
    let ok_tx = genesis_tx(
        Some(alice()),
        vec![Command::TransferAsset {
            src_account_id: alice(),
            dest_account_id: bob(),
            asset_id: coin(),
            description: String::new(),
            amount: Amount::parse("25.00").unwrap(),
        }],
    );
    let failing_tx = genesis_tx(
        Some(bob()),
        vec![Command::AddPeer {
            public_key: "p9".into(),
            address: "x".into(),
            tls_certificate: None,
        }],
    );
    let prev = read_ledger_state(&store_a).unwrap().unwrap();
    let mut block2 = Block {
        height: 2,
        prev_hash: prev.top_block_hash,
        created_time_ms: 7,
        transactions: vec![ok_tx.clone(), failing_tx.clone()],
        rejected_tx_hashes: vec![],
        signatures: vec![],
    };
    let rejected = BlockApplier::new(&store_a)
        .apply_block(&block2, true)
        .unwrap();
    assert_eq!(rejected, vec![failing_tx.hash()]);

    // Replay the log (with the recorded rejections) into a fresh store.
    block2.rejected_tx_hashes = rejected;
    let store_b = MemoryStore::new();
    let applier_b = BlockApplier::new(&store_b);
    applier_b.apply_block(&genesis(), false).unwrap();
    applier_b.apply_block(&block2, false).unwrap();

    assert_eq!(store_a.dump(), store_b.dump());
}
