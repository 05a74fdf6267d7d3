//! Restorer tests: replay, reconciliation, and the wait-for-new-blocks loop.

use meridian_executor::{read_ledger_state, BlockApplier};
use meridian_restorer::{BlockReader, MemoryBlockLog, RestoreError, WsvRestorer};
use meridian_store::{MemoryStore, WsvStore};
use meridian_types::{
    AccountId, Amount, AssetId, Block, Command, Hash, RolePermissionSet, Transaction,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn alice() -> AccountId {
    AccountId::new("alice", "wonderland")
}

fn coin() -> AssetId {
    AssetId::new("coin", "wonderland")
}

fn tx(creator: Option<AccountId>, commands: Vec<Command>) -> Transaction {
    Transaction {
        creator,
        created_time_ms: 0,
        quorum: 1,
        commands,
        signatures: vec![],
    }
}

fn genesis() -> Block {
    Block {
        height: 1,
        prev_hash: Hash::ZERO,
        created_time_ms: 0,
        transactions: vec![
            tx(
                None,
                vec![
                    Command::CreateRole {
                        role_name: "admin".into(),
                        permissions: RolePermissionSet::all(),
                    },
                    Command::CreateDomain {
                        domain_id: "wonderland".into(),
                        default_role: "admin".into(),
                    },
                    Command::CreateAccount {
                        account_name: "alice".into(),
                        domain_id: "wonderland".into(),
                        public_key: "aa11".into(),
                    },
                    Command::CreateAsset {
                        asset_name: "coin".into(),
                        domain_id: "wonderland".into(),
                        precision: 2,
                    },
                ],
            ),
            tx(
                Some(alice()),
                vec![Command::AddAssetQuantity {
                    asset_id: coin(),
                    amount: Amount::parse("100.00").unwrap(),
                }],
            ),
        ],
        rejected_tx_hashes: vec![],
        signatures: vec![],
    }
}

/// A follow-up block writing one detail, chained onto `prev`.
fn detail_block(height: u64, prev: Hash, nonce: u64) -> Block {
    Block {
        height,
        prev_hash: prev,
        created_time_ms: nonce,
        transactions: vec![tx(
            Some(alice()),
            vec![Command::SetAccountDetail {
                account_id: alice(),
                key: format!("k{nonce}"),
                value: format!("v{nonce}"),
            }],
        )],
        rejected_tx_hashes: vec![],
        signatures: vec![],
    }
}

/// Log with genesis plus `extra` chained detail blocks.
fn build_log(extra: u64) -> MemoryBlockLog {
    let log = MemoryBlockLog::new();
    let g = genesis();
    let mut prev = g.hash();
    log.append(g);
    for i in 0..extra {
        let block = detail_block(2 + i, prev, i);
        prev = block.hash();
        log.append(block);
    }
    log
}

#[test]
fn restores_empty_wsv_from_genesis() {
    let store = MemoryStore::new();
    let mut log = build_log(0);
    let stop = AtomicBool::new(false);

    let state = WsvRestorer::new()
        .restore(&store, &mut log, false, &stop)
        .unwrap();
    assert_eq!(state.height, 1);

    assert_eq!(
        store
            .get(&meridian_store::keys::account_asset(&alice(), &coin()))
            .unwrap(),
        Some("100.00".into())
    );
}

#[test]
fn replays_only_the_missing_tail() {
    let store = MemoryStore::new();
    let mut log = build_log(2);

    // Pre-apply genesis so the WSV is at height 1.
    BlockApplier::new(&store)
        .apply_block(&log.get_block(1).unwrap(), false)
        .unwrap();

    let stop = AtomicBool::new(false);
    let state = WsvRestorer::new()
        .restore(&store, &mut log, false, &stop)
        .unwrap();
    assert_eq!(state.height, 3);
    assert_eq!(state.top_block_hash, log.get_block(3).unwrap().hash());
}

#[test]
fn fails_when_wsv_ahead_of_log() {
    let store = MemoryStore::new();
    let full_log = build_log(2);
    // Apply all three blocks to the WSV...
    let applier = BlockApplier::new(&store);
    for h in 1..=3 {
        applier
            .apply_block(&full_log.get_block(h).unwrap(), false)
            .unwrap();
    }
    // ...but hand the restorer a log that only has genesis.
    let mut short_log = build_log(0);

    let stop = AtomicBool::new(false);
    let err = WsvRestorer::new()
        .restore(&store, &mut short_log, false, &stop)
        .unwrap_err();
    assert!(matches!(
        err,
        RestoreError::WsvAheadOfLog { wsv: 3, log: 1 }
    ));
}

#[test]
fn fails_on_top_hash_mismatch() {
    let store = MemoryStore::new();
    let log_a = build_log(0);
    BlockApplier::new(&store)
        .apply_block(&log_a.get_block(1).unwrap(), false)
        .unwrap();

    // A different log whose genesis has another timestamp, hence hash.
    let mut g = genesis();
    g.created_time_ms = 999;
    let mut log_b = MemoryBlockLog::new();
    log_b.append(g);

    let stop = AtomicBool::new(false);
    let err = WsvRestorer::new()
        .restore(&store, &mut log_b, false, &stop)
        .unwrap_err();
    assert!(matches!(err, RestoreError::TopHashMismatch { height: 1 }));
}

#[test]
fn wait_mode_applies_blocks_appended_during_sleep() {
    let store = MemoryStore::new();
    let log = build_log(0);
    let stop = Arc::new(AtomicBool::new(false));

    let writer_log = log.clone();
    let restorer_store = store.clone();
    let restorer_stop = Arc::clone(&stop);
    let mut reader = log.clone();
    let handle = std::thread::spawn(move || {
        WsvRestorer::with_wait_time(Duration::from_millis(5)).restore(
            &restorer_store,
            &mut reader,
            true,
            &restorer_stop,
        )
    });

    // Grow the log to height 3 while the restorer polls; leave the newest
    // block torn so it must be skipped and picked up later.
    let b2 = detail_block(2, writer_log.get_block(1).unwrap().hash(), 1);
    let b2_hash = b2.hash();
    writer_log.append(b2);
    let b3 = detail_block(3, b2_hash, 2);
    writer_log.append(b3);
    writer_log.mark_unreadable(3);

    // Give the poll loop time to apply 2 while 3 is torn.
    std::thread::sleep(Duration::from_millis(50));
    writer_log.mark_readable(3);
    std::thread::sleep(Duration::from_millis(50));

    stop.store(true, Ordering::Relaxed);
    let state = handle.join().unwrap().unwrap();
    assert_eq!(state.height, 3);

    let persisted = read_ledger_state(&store).unwrap().unwrap();
    assert_eq!(persisted.height, 3);
}
