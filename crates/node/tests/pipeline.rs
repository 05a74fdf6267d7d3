//! Single-node pipeline test: a submitted batch travels through ordering,
//! consensus (single-peer supermajority) and the synchronizer into a
//! committed block and an updated WSV.

use meridian_executor::BlockApplier;
use meridian_node::{BlockLog, ChannelNetwork, Node, NodeConfig};
use meridian_restorer::MemoryBlockLog;
use meridian_store::{keys, MemoryStore, WsvStore};
use meridian_types::test_utils::test_keypair;
use meridian_types::{
    AccountId, Amount, AssetId, Batch, Block, Command, Hash, KeyPair, RolePermissionSet,
    Transaction, TransactionSignature,
};
use std::sync::Arc;
use std::time::Duration;

fn alice() -> AccountId {
    AccountId::new("alice", "wonderland")
}

fn coin() -> AssetId {
    AssetId::new("coin", "wonderland")
}

/// Genesis registering the node itself as the only peer and alice as an
/// all-powerful account.
fn genesis(node_key: &KeyPair) -> Block {
    Block {
        height: 1,
        prev_hash: Hash::ZERO,
        created_time_ms: 0,
        transactions: vec![
            Transaction {
                creator: None,
                created_time_ms: 0,
                quorum: 1,
                commands: vec![
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
                    Command::AddPeer {
                        public_key: node_key.public_key().to_hex(),
                        address: "127.0.0.1:10001".into(),
                        tls_certificate: None,
                    },
                ],
                signatures: vec![],
            },
            Transaction {
                creator: Some(alice()),
                created_time_ms: 0,
                quorum: 1,
                commands: vec![Command::AddAssetQuantity {
                    asset_id: coin(),
                    amount: Amount::parse("100.00").unwrap(),
                }],
                signatures: vec![],
            },
        ],
        rejected_tx_hashes: vec![],
        signatures: vec![],
    }
}

fn signed_batch(signer: &KeyPair, commands: Vec<Command>) -> Batch {
    let mut tx = Transaction {
        creator: Some(alice()),
        created_time_ms: 42,
        quorum: 1,
        commands,
        signatures: vec![],
    };
    let payload = tx.payload_hash();
    tx.signatures.push(TransactionSignature {
        public_key: signer.public_key(),
        signature: signer.sign(payload.as_bytes()),
    });
    Batch::new(vec![tx])
}

fn fast_config() -> NodeConfig {
    NodeConfig {
        transaction_limit: 100,
        number_of_proposals: 3,
        vote_delay_milliseconds: 100,
        proposal_request_timeout_milliseconds: 200,
        empty_round_delay_milliseconds: 30,
        ..NodeConfig::default()
    }
}

async fn wait_for_height(node: &Node, height: u64, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if node.ledger_state().map(|s| s.height).unwrap_or(0) >= height {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn batch_commits_into_a_block() {
    let node_key = test_keypair(7);
    let store = Arc::new(MemoryStore::new());
    let block_log = Arc::new(MemoryBlockLog::new());

    // Seed the chain with genesis via the log; the node replays it on
    // start.
    BlockLog::append(block_log.as_ref(), &genesis(&node_key)).unwrap();

    let network = Arc::new(ChannelNetwork::new());
    let node = Node::start(
        &fast_config(),
        node_key.clone(),
        store.clone(),
        block_log.clone(),
        network.clone(),
    )
    .unwrap();
    network.register(node.peer_id().to_owned(), node.senders());

    assert_eq!(node.ledger_state().unwrap().height, 1);

    let batch = signed_batch(
        &node_key,
        vec![Command::SetAccountDetail {
            account_id: alice(),
            key: "color".into(),
            value: "teal".into(),
        }],
    );
    node.submit_batch(batch).await.unwrap();

    assert!(
        wait_for_height(&node, 2, Duration::from_secs(10)).await,
        "the batch should commit within a few rounds"
    );

    // The committed block carries the transaction and landed in the log.
    let committed_height = node.ledger_state().unwrap().height;
    let mut found = false;
    for h in 2..=committed_height {
        let block = BlockLog::get_block(block_log.as_ref(), h).unwrap();
        if block
            .transactions
            .iter()
            .any(|tx| tx.commands.iter().any(|c| c.name() == "SetAccountDetail"))
        {
            found = true;
        }
    }
    assert!(found, "committed blocks should contain the submitted tx");

    // And the WSV reflects it.
    assert_eq!(
        store
            .get(&keys::account_detail(&alice(), "alice@wonderland", "color"))
            .unwrap(),
        Some("teal".into())
    );
}

#[tokio::test]
async fn empty_rounds_advance_reject_rounds_without_blocks() {
    let node_key = test_keypair(8);
    let store = Arc::new(MemoryStore::new());
    let block_log = Arc::new(MemoryBlockLog::new());
    BlockLog::append(block_log.as_ref(), &genesis(&node_key)).unwrap();

    let network = Arc::new(ChannelNetwork::new());
    let node = Node::start(
        &fast_config(),
        node_key,
        store.clone(),
        block_log,
        network.clone(),
    )
    .unwrap();
    network.register(node.peer_id().to_owned(), node.senders());

    // No batches: rounds keep rejecting, the chain does not grow.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(node.ledger_state().unwrap().height, 1);
}

#[tokio::test]
async fn restart_replays_the_log() {
    let node_key = test_keypair(9);
    let block_log = Arc::new(MemoryBlockLog::new());
    BlockLog::append(block_log.as_ref(), &genesis(&node_key)).unwrap();

    // First life: commit one batch.
    {
        let store = Arc::new(MemoryStore::new());
        let network = Arc::new(ChannelNetwork::new());
        let node = Node::start(
            &fast_config(),
            node_key.clone(),
            store,
            block_log.clone(),
            network.clone(),
        )
        .unwrap();
        network.register(node.peer_id().to_owned(), node.senders());

        node.submit_batch(signed_batch(
            &node_key,
            vec![Command::SetAccountDetail {
                account_id: alice(),
                key: "pet".into(),
                value: "cat".into(),
            }],
        ))
        .await
        .unwrap();
        assert!(wait_for_height(&node, 2, Duration::from_secs(10)).await);
    }

    // Second life with a fresh WSV: the restorer rebuilds state from the
    // log alone.
    let store = Arc::new(MemoryStore::new());
    let network = Arc::new(ChannelNetwork::new());
    let node = Node::start(
        &fast_config(),
        node_key,
        store.clone(),
        block_log.clone(),
        network.clone(),
    )
    .unwrap();
    network.register(node.peer_id().to_owned(), node.senders());

    let reference = {
        let fresh = MemoryStore::new();
        let applier = BlockApplier::new(&fresh);
        for h in 1..=BlockLog::top_height(block_log.as_ref()).unwrap() {
            applier
                .apply_block(&BlockLog::get_block(block_log.as_ref(), h).unwrap(), false)
                .unwrap();
        }
        fresh.dump()
    };
    assert_eq!(store.dump(), reference);
    assert_eq!(
        store
            .get(&keys::account_detail(&alice(), "alice@wonderland", "pet"))
            .unwrap(),
        Some("cat".into())
    );
}
