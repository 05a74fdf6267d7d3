//! The Meridian node daemon.

use clap::Parser;
use meridian_node::{ChannelNetwork, FileBlockLog, NetworkAdapter, Node, NodeConfig};
use meridian_store::RocksStore;
use meridian_types::KeyPair;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meridiand", about = "Meridian permissioned ledger node")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Path to the node key seed file (32 bytes, hex).
    #[arg(long, default_value = "node.key")]
    key: PathBuf,

    /// Keep replaying new blocks from the log instead of participating in
    /// consensus (restore mode).
    #[arg(long)]
    restore_only: bool,
}

type MainResult = Result<(), Box<dyn std::error::Error>>;

fn load_keypair(path: &PathBuf) -> Result<KeyPair, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let bytes = hex::decode(raw.trim())
        .map_err(|e| std::io::Error::other(format!("bad key file: {e}")))?;
    let seed: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| std::io::Error::other("key seed must be 32 bytes"))?;
    Ok(KeyPair::from_seed(&seed))
}

#[tokio::main]
async fn main() -> MainResult {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = NodeConfig::load(&args.config)?;
    let keypair = load_keypair(&args.key)?;

    let store = Arc::new(RocksStore::open(&config.wsv_path)?);
    let block_log = Arc::new(FileBlockLog::open(&config.block_log_path)?);

    if args.restore_only {
        use meridian_restorer::WsvRestorer;
        use std::sync::atomic::AtomicBool;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_on_signal = Arc::clone(&stop);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            stop_on_signal.store(true, std::sync::atomic::Ordering::Relaxed);
        });

        let mut reader = meridian_node::ReaderAdapter::new(block_log);
        let state = tokio::task::spawn_blocking(move || {
            WsvRestorer::new().restore(store.as_ref(), &mut reader, true, &stop)
        })
        .await??;
        info!(height = state.height, "Restore finished");
        return Ok(());
    }

    let network = Arc::new(ChannelNetwork::new());
    let network_adapter: Arc<dyn NetworkAdapter> = network.clone();
    let node = Node::start(&config, keypair, store, block_log, network_adapter)?;
    network.register(node.peer_id().to_owned(), node.senders());
    info!(peer_id = node.peer_id(), "Node running");

    tokio::signal::ctrl_c().await?;
    Ok(())
}
