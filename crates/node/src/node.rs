//! Engine wiring and action execution.

use crate::block_log::{BlockLog, ReaderAdapter};
use crate::block_store::BlockStore;
use crate::config::NodeConfig;
use crate::network::{EngineSenders, NetworkAdapter};
use crate::timers::TimerManager;
use meridian_consensus::{PeerOrderer, YacConfig, YacState};
use meridian_core::{
    Action, Event, OrderingEvent, RoundSwitch, SynchronizationEvent,
};
use meridian_executor::{read_ledger_state, BlockApplier, StorePresenceCache};
use meridian_ordering::{OnDemandOrderingService, OrderingGate};
use meridian_pending::PendingPool;
use meridian_restorer::{RestoreError, WsvRestorer};
use meridian_store::WsvStore;
use meridian_sync::Synchronizer;
use meridian_types::{
    AccountId, Batch, Block, Hash, KeyPair, LedgerState, Round, YacHash, FIRST_REJECT_ROUND,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const ENGINE_CHANNEL_CAPACITY: usize = 1024;

/// Errors from starting a node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error("Engine channel closed")]
    ChannelClosed,
}

fn system_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Shared context for action execution across engines.
struct Shared {
    peer_id: String,
    network: Arc<dyn NetworkAdapter>,
    senders: EngineSenders,
    store: Arc<dyn WsvStore>,
    blocks: Arc<BlockStore>,
    block_log: Arc<dyn BlockLog>,
    proposal_request_timeout: Duration,
    empty_round_delay: Duration,
}

impl Shared {
    /// Execute the actions returned by a handler. `timers` is present only
    /// on the engine that owns timers (consensus).
    async fn execute(&self, actions: Vec<Action>, mut timers: Option<&mut TimerManager>) {
        for action in actions {
            match action {
                Action::Send { to, message } => {
                    // A proposal request is bounded by a deadline: when no
                    // response arrives in time, the round proceeds without
                    // a proposal.
                    if let meridian_core::OutboundMessage::ProposalRequest(request) = &message {
                        let round = request.round;
                        let ordering = self.senders.ordering.clone();
                        let timeout = self.proposal_request_timeout;
                        tokio::spawn(async move {
                            tokio::time::sleep(timeout).await;
                            let _ = ordering
                                .send(Event::ProposalResponseReceived {
                                    round,
                                    proposal: None,
                                })
                                .await;
                        });
                    }
                    self.network.send(&self.peer_id, &to, message);
                }
                Action::SetTimer { id, duration } => {
                    if let Some(timers) = timers.as_deref_mut() {
                        timers.set_timer(id, duration);
                    }
                }
                Action::CancelTimer { id } => {
                    if let Some(timers) = timers.as_deref_mut() {
                        timers.cancel_timer(id);
                    }
                }
                Action::EnqueueInternal { event } => self.route(event).await,
                Action::EmitOutcome { outcome } => {
                    let _ = self.senders.sync.send(Event::OutcomeReady { outcome }).await;
                }
                Action::EmitOrderingEvent { event } => self.on_ordering_event(event).await,
                Action::EmitSyncEvent { event } => self.on_sync_event(event).await,
            }
        }
    }

    /// Deliver an event to the engine that owns it.
    async fn route(&self, event: Event) {
        let sender = match &event {
            Event::BatchesReceived { .. }
            | Event::BatchSubmitted { .. }
            | Event::PendingStateReceived { .. }
            | Event::BatchesCompleted { .. }
            | Event::ProposalRequestReceived { .. }
            | Event::ProposalResponseReceived { .. }
            | Event::RoundSwitched { .. }
            | Event::TxsCommitted { .. }
            | Event::BlockCommitted { .. } => &self.senders.ordering,

            Event::VoteStateReceived { .. }
            | Event::VoteTimer
            | Event::CandidateReady { .. } => &self.senders.consensus,

            Event::OutcomeReady { .. } => &self.senders.sync,
        };
        let _ = sender.send(event).await;
    }

    /// The gate produced the round's (possibly absent) stripped proposal:
    /// form the candidate block and hand it to consensus.
    async fn on_ordering_event(&self, event: OrderingEvent) {
        let mut paced = false;
        let hash = match &event.proposal {
            Some(proposal) => {
                let mut candidate = Block {
                    height: event.round.block_round,
                    prev_hash: event.ledger_state.top_block_hash,
                    created_time_ms: proposal.created_time_ms,
                    transactions: proposal.transactions.clone(),
                    rejected_tx_hashes: vec![],
                    signatures: vec![],
                };
                // The stateful dry run pins the rejected set before voting,
                // so every honest peer votes on the identical block.
                match BlockApplier::new(self.store.as_ref()).simulate_block(&candidate, true) {
                    Ok(rejected) => {
                        candidate.rejected_tx_hashes = rejected;
                        let block_hash = self.blocks.insert(candidate);
                        YacHash::new(event.round, proposal.hash(), block_hash)
                    }
                    Err(err) => {
                        warn!(%err, round = %event.round, "Candidate simulation failed");
                        paced = true;
                        YacHash::new(event.round, Hash::ZERO, Hash::ZERO)
                    }
                }
            }
            None => {
                debug!(round = %event.round, "No proposal, voting for none");
                paced = true;
                YacHash::new(event.round, Hash::ZERO, Hash::ZERO)
            }
        };

        let candidate_ready = Event::CandidateReady {
            hash,
            ledger_peers: event.ledger_state.peers,
        };
        if paced {
            // Empty rounds reject immediately once agreed; without pacing a
            // quiet network would spin through reject rounds.
            let consensus = self.senders.consensus.clone();
            let delay = self.empty_round_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = consensus.send(candidate_ready).await;
            });
        } else {
            let _ = self.senders.consensus.send(candidate_ready).await;
        }
    }

    /// The synchronizer finished a round: persist on commit, then switch the
    /// ordering plane to the next round.
    async fn on_sync_event(&self, event: SynchronizationEvent) {
        match event {
            SynchronizationEvent::Commit {
                block_hash,
                new_round,
                ledger_state,
            } => {
                if let Some(block) = self.blocks.get(&block_hash) {
                    if let Err(err) = self.block_log.append(&block) {
                        warn!(%err, height = block.height, "Block log append failed");
                    }
                    self.blocks.prune_through(block.height);
                    let _ = self
                        .senders
                        .ordering
                        .send(Event::BlockCommitted { block })
                        .await;
                } else {
                    warn!(%block_hash, "Committed block missing from candidate store");
                }
                self.switch_round(new_round, ledger_state).await;
            }
            SynchronizationEvent::Reject {
                new_round,
                ledger_state,
            } => {
                self.switch_round(new_round, ledger_state).await;
            }
        }
    }

    async fn switch_round(&self, next_round: Round, ledger_state: LedgerState) {
        let _ = self
            .senders
            .ordering
            .send(Event::RoundSwitched {
                switch: RoundSwitch {
                    next_round,
                    ledger_state,
                },
            })
            .await;
    }
}

/// A running node: three engines over a shared store.
pub struct Node {
    peer_id: String,
    senders: EngineSenders,
    pending: Arc<PendingPool>,
    gate: Arc<OrderingGate>,
    store: Arc<dyn WsvStore>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Restore the WSV from the block log and start the engines.
    ///
    /// Must be called within a tokio runtime. The caller registers
    /// [`Node::senders`] with its network so inbound messages reach the
    /// engines.
    pub fn start(
        config: &NodeConfig,
        keypair: KeyPair,
        store: Arc<dyn WsvStore>,
        block_log: Arc<dyn BlockLog>,
        network: Arc<dyn NetworkAdapter>,
    ) -> Result<Node, NodeError> {
        let peer_id = keypair.public_key().to_hex();

        // Catch up with whatever the block log already has.
        let stop = AtomicBool::new(false);
        let mut reader = ReaderAdapter::new(Arc::clone(&block_log));
        let ledger_state =
            WsvRestorer::new().restore(store.as_ref(), &mut reader, false, &stop)?;
        info!(height = ledger_state.height, %peer_id, "Node starting");

        let (ordering_tx, ordering_rx) = mpsc::channel(ENGINE_CHANNEL_CAPACITY);
        let (consensus_tx, consensus_rx) = mpsc::channel(ENGINE_CHANNEL_CAPACITY);
        let (sync_tx, sync_rx) = mpsc::channel(ENGINE_CHANNEL_CAPACITY);
        let senders = EngineSenders {
            ordering: ordering_tx.clone(),
            consensus: consensus_tx.clone(),
            sync: sync_tx.clone(),
        };

        let presence = Arc::new(StorePresenceCache::new(Arc::clone(&store)));
        let ordering_service = Arc::new(OnDemandOrderingService::new(
            config.transaction_limit,
            config.number_of_proposals,
            presence.clone(),
            Arc::new(system_time_ms),
        ));
        let gate = Arc::new(OrderingGate::new(Arc::clone(&ordering_service), presence));
        let pending = Arc::new(PendingPool::new());
        let blocks = Arc::new(BlockStore::new());

        let yac = YacState::new(
            keypair,
            YacConfig {
                vote_delay: config.vote_delay(),
                consistency_model: config.consistency_model.into(),
                storage_window: 8,
            },
        );
        let initial_round = Round::new(ledger_state.height + 1, FIRST_REJECT_ROUND);
        let synchronizer = Synchronizer::new(
            Arc::clone(&store),
            blocks.clone() as Arc<dyn meridian_sync::BlockSource>,
            initial_round,
        );

        let shared = Arc::new(Shared {
            peer_id: peer_id.clone(),
            network,
            senders: senders.clone(),
            store: Arc::clone(&store),
            blocks,
            block_log,
            proposal_request_timeout: config.proposal_request_timeout(),
            empty_round_delay: config.empty_round_delay(),
        });

        let tasks = vec![
            tokio::spawn(ordering_engine(
                ordering_rx,
                Arc::clone(&gate),
                Arc::clone(&ordering_service),
                Arc::clone(&pending),
                Arc::clone(&shared),
            )),
            tokio::spawn(consensus_engine(
                consensus_rx,
                yac,
                TimerManager::new(consensus_tx.clone()),
                Arc::clone(&shared),
            )),
            tokio::spawn(sync_engine(sync_rx, synchronizer, Arc::clone(&shared))),
        ];

        // Kick the ordering plane into the first open round.
        let switch = RoundSwitch {
            next_round: initial_round,
            ledger_state,
        };
        ordering_tx
            .try_send(Event::RoundSwitched { switch })
            .map_err(|_| NodeError::ChannelClosed)?;

        Ok(Node {
            peer_id,
            senders,
            pending,
            gate,
            store,
            tasks,
        })
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn senders(&self) -> EngineSenders {
        self.senders.clone()
    }

    /// Submit a client batch.
    pub async fn submit_batch(&self, batch: Batch) -> Result<(), NodeError> {
        self.senders
            .ordering
            .send(Event::BatchSubmitted { batch })
            .await
            .map_err(|_| NodeError::ChannelClosed)
    }

    /// Query the pending pool.
    pub fn pending_transactions(
        &self,
        creator: &AccountId,
        page_size: usize,
        start_hash: Option<Hash>,
    ) -> Result<meridian_pending::PendingPage, meridian_pending::PendingError> {
        self.pending.get_pending_transactions(creator, page_size, start_hash)
    }

    /// Current persisted ledger state.
    pub fn ledger_state(&self) -> Option<LedgerState> {
        read_ledger_state(self.store.as_ref()).ok().flatten()
    }

    /// Stop the node: the gate short-circuits and the engines wind down.
    pub fn stop(&mut self) {
        self.gate.stop();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(peer_id = %self.peer_id, "Node stopped");
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn ordering_engine(
    mut rx: mpsc::Receiver<Event>,
    gate: Arc<OrderingGate>,
    service: Arc<OnDemandOrderingService>,
    pending: Arc<PendingPool>,
    shared: Arc<Shared>,
) {
    while let Some(event) = rx.recv().await {
        debug!(event = event.type_name(), "Ordering engine");
        let actions = match event {
            Event::BatchSubmitted { batch } => {
                if batch.is_complete() {
                    gate.propagate_batch(batch)
                } else {
                    propagate_completed(&gate, pending.updated_batches_handler(vec![batch]))
                }
            }
            Event::BatchesReceived { batches } => {
                service.on_batches(batches);
                vec![]
            }
            Event::PendingStateReceived { batches } => {
                propagate_completed(&gate, pending.updated_batches_handler(batches))
            }
            Event::BatchesCompleted { batches } => propagate_completed(&gate, batches),
            Event::ProposalRequestReceived { from, round } => {
                gate.serve_proposal_request(from, round)
            }
            Event::ProposalResponseReceived { round, proposal } => {
                gate.process_proposal_response(round, proposal)
            }
            Event::RoundSwitched { switch } => gate.process_round_switch(switch),
            Event::TxsCommitted { hashes } => {
                pending.remove_by_tx_hashes(&hashes);
                vec![]
            }
            Event::BlockCommitted { block } => {
                gate.on_block_committed(&block);
                vec![]
            }
            other => {
                debug!(event = other.type_name(), "Not an ordering event");
                vec![]
            }
        };
        shared.execute(actions, None).await;
    }
}

fn propagate_completed(gate: &OrderingGate, completed: Vec<Batch>) -> Vec<Action> {
    completed
        .into_iter()
        .flat_map(|batch| gate.propagate_batch(batch))
        .collect()
}

async fn consensus_engine(
    mut rx: mpsc::Receiver<Event>,
    mut yac: YacState,
    mut timers: TimerManager,
    shared: Arc<Shared>,
) {
    while let Some(event) = rx.recv().await {
        debug!(event = event.type_name(), "Consensus engine");
        let actions = match event {
            Event::CandidateReady { hash, ledger_peers } => {
                match PeerOrderer::get_ordering(&hash, &ledger_peers) {
                    Some(order) => yac.vote(hash, order),
                    None => {
                        warn!("Empty peer list, cannot vote");
                        vec![]
                    }
                }
            }
            Event::VoteStateReceived { votes } => yac.on_state(votes),
            Event::VoteTimer => yac.on_vote_timer(),
            other => {
                debug!(event = other.type_name(), "Not a consensus event");
                vec![]
            }
        };
        shared.execute(actions, Some(&mut timers)).await;
    }
}

async fn sync_engine(
    mut rx: mpsc::Receiver<Event>,
    mut synchronizer: Synchronizer,
    shared: Arc<Shared>,
) {
    while let Some(event) = rx.recv().await {
        debug!(event = event.type_name(), "Synchronizer engine");
        let actions = match event {
            Event::OutcomeReady { outcome } => synchronizer.on_outcome(outcome),
            other => {
                debug!(event = other.type_name(), "Not a synchronizer event");
                vec![]
            }
        };
        shared.execute(actions, None).await;
    }
}
