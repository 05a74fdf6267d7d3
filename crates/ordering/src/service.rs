//! The on-demand ordering service.

use meridian_core::TxPresenceCache;
use meridian_types::{Batch, Hash, Proposal, Round, Transaction};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default size of the rolling proposal window.
pub const DEFAULT_NUMBER_OF_PROPOSALS: usize = 3;

/// Clock used for proposal timestamps; injectable for deterministic tests.
pub type TimeSource = Arc<dyn Fn() -> u64 + Send + Sync>;

struct ProposalMap {
    current_round: Round,
    map: BTreeMap<Round, Option<Arc<Proposal>>>,
}

/// Receives batches, bundles them into per-round proposals, and serves
/// proposal requests.
///
/// `proposal_map` is a bounded, ordered map from round to (possibly empty)
/// proposal, keeping the most recent `number_of_proposals` entries below the
/// current round. `batches_cache` deduplicates by batch hash; packing drains
/// batches whole.
pub struct OnDemandOrderingService {
    transaction_limit: usize,
    number_of_proposals: usize,
    tx_cache: Arc<dyn TxPresenceCache>,
    time_source: TimeSource,
    /// Pending batches keyed by batch hash. Reader-writer lock: packing
    /// reads may run alongside insertions.
    batches_cache: RwLock<BTreeMap<Hash, Arc<Batch>>>,
    proposals: Mutex<ProposalMap>,
}

impl OnDemandOrderingService {
    pub fn new(
        transaction_limit: usize,
        number_of_proposals: usize,
        tx_cache: Arc<dyn TxPresenceCache>,
        time_source: TimeSource,
    ) -> Self {
        OnDemandOrderingService {
            transaction_limit,
            number_of_proposals,
            tx_cache,
            time_source,
            batches_cache: RwLock::new(BTreeMap::new()),
            proposals: Mutex::new(ProposalMap {
                current_round: Round::default(),
                map: BTreeMap::new(),
            }),
        }
    }

    /// Insert incoming batches, skipping duplicates and batches whose
    /// transactions were already decided in some committed block.
    #[instrument(skip_all, fields(count = batches.len()))]
    pub fn on_batches(&self, batches: Vec<Batch>) {
        for batch in batches {
            if self.tx_cache.batch_already_processed(&batch) {
                debug!(hash = %batch.hash(), "Batch already processed, dropped");
                continue;
            }
            let mut cache = self.batches_cache.write();
            cache.entry(batch.hash()).or_insert_with(|| Arc::new(batch));
        }
    }

    /// Return the proposal for `round`, packing a fresh one when the round
    /// is the current round or at most two ahead.
    pub fn on_request_proposal(&self, round: Round) -> Option<Arc<Proposal>> {
        let mut proposals = self.proposals.lock();
        debug!(%round, "Proposal requested");

        if let Some(cached) = proposals.map.get(&round) {
            return cached.clone();
        }

        let current = proposals.current_round;
        let distance = if round.block_round == current.block_round {
            round.reject_round.checked_sub(current.reject_round).map(u64::from)
        } else {
            round.block_round.checked_sub(current.block_round)
        };
        let is_current_or_near = matches!(distance, Some(d) if d <= 2);
        if !is_current_or_near {
            debug!(%round, %current, "Round too far from current, no proposal");
            return None;
        }

        let proposal = self.pack_next_proposal(round);
        proposals.map.insert(round, proposal.clone());
        proposal
    }

    /// Pack up to `transaction_limit` transactions from whole cached batches
    /// into a proposal with a fresh timestamp.
    fn pack_next_proposal(&self, round: Round) -> Option<Arc<Proposal>> {
        let transactions = self.collect_transactions(self.transaction_limit);
        if transactions.is_empty() {
            debug!(%round, "No transactions to create a proposal");
            return None;
        }
        let created_time_ms = (self.time_source)();
        debug!(%round, count = transactions.len(), "Packed proposal");
        Some(Arc::new(Proposal::new(
            round.block_round,
            created_time_ms,
            transactions,
        )))
    }

    fn collect_transactions(&self, limit: usize) -> Vec<Transaction> {
        let cache = self.batches_cache.read();
        let mut collected = Vec::new();
        for batch in cache.values() {
            if collected.len() + batch.len() > limit {
                break;
            }
            collected.extend(batch.transactions().iter().cloned());
        }
        collected
    }

    /// Adopt `round` as the current round and prune old proposals.
    #[instrument(skip(self))]
    pub fn on_collaboration_outcome(&self, round: Round) {
        info!(%round, "Collaboration outcome");
        let mut proposals = self.proposals.lock();
        proposals.current_round = round;
        Self::try_erase(&mut proposals.map, round, self.number_of_proposals);
    }

    /// Keep at most `keep` rounds below `current`; everything at or above
    /// `current` stays.
    fn try_erase(map: &mut BTreeMap<Round, Option<Arc<Proposal>>>, current: Round, keep: usize) {
        let below: Vec<Round> = map.range(..current).map(|(r, _)| *r).collect();
        if below.len() <= keep {
            return;
        }
        for round in &below[..below.len() - keep] {
            map.remove(round);
            debug!(%round, "Erased proposal");
        }
    }

    /// Evict batches whose transactions were committed or rejected.
    pub fn on_txs_committed(&self, hashes: &HashSet<Hash>) {
        let mut cache = self.batches_cache.write();
        cache.retain(|_, batch| {
            !batch
                .transactions()
                .iter()
                .any(|tx| hashes.contains(&tx.hash()))
        });
    }

    /// Run `f` over the cached batches under the read lock.
    pub fn for_cached_batches(&self, f: &mut dyn FnMut(&Batch)) {
        let cache = self.batches_cache.read();
        for batch in cache.values() {
            f(batch);
        }
    }

    pub fn is_batches_cache_empty(&self) -> bool {
        self.batches_cache.read().is_empty()
    }

    pub fn has_proposal(&self, round: Round) -> bool {
        self.proposals.lock().map.contains_key(&round)
    }
}
