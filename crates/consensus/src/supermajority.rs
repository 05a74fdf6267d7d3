//! Supermajority detection.

/// Fault-tolerance model the checker is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyModel {
    /// Byzantine fault tolerance: agreement needs ⌈(2N+1)/3⌉ of the total
    /// voting weight.
    Bft,
    /// Crash fault tolerance: simple majority.
    Cft,
}

/// Checks collected voting weight against the configured threshold.
#[derive(Debug, Clone, Copy)]
pub struct SupermajorityChecker {
    model: ConsistencyModel,
}

impl SupermajorityChecker {
    pub fn new(model: ConsistencyModel) -> Self {
        SupermajorityChecker { model }
    }

    /// The minimum agreeing weight out of `total`.
    pub fn threshold(&self, total: u64) -> u64 {
        match self.model {
            // ⌈(2N+1)/3⌉
            ConsistencyModel::Bft => (2 * total + 1).div_ceil(3),
            // ⌊N/2⌋ + 1
            ConsistencyModel::Cft => total / 2 + 1,
        }
    }

    /// Whether `agreed` votes out of `total` peers form a supermajority.
    pub fn has_supermajority(&self, agreed: u64, total: u64) -> bool {
        total > 0 && agreed >= self.threshold(total)
    }

    /// Whether no candidate can reach supermajority anymore.
    ///
    /// `frequent` is the weight of the best candidate, `voted` the total
    /// weight of votes seen so far. Even if every outstanding peer joined
    /// the best candidate, it would still miss the threshold.
    pub fn has_reject(&self, frequent: u64, voted: u64, total: u64) -> bool {
        let outstanding = total.saturating_sub(voted);
        frequent + outstanding < self.threshold(total)
    }
}
