//! Round progression helpers.

use meridian_types::{Round, FIRST_REJECT_ROUND};

/// The round after a commit: next height, initial reject round.
pub fn next_commit_round(round: Round) -> Round {
    Round::new(round.block_round + 1, FIRST_REJECT_ROUND)
}

/// The round after a reject: same height, next reject round.
pub fn next_reject_round(round: Round) -> Round {
    Round::new(round.block_round, round.reject_round + 1)
}
