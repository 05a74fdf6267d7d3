//! Consensus rounds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Initial reject round after a commit.
pub const FIRST_REJECT_ROUND: u32 = 0;

/// Identifies one consensus attempt.
///
/// `block_round` is the height being agreed on; `reject_round` counts failed
/// attempts at that height. On commit the block round increments and the
/// reject round resets; on reject only the reject round increments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Round {
    pub block_round: u64,
    pub reject_round: u32,
}

impl Round {
    pub fn new(block_round: u64, reject_round: u32) -> Self {
        Round {
            block_round,
            reject_round,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block_round, self.reject_round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        assert!(Round::new(5, 3) < Round::new(6, 0));
        assert!(Round::new(6, 0) < Round::new(6, 1));
        assert_eq!(Round::new(2, 2), Round::new(2, 2));
    }
}
