//! Node configuration.

use meridian_consensus::ConsistencyModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Consistency model knob, as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyModelConfig {
    #[default]
    Bft,
    Cft,
}

impl From<ConsistencyModelConfig> for ConsistencyModel {
    fn from(value: ConsistencyModelConfig) -> Self {
        match value {
            ConsistencyModelConfig::Bft => ConsistencyModel::Bft,
            ConsistencyModelConfig::Cft => ConsistencyModel::Cft,
        }
    }
}

/// Recognized configuration knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Maximum transactions per proposal.
    pub transaction_limit: usize,

    /// Rolling window of proposals kept per ordering service.
    pub number_of_proposals: usize,

    /// Delay before re-broadcasting the own consensus vote.
    pub vote_delay_milliseconds: u64,

    /// Deadline for remote proposal requests; on expiry the round proceeds
    /// without a proposal.
    pub proposal_request_timeout_milliseconds: u64,

    /// Pacing delay before voting in a round that has no proposal, so empty
    /// rounds do not spin.
    pub empty_round_delay_milliseconds: u64,

    /// Supermajority model.
    pub consistency_model: ConsistencyModelConfig,

    /// WSV database directory.
    pub wsv_path: PathBuf,

    /// Block log directory.
    pub block_log_path: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            transaction_limit: 10_000,
            number_of_proposals: 3,
            vote_delay_milliseconds: 3_000,
            proposal_request_timeout_milliseconds: 1_000,
            empty_round_delay_milliseconds: 500,
            consistency_model: ConsistencyModelConfig::Bft,
            wsv_path: PathBuf::from("storage/wsv"),
            block_log_path: PathBuf::from("storage/blocks"),
        }
    }
}

impl NodeConfig {
    /// Load a JSON config file; missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(std::io::Error::other)
    }

    pub fn vote_delay(&self) -> Duration {
        Duration::from_millis(self.vote_delay_milliseconds)
    }

    pub fn proposal_request_timeout(&self) -> Duration {
        Duration::from_millis(self.proposal_request_timeout_milliseconds)
    }

    pub fn empty_round_delay(&self) -> Duration {
        Duration::from_millis(self.empty_round_delay_milliseconds)
    }
}
