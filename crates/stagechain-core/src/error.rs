use std::time::Duration;

use thiserror::Error;

/// Reasons a ledger refuses to exist or refuses a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("difficulty must be in [0, 256), got {bits}")]
    InvalidDifficulty { bits: u32 },

    #[error("stage 0 is reserved for the genesis block")]
    GenesisResubmission,

    #[error("hash {hash} of stage {stage} block does not clear the target")]
    ProofInvalid { stage: u64, hash: String },

    #[error("stage {stage} is past the next open stage {height}")]
    StageGap { stage: u64, height: u64 },

    #[error("no block in stage {} has hash {parent}", .stage.saturating_sub(1))]
    ParentNotFound { stage: u64, parent: String },

    #[error("stage 0 must hold exactly the genesis block")]
    GenesisMismatch,

    #[error("stage {stage} has no blocks")]
    EmptyStage { stage: u64 },
}

/// Outcomes of a bounded proof-of-work search that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no proof found after {attempts} attempts in {elapsed:?}")]
    ProofSearchTimeout { attempts: u64, elapsed: Duration },

    #[error("search cancelled after {attempts} attempts")]
    ProofSearchCancelled { attempts: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_not_found_names_previous_stage() {
        let err = LedgerError::ParentNotFound {
            stage: 3,
            parent: "abcd".into(),
        };
        assert_eq!(err.to_string(), "no block in stage 2 has hash abcd");
    }

    #[test]
    fn empty_stage_message() {
        let err = LedgerError::EmptyStage { stage: 2 };
        assert_eq!(err.to_string(), "stage 2 has no blocks");
    }

    #[test]
    fn invalid_difficulty_message() {
        let err = LedgerError::InvalidDifficulty { bits: 300 };
        assert_eq!(err.to_string(), "difficulty must be in [0, 256), got 300");
    }
}
