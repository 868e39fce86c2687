use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::LedgerError,
    view::{LedgerView, StageView},
    Block, Hash, Stage, Target,
};

/// Where an accepted block landed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Acceptance {
    pub stage: u64,
    pub position: usize,
    pub hash: Hash,
    /// The block was the first of a new stage.
    pub opened_stage: bool,
}

/// In-memory chain of stages guarded by one reader/writer lock.
///
/// Writers hold the lock across the whole check-then-append in
/// [`Ledger::add_block`]; readers get owned snapshots.
#[derive(Debug)]
pub struct Ledger {
    target: Target,
    stages: RwLock<Vec<Stage>>,
}

impl Ledger {
    pub fn new(difficulty_bits: u32) -> Result<Self, LedgerError> {
        let target = Target::from_difficulty(difficulty_bits)?;
        let genesis = Block::genesis();
        info!(
            "Ledger created at difficulty {} with genesis {}",
            difficulty_bits,
            genesis.hash_hex()
        );
        Ok(Self {
            target,
            stages: RwLock::new(vec![Stage::with_block(genesis)]),
        })
    }

    /// Rebuild a ledger from previously captured stages, auditing every
    /// block. An empty list yields a fresh ledger; otherwise stage 0 must be
    /// exactly the genesis block and no stage may be empty.
    pub fn restore(difficulty_bits: u32, mut stages: Vec<Stage>) -> Result<Self, LedgerError> {
        let target = Target::from_difficulty(difficulty_bits)?;
        if stages.is_empty() {
            stages.push(Stage::with_block(Block::genesis()));
        }
        audit(&target, &stages)?;
        Ok(Self {
            target,
            stages: RwLock::new(stages),
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Number of stages, genesis included. Also the index of the next stage to open.
    pub fn height(&self) -> u64 {
        self.read().len() as u64
    }

    pub fn genesis(&self) -> Block {
        self.read()[0].blocks()[0].clone()
    }

    pub fn stage(&self, index: u64) -> Option<Stage> {
        let index = usize::try_from(index).ok()?;
        self.read().get(index).cloned()
    }

    pub fn contains_hash(&self, stage: u64, hash: &[u8]) -> bool {
        usize::try_from(stage)
            .ok()
            .and_then(|i| self.read().get(i).map(|s| s.contains_hash(hash)))
            .unwrap_or(false)
    }

    /// Hashes of every block in the last stage: the parents a new stage can extend.
    pub fn tip_hashes(&self) -> Vec<Hash> {
        self.read()
            .last()
            .map(|stage| stage.blocks().iter().map(|b| *b.hash()).collect())
            .unwrap_or_default()
    }

    /// Validate and append a proven block.
    ///
    /// Checks run in a fixed order so each rejection has exactly one reason:
    /// genesis stage, proof, stage gap, parent linkage. A new stage is opened
    /// only once all checks have passed.
    #[tracing::instrument(skip_all, fields(stage = block.stage()))]
    pub fn add_block(&self, mut block: Block) -> Result<Acceptance, LedgerError> {
        // The cached hash is never trusted.
        block.recompute_hash();

        if block.stage() == 0 {
            warn!("rejected block claiming the genesis stage");
            return Err(LedgerError::GenesisResubmission);
        }
        if !self.target.is_met_by(block.hash()) {
            debug!(hash = %block.hash_hex(), "rejected block that does not clear the target");
            return Err(LedgerError::ProofInvalid {
                stage: block.stage(),
                hash: block.hash_hex(),
            });
        }

        let mut stages = self.write();
        let height = stages.len() as u64;
        if block.stage() > height {
            debug!(height, "rejected block past the next open stage");
            return Err(LedgerError::StageGap {
                stage: block.stage(),
                height,
            });
        }

        let index = block.stage() as usize;
        if !stages[index - 1].contains_hash(block.parent_hash()) {
            debug!(parent = %hex::encode(block.parent_hash()), "rejected block with unknown parent");
            return Err(LedgerError::ParentNotFound {
                stage: block.stage(),
                parent: hex::encode(block.parent_hash()),
            });
        }

        let opened_stage = index == stages.len();
        if opened_stage {
            stages.push(Stage::new());
        }
        let hash = *block.hash();
        let position = stages[index].push(block);
        info!(
            "Accepted block {} at stage {} position {}",
            hex::encode(hash),
            index,
            position
        );
        Ok(Acceptance {
            stage: index as u64,
            position,
            hash,
            opened_stage,
        })
    }

    pub fn print(&self) -> LedgerView {
        let stages = self.read();
        LedgerView {
            difficulty_bits: self.target.difficulty_bits(),
            target: self.target.to_hex(),
            stages: stages
                .iter()
                .enumerate()
                .map(|(i, stage)| StageView::new(i as u64, stage))
                .collect(),
        }
    }

    /// Re-check the genesis stage, then digest, proof and linkage of every
    /// other stored block.
    pub fn verify(&self) -> Result<(), LedgerError> {
        audit(&self.target, &self.read())
    }

    // Stages only change after every check has passed, so a panic while a
    // guard was held cannot leave them half-updated.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Stage>> {
        self.stages.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Stage>> {
        self.stages.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn audit(target: &Target, stages: &[Stage]) -> Result<(), LedgerError> {
    let genesis = Block::genesis();
    match stages.first() {
        Some(first) if first.blocks() == std::slice::from_ref(&genesis) => {}
        _ => return Err(LedgerError::GenesisMismatch),
    }

    for (index, stage) in stages.iter().enumerate().skip(1) {
        let index = index as u64;
        if stage.is_empty() {
            return Err(LedgerError::EmptyStage { stage: index });
        }
        for block in stage.blocks() {
            if block.stage() != index {
                return Err(LedgerError::StageGap {
                    stage: block.stage(),
                    height: index,
                });
            }
            if !block.is_hash_current() || !target.is_met_by(block.hash()) {
                return Err(LedgerError::ProofInvalid {
                    stage: index,
                    hash: block.hash_hex(),
                });
            }
            if !stages[index as usize - 1].contains_hash(block.parent_hash()) {
                return Err(LedgerError::ParentNotFound {
                    stage: index,
                    parent: hex::encode(block.parent_hash()),
                });
            }
        }
    }
    Ok(())
}
