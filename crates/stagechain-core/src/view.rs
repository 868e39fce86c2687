//! Display snapshot of a ledger.

use std::fmt;

use serde::Serialize;

use crate::{Block, Stage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerView {
    pub difficulty_bits: u32,
    pub target: String,
    pub stages: Vec<StageView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageView {
    pub index: u64,
    pub blocks: Vec<BlockSummary>,
}

/// Hex for the binary fields, lossy UTF-8 for the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub parent_hash: String,
    pub data: String,
    pub nonce: String,
    pub hash: String,
}

impl From<&Block> for BlockSummary {
    fn from(block: &Block) -> Self {
        Self {
            parent_hash: hex::encode(block.parent_hash()),
            data: String::from_utf8_lossy(block.data()).into_owned(),
            nonce: hex::encode(block.nonce()),
            hash: block.hash_hex(),
        }
    }
}

impl StageView {
    pub(crate) fn new(index: u64, stage: &Stage) -> Self {
        Self {
            index,
            blocks: stage.blocks().iter().map(BlockSummary::from).collect(),
        }
    }
}

impl fmt::Display for LedgerView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in &self.stages {
            writeln!(f, "Stage {}", stage.index)?;
            for block in &stage.blocks {
                writeln!(
                    f,
                    "\tPrevBlockHash: {}, Data: {}, Nonce: {}, Hash: {}",
                    block.parent_hash, block.data, block.nonce, block.hash
                )?;
            }
        }
        Ok(())
    }
}
