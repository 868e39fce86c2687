use serde::{Deserialize, Serialize};

use crate::Block;

/// Blocks sharing one ledger position, in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    blocks: Vec<Block>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_block(block: Block) -> Self {
        Self {
            blocks: vec![block],
        }
    }

    pub(crate) fn push(&mut self, block: Block) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// First member whose cached hash equals `hash` byte for byte.
    pub fn find(&self, hash: &[u8]) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash().as_slice() == hash)
    }

    pub fn contains_hash(&self, hash: &[u8]) -> bool {
        self.find(hash).is_some()
    }
}
