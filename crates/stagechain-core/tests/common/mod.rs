use stagechain_core::{pow, Block, Hash, Ledger};

/// Build and prove a block on `parent` at the ledger's difficulty.
pub fn proven_block(ledger: &Ledger, stage: u64, parent: &[u8], data: &str) -> Block {
    let mut block = Block::new(stage, parent.to_vec(), data.as_bytes().to_vec());
    pow::search(&mut block, ledger.target());
    block
}

/// Grow `stages` new stages with `per_stage` blocks each, every block
/// extending the first block of the previous stage.
pub fn grow(ledger: &Ledger, stages: u64, per_stage: usize) -> Vec<Hash> {
    let mut accepted = Vec::new();
    for _ in 0..stages {
        let stage = ledger.height();
        let parent = ledger.tip_hashes()[0];
        for i in 0..per_stage {
            let block = proven_block(ledger, stage, &parent, &format!("s{stage}-b{i}"));
            let acceptance = ledger.add_block(block).expect("proven block on a tip is accepted");
            accepted.push(acceptance.hash);
        }
    }
    accepted
}
