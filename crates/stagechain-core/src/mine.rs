use crate::{
    block::finish_with_nonce,
    constants::{CANCEL_CHECK_INTERVAL, NONCE_SIZE},
    error::SearchError,
    pow::{found, SearchLimits, SearchStats},
    Block, Target,
};
use rand::RngCore;
use rayon::prelude::*;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};
use tracing::debug;

/// Same search as [`crate::pow::search_with`], with random draws spread over
/// the rayon pool. The first worker to clear the target wins; a limit firing
/// on any worker stops them all.
pub fn search_parallel(
    block: &mut Block,
    target: &Target,
    limits: &SearchLimits,
) -> Result<SearchStats, SearchError> {
    let started = Instant::now();
    limits.poll(0, started)?;

    // Only the nonce varies between attempts.
    let hasher = block.prefix_hasher();
    let attempts = AtomicU64::new(0);

    let outcome = (0u64..u64::MAX)
        .into_par_iter()
        .map_init(rand::thread_rng, |rng, _| {
            let done = attempts.fetch_add(1, Ordering::Relaxed);
            if limits.attempts_exhausted(done) {
                return Some(Err(SearchError::ProofSearchTimeout {
                    attempts: done,
                    elapsed: started.elapsed(),
                }));
            }
            if done % CANCEL_CHECK_INTERVAL == 0 {
                if let Err(err) = limits.poll(done, started) {
                    return Some(Err(err));
                }
            }
            let mut nonce = [0u8; NONCE_SIZE];
            rng.fill_bytes(&mut nonce);
            target
                .is_met_by(&finish_with_nonce(hasher.clone(), &nonce))
                .then_some(Ok(nonce))
        })
        .find_map_any(|outcome| outcome);

    let total = attempts.load(Ordering::Relaxed);
    match outcome {
        Some(Ok(nonce)) => Ok(found(block, nonce, total, started)),
        Some(Err(err)) => {
            debug!(stage = block.stage(), %err, "parallel proof search stopped");
            Err(err)
        }
        None => Err(SearchError::ProofSearchTimeout {
            attempts: total,
            elapsed: started.elapsed(),
        }),
    }
}
