//! Random-nonce proof-of-work search.
//!
//! Every attempt draws a fresh 8-byte nonce from a cryptographic RNG, so
//! attempts are independent and the expected count is
//! [`Target::expected_attempts`]. [`search`] never gives up; [`search_with`]
//! honours a [`SearchLimits`] and reports why it stopped.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use rand::{CryptoRng, RngCore};
use tracing::{debug, info};

use crate::{
    block::finish_with_nonce,
    constants::{CANCEL_CHECK_INTERVAL, NONCE_SIZE},
    error::SearchError,
    Block, Target,
};

/// Shared stop signal for a running search. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bounds on a search. The default is unbounded but still cancellable.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub deadline: Option<Instant>,
    pub max_attempts: Option<u64>,
    pub cancel: CancelFlag,
}

impl SearchLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The deadline is fixed now, not when a search starts. A timeout too
    /// large to represent as an `Instant` leaves the search without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) fn attempts_exhausted(&self, attempts: u64) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }

    /// Cancellation wins over the deadline when both have fired.
    pub(crate) fn poll(&self, attempts: u64, started: Instant) -> Result<(), SearchError> {
        if self.cancel.is_cancelled() {
            return Err(SearchError::ProofSearchCancelled { attempts });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(SearchError::ProofSearchTimeout {
                attempts,
                elapsed: started.elapsed(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchStats {
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Mutate `block` until its hash clears `target`. Does not return otherwise.
pub fn search(block: &mut Block, target: &Target) -> SearchStats {
    let started = Instant::now();
    let hasher = block.prefix_hasher();
    let mut rng = rand::thread_rng();
    let mut nonce = [0u8; NONCE_SIZE];
    let mut attempts = 0u64;
    loop {
        rng.fill_bytes(&mut nonce);
        attempts += 1;
        if target.is_met_by(&finish_with_nonce(hasher.clone(), &nonce)) {
            return found(block, nonce, attempts, started);
        }
    }
}

/// Bounded search drawing nonces from the thread-local CSPRNG.
pub fn search_with(
    block: &mut Block,
    target: &Target,
    limits: &SearchLimits,
) -> Result<SearchStats, SearchError> {
    search_with_rng(block, target, limits, &mut rand::thread_rng())
}

/// Bounded search with a caller-supplied RNG. On failure the block keeps the
/// nonce and hash it had on entry.
pub fn search_with_rng<R>(
    block: &mut Block,
    target: &Target,
    limits: &SearchLimits,
    rng: &mut R,
) -> Result<SearchStats, SearchError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let started = Instant::now();
    let hasher = block.prefix_hasher();
    let mut nonce = [0u8; NONCE_SIZE];
    let mut attempts = 0u64;
    loop {
        if attempts % CANCEL_CHECK_INTERVAL == 0 {
            limits.poll(attempts, started).inspect_err(|err| {
                debug!(stage = block.stage(), %err, "proof search stopped");
            })?;
        }
        if limits.attempts_exhausted(attempts) {
            debug!(stage = block.stage(), attempts, "proof search hit attempt cap");
            return Err(SearchError::ProofSearchTimeout {
                attempts,
                elapsed: started.elapsed(),
            });
        }
        rng.fill_bytes(&mut nonce);
        attempts += 1;
        if target.is_met_by(&finish_with_nonce(hasher.clone(), &nonce)) {
            return Ok(found(block, nonce, attempts, started));
        }
    }
}

pub(crate) fn found(
    block: &mut Block,
    nonce: [u8; NONCE_SIZE],
    attempts: u64,
    started: Instant,
) -> SearchStats {
    block.set_nonce(nonce);
    let stats = SearchStats {
        attempts,
        elapsed: started.elapsed(),
    };
    info!(
        "Proved stage {} block after {} attempts ({:?}) with hash {}",
        block.stage(),
        attempts,
        stats.elapsed,
        block.hash_hex()
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn candidate() -> Block {
        Block::new(1, Block::genesis().hash().to_vec(), b"x".to_vec())
    }

    #[test]
    fn search_clears_target() {
        let target = Target::from_difficulty(8).unwrap();
        let mut block = candidate();
        let stats = search(&mut block, &target);
        assert!(stats.attempts >= 1);
        assert!(target.is_met_by(block.hash()));
        assert!(block.is_hash_current());
        assert_eq!(block.nonce().len(), NONCE_SIZE);
    }

    #[test]
    fn seeded_search_is_reproducible() {
        let target = Target::from_difficulty(10).unwrap();
        let limits = SearchLimits::unbounded();

        let mut a = candidate();
        let mut b = candidate();
        let sa = search_with_rng(&mut a, &target, &limits, &mut StdRng::seed_from_u64(7)).unwrap();
        let sb = search_with_rng(&mut b, &target, &limits, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(sa.attempts, sb.attempts);
        assert!(target.is_met_by(a.hash()));
    }

    #[test]
    fn zero_difficulty_takes_one_attempt() {
        let target = Target::from_difficulty(0).unwrap();
        let mut block = candidate();
        let stats = search_with(&mut block, &target, &SearchLimits::unbounded()).unwrap();
        assert_eq!(stats.attempts, 1);
    }

    #[test]
    fn cancelled_before_start() {
        let target = Target::from_difficulty(8).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let limits = SearchLimits::unbounded().with_cancel(cancel);

        let mut block = candidate();
        let before = block.clone();
        let err = search_with(&mut block, &target, &limits).unwrap_err();
        assert_eq!(err, SearchError::ProofSearchCancelled { attempts: 0 });
        assert_eq!(block, before);
    }

    #[test]
    fn attempt_cap_reports_timeout() {
        let target = Target::from_difficulty(255).unwrap();
        let limits = SearchLimits::unbounded().with_max_attempts(100);
        let mut block = candidate();
        let before = block.clone();
        match search_with(&mut block, &target, &limits) {
            Err(SearchError::ProofSearchTimeout { attempts, .. }) => assert_eq!(attempts, 100),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(block, before);
    }

    #[test]
    fn expired_deadline_reports_timeout() {
        let target = Target::from_difficulty(255).unwrap();
        let limits = SearchLimits::unbounded().with_timeout(Duration::ZERO);
        let mut block = candidate();
        assert!(matches!(
            search_with(&mut block, &target, &limits),
            Err(SearchError::ProofSearchTimeout { attempts: 0, .. })
        ));
    }

    #[test]
    fn huge_timeout_means_no_deadline() {
        let limits = SearchLimits::unbounded().with_timeout(Duration::from_secs(u64::MAX));
        assert!(limits.deadline.is_none());

        let target = Target::from_difficulty(4).unwrap();
        let mut block = candidate();
        assert!(search_with(&mut block, &target, &limits).is_ok());
    }

    #[test]
    fn cancel_from_another_thread() {
        let target = Target::from_difficulty(255).unwrap();
        let cancel = CancelFlag::new();
        let limits = SearchLimits::unbounded().with_cancel(cancel.clone());

        let handle = std::thread::spawn(move || {
            let mut block = candidate();
            search_with(&mut block, &target, &limits)
        });
        std::thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        let outcome = handle.join().unwrap();
        assert!(matches!(
            outcome,
            Err(SearchError::ProofSearchCancelled { .. })
        ));
    }
}
