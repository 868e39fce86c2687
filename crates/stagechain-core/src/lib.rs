//! Stage-linked proof-of-work ledger.
//!
//! A [`Ledger`] is a sequence of [`Stage`]s. Every block outside the genesis
//! stage names the hash of a block in the stage before it, and is admitted
//! only when its SHA-256 digest, read as a big-endian integer, falls strictly
//! below the ledger's [`Target`].

pub mod block;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod pow;
pub mod stage;
pub mod target;
pub mod view;

pub type Hash = [u8; 32];

pub use block::{block_digest, Block};
pub use error::{LedgerError, SearchError};
pub use ledger::{Acceptance, Ledger};
pub use mine::search_parallel;
pub use pow::{search, search_with, CancelFlag, SearchLimits, SearchStats};
pub use stage::Stage;
pub use target::Target;
pub use view::{BlockSummary, LedgerView, StageView};
