pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_BITS: u32 = (HASH_SIZE * BYTE) as u32;
/// Width of the random nonce drawn on every search attempt.
pub const NONCE_SIZE: usize = 8;
/// Payload of the proof-exempt block that seeds stage 0.
pub const GENESIS_DATA: &[u8] = b"GENBLOCK";
pub const DEFAULT_DIFFICULTY_BITS: u32 = 20;
/// Attempts between two polls of the cancel flag and deadline.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;
