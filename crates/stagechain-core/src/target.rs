//! Difficulty target: the threshold a block hash must fall strictly below.

use std::fmt;

use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};

use crate::{constants::HASH_BITS, error::LedgerError, Hash};

/// `2^(256 - difficulty_bits)`.
///
/// Held as a 512-bit integer because difficulty 0 yields `2^256`, one past
/// the largest 256-bit value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Target {
    difficulty_bits: u32,
    value: U512,
}

impl Target {
    pub fn from_difficulty(difficulty_bits: u32) -> Result<Self, LedgerError> {
        if difficulty_bits >= HASH_BITS {
            return Err(LedgerError::InvalidDifficulty {
                bits: difficulty_bits,
            });
        }
        let value = U512::one() << (HASH_BITS - difficulty_bits) as usize;
        Ok(Self {
            difficulty_bits,
            value,
        })
    }

    pub fn difficulty_bits(&self) -> u32 {
        self.difficulty_bits
    }

    pub fn value(&self) -> U512 {
        self.value
    }

    /// True when `hash`, read as a big-endian integer, is strictly below the target.
    #[inline]
    pub fn is_met_by(&self, hash: &Hash) -> bool {
        U512::from(U256::from_big_endian(hash)) < self.value
    }

    /// Mean number of random draws needed to clear this target.
    pub fn expected_attempts(&self) -> f64 {
        2f64.powi(self.difficulty_bits as i32)
    }

    /// Big-endian hex of the 32 low bytes, or 33 bytes for difficulty 0.
    pub fn to_hex(&self) -> String {
        let mut bytes = [0u8; 64];
        self.value.to_big_endian(&mut bytes);
        if bytes[31] == 0 {
            hex::encode(&bytes[32..])
        } else {
            hex::encode(&bytes[31..])
        }
    }
}

impl TryFrom<u32> for Target {
    type Error = LedgerError;

    fn try_from(difficulty_bits: u32) -> Result<Self, Self::Error> {
        Self::from_difficulty(difficulty_bits)
    }
}

impl From<Target> for u32 {
    fn from(target: Target) -> u32 {
        target.difficulty_bits
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
