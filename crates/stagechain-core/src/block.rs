use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    constants::{BYTE, GENESIS_DATA},
    Hash,
};

/// A candidate or accepted block.
///
/// `hash` is a cache of [`block_digest`] over the other four fields. The
/// fields are private so that every write to `nonce` also rewrites `hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    stage: u64,
    parent_hash: Vec<u8>,
    data: Vec<u8>,
    nonce: Vec<u8>,
    hash: Hash,
}

impl Block {
    /// Build an unproven block with an empty nonce. The hash is computed immediately.
    pub fn new(stage: u64, parent_hash: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Self {
        let mut block = Self {
            stage,
            parent_hash: parent_hash.into(),
            data: data.into(),
            nonce: Vec::new(),
            hash: [0u8; 32],
        };
        block.recompute_hash();
        block
    }

    /// The seed block of stage 0. It is never proven.
    pub fn genesis() -> Self {
        Self::new(0, Vec::new(), GENESIS_DATA)
    }

    pub fn stage(&self) -> u64 {
        self.stage
    }

    pub fn parent_hash(&self) -> &[u8] {
        &self.parent_hash
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Digest preimage: `stage` as 8 little-endian bytes, then parent hash,
    /// data and nonce verbatim, with no length prefixes.
    pub fn hash_bytes(&self) -> Vec<u8> {
        preimage(self.stage, &self.parent_hash, &self.data, &self.nonce)
    }

    /// Digest of the current fields, ignoring the cached hash.
    pub fn digest(&self) -> Hash {
        block_digest(self.stage, &self.parent_hash, &self.data, &self.nonce)
    }

    pub fn recompute_hash(&mut self) {
        self.hash = self.digest();
    }

    /// Replace the nonce and refresh the hash in one step.
    pub fn set_nonce(&mut self, nonce: impl Into<Vec<u8>>) {
        self.nonce = nonce.into();
        self.recompute_hash();
    }

    /// Hasher already fed with everything but the nonce, for search loops
    /// that only vary the trailing bytes.
    pub(crate) fn prefix_hasher(&self) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(self.stage.to_le_bytes());
        hasher.update(&self.parent_hash);
        hasher.update(&self.data);
        hasher
    }

    /// Whether the cached hash still matches the fields.
    pub fn is_hash_current(&self) -> bool {
        self.hash == self.digest()
    }
}

fn preimage(stage: u64, parent_hash: &[u8], data: &[u8], nonce: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(BYTE + parent_hash.len() + data.len() + nonce.len());
    bytes.extend_from_slice(&stage.to_le_bytes());
    bytes.extend_from_slice(parent_hash);
    bytes.extend_from_slice(data);
    bytes.extend_from_slice(nonce);
    bytes
}

/// Finish a [`Block::prefix_hasher`] clone with a candidate nonce.
pub(crate) fn finish_with_nonce(mut hasher: Sha256, nonce: &[u8]) -> Hash {
    hasher.update(nonce);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// SHA-256 over the block preimage.
pub fn block_digest(stage: u64, parent_hash: &[u8], data: &[u8], nonce: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(preimage(stage, parent_hash, data, nonce));
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}
