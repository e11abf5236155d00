//! State digests
//!
//! A ledger snapshot is serialized with `serde_json` (all collections are
//! `BTreeMap`s, so the encoding is canonical) and hashed with BLAKE3. Two
//! replicas that applied the same calls in the same order report the same
//! digest.

use serde::Serialize;

use crate::error::Result;

/// 32-byte BLAKE3 digest of a ledger snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateDigest(pub [u8; 32]);

impl StateDigest {
    /// Digest the canonical JSON encoding of `state`
    pub fn of<T: Serialize>(state: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(state)?;
        Ok(Self(*blake3::hash(&bytes).as_bytes()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for StateDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
