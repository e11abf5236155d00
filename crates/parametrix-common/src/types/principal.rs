//! Principal - caller identity supplied by the host with every call
//!
//! Identities are opaque to the ledgers: an address string, a DID, an account
//! key rendered as text. The only operation the engine performs on them is
//! equality, e.g. caller == policy holder, caller == oracle address,
//! caller == ledger owner.

use serde::{Deserialize, Serialize};

/// Opaque caller identity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap an identity string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Principal {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
