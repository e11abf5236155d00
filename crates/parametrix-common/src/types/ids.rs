//! Identifiers that cross ledger boundaries
//!
//! The oracle ledger keys claim triggers by the policy ledger's ids without
//! depending on the policy crate; both use this type.

use serde::{Deserialize, Serialize};

/// Sequential policy identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub u64);

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "policy/{}", self.0)
    }
}
