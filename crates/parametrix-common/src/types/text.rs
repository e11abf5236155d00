//! BoundedText - length-capped printable ASCII strings
//!
//! Every free-text field stored by a ledger (policy type, data source,
//! observation value, dispute reason) is capped at a per-field byte length
//! and restricted to printable ASCII.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// Non-empty printable ASCII string of at most `N` bytes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundedText<const N: usize>(String);

impl<const N: usize> BoundedText<N> {
    /// Maximum length in bytes
    pub const MAX_LEN: usize = N;

    /// Validate and wrap
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        if value.is_empty() || value.len() > N {
            return Err(LedgerError::InvalidInput);
        }
        if !value.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
            return Err(LedgerError::InvalidInput);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<const N: usize> TryFrom<String> for BoundedText<N> {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const N: usize> TryFrom<&str> for BoundedText<N> {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const N: usize> From<BoundedText<N>> for String {
    fn from(text: BoundedText<N>) -> Self {
        text.0
    }
}

impl<const N: usize> AsRef<str> for BoundedText<N> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> std::fmt::Display for BoundedText<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
