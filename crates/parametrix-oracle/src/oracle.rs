//! Registered oracles

use parametrix_common::{BoundedText, Height, Principal, DEFAULT_REPUTATION};
use serde::{Deserialize, Serialize};

/// Maximum length of an oracle's data source label
pub const DATA_SOURCE_MAX_LEN: usize = 100;

/// Data source label (e.g. "noaa-gsod", "flightaware")
pub type DataSource = BoundedText<DATA_SOURCE_MAX_LEN>;

/// Sequential oracle identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleId(pub u64);

impl std::fmt::Display for OracleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "oracle/{}", self.0)
    }
}

/// External data source bound to one caller identity
///
/// Only the caller whose identity equals `address` may submit data through
/// this registration. Deactivated oracles keep their history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    pub id: OracleId,
    pub address: Principal,
    pub data_source: DataSource,
    /// 0..=1000
    pub reputation_score: u16,
    pub total_submissions: u64,
    pub is_active: bool,
    pub registered_at: Height,
}

impl Oracle {
    pub(crate) fn register(id: OracleId, address: Principal, data_source: DataSource, height: Height) -> Self {
        Self {
            id,
            address,
            data_source,
            reputation_score: DEFAULT_REPUTATION,
            total_submissions: 0,
            is_active: true,
            registered_at: height,
        }
    }

    /// Whether `caller` may submit through this oracle
    pub fn is_bound_to(&self, caller: &Principal) -> bool {
        &self.address == caller
    }
}
