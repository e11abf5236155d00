//! JSON snapshots of both ledgers

use std::fs;
use std::path::Path;

use parametrix_common::{Height, Result, StateDigest};
use parametrix_oracle::OracleLedgerState;
use parametrix_policy::PolicyLedgerState;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Persisted node state: both ledgers plus the next height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub height: Height,
    pub policy: PolicyLedgerState,
    pub oracle: OracleLedgerState,
}

impl NodeSnapshot {
    /// Read a snapshot; `None` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let snapshot: Self = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), height = snapshot.height, "Snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Write via a temporary file and rename
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), height = self.height, "Snapshot saved");
        Ok(())
    }

    pub fn digest(&self) -> Result<StateDigest> {
        StateDigest::of(self)
    }
}
