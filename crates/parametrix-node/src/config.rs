//! Node configuration

use std::path::PathBuf;

use parametrix_common::{ParametrixError, Result};
use serde::{Deserialize, Serialize};

/// Optional config file looked up next to the working directory
pub const CONFIG_FILE: &str = "parametrix";

/// Environment prefix, e.g. `PARAMETRIX__OWNER`
pub const ENV_PREFIX: &str = "PARAMETRIX";

/// Parametrix node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Administrator identity of both ledgers (fresh state only)
    pub owner: String,
    /// Bound of the ledger actor's command queue
    pub channel_capacity: usize,
    /// Snapshot restored at start and written on shutdown
    pub snapshot_path: PathBuf,
    /// Register prometheus counters
    pub metrics_enabled: bool,
    /// Fallback filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            owner: "parametrix-admin".to_string(),
            channel_capacity: 1024,
            snapshot_path: PathBuf::from("data/parametrix-snapshot.json"),
            metrics_enabled: true,
            log_filter: "info,parametrix=debug".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load from `.env`, the optional `parametrix.*` file and `PARAMETRIX__*` variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_source(config::File::with_name(CONFIG_FILE).required(false))
    }

    /// Load from `source`, overridden by `PARAMETRIX__*` variables
    pub fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(source)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| ParametrixError::Config(e.to_string()))?;

        let cfg: Self = settings
            .try_deserialize()
            .map_err(|e| ParametrixError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(ParametrixError::Config("owner must not be empty".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ParametrixError::Config(
                "channel_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}
