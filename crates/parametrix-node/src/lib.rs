//! # Parametrix Node
//!
//! Hosts the Policy Ledger and the Oracle & Trigger Ledger behind a single
//! writer, and runs the off-ledger half of the claim flow.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      LedgerHandle (clone)                │
//! │                 async calls ──► mpsc queue               │
//! ├──────────────────────────────────────────────────────────┤
//! │                       LedgerActor                        │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌────────────┐  │
//! │  │ PolicyLedger │  │   OracleLedger   │  │HeightClock │  │
//! │  └──────────────┘  └──────────────────┘  └────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//!            ▲                                    │
//!            │ evaluate / settle                  ▼
//!   ClaimOrchestrator ──► PayoutExecutor     NodeSnapshot (JSON)
//! ```

pub mod actor;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod snapshot;

pub use actor::{Command, LedgerActor, LedgerHandle};
pub use clock::HeightClock;
pub use config::NodeConfig;
pub use metrics::LedgerMetrics;
pub use orchestrator::{
    ClaimOrchestrator, Evaluation, InMemoryPayoutExecutor, PayoutExecutor, PayoutRecord,
    Settlement,
};
pub use snapshot::NodeSnapshot;
