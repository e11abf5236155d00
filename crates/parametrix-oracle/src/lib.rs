//! # Oracle & Trigger Ledger
//!
//! Registered data sources, their observations, payout rules and the claim
//! triggers that bind a policy to the evidence behind a payout.
//!
//! ## Records
//!
//! - [`Oracle`]: data source bound to one submitting identity
//! - [`DataPoint`]: observation with a single-shot validation verdict
//! - [`TriggerCondition`]: threshold rule, e.g. `rainfall < 50`
//! - [`ClaimTrigger`]: at most one per policy; triggered, disputed, upheld or overturned
//!
//! ## Entry points
//!
//! | Call | Who |
//! |------|-----|
//! | `submit_data` | the oracle's bound address |
//! | `dispute_trigger` | anyone |
//! | `register_oracle`, `deactivate_oracle`, `update_oracle_reputation` | ledger owner |
//! | `validate_data` | ledger owner |
//! | `create_trigger_condition`, `deactivate_trigger_condition` | ledger owner |
//! | `process_trigger`, `resolve_dispute` | ledger owner |
//! | `set_active` / `pause` / `unpause` | ledger owner |
//!
//! `process_trigger` does not compare the observation with the rule. The
//! caller evaluates off-ledger and the ledger records what it is told.

pub mod data;
pub mod ledger;
pub mod oracle;
pub mod trigger;

pub use data::{DataId, DataPoint, DataType, DataValue, ValidationStatus, DATA_VALUE_MAX_LEN};
pub use ledger::{OracleLedger, OracleLedgerState, SharedOracleLedger};
pub use oracle::{DataSource, Oracle, OracleId, DATA_SOURCE_MAX_LEN};
pub use trigger::{
    ClaimTrigger, ComparisonOperator, ConditionId, ConditionType, DisputeReason, DisputeRecord,
    TriggerCondition, TriggerStatus, CONDITION_TYPE_MAX_LEN, DISPUTE_REASON_MAX_LEN,
};
