//! # Policy Ledger
//!
//! Parametric insurance policies for Parametrix.
//!
//! ## Records
//!
//! - [`Policy`]: holder, premium, coverage and lifecycle status
//! - [`HolderSummary`]: monotonically growing count and premium total per holder
//!
//! ## Entry points
//!
//! | Call | Who |
//! |------|-----|
//! | `create_policy` | anyone (caller becomes holder) |
//! | `cancel_policy` | the holder |
//! | `update_policy_status` | ledger owner |
//! | `set_active` / `pause` / `unpause` | ledger owner |
//!
//! The ledger is a leaf: it knows nothing about oracles or triggers. Premium
//! collection happens in the value-transfer layer before `create_policy` is
//! applied.

pub mod ledger;
pub mod policy;
pub mod summary;

pub use ledger::{PolicyLedger, PolicyLedgerState, SharedPolicyLedger};
pub use policy::{Policy, PolicyId, PolicyStatus, PolicyType, POLICY_TYPE_MAX_LEN};
pub use summary::HolderSummary;
