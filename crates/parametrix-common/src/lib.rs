//! # Parametrix Common
//!
//! Shared building blocks for the Parametrix policy and oracle ledgers.
//!
//! ## Core Types
//!
//! - [`Principal`]: opaque caller identity compared by equality
//! - [`CallContext`]: caller + height handed to every ledger call
//! - [`BoundedText`]: length-capped printable ASCII field
//! - [`LedgerGate`]: owner identity, pause flag and version of one ledger
//!
//! ## Errors
//!
//! - [`LedgerError`]: fixed result-code taxonomy of the ledgers
//! - [`ParametrixError`]: unified error for everything around them
//!
//! ## Audit
//!
//! - [`audit`]: per-call audit events and sinks

pub mod audit;
pub mod digest;
pub mod error;
pub mod gate;
pub mod types;

// Re-export commonly used types at crate root
pub use audit::{AuditCategory, AuditEvent, AuditLogger, AuditSink, MemoryAuditSink};
pub use digest::StateDigest;
pub use error::{LedgerError, LedgerResult, ParametrixError, Result};
pub use gate::{Access, LedgerGate};
pub use types::{
    context::{CallContext, Height},
    ids::PolicyId,
    principal::Principal,
    text::BoundedText,
};

/// Parametrix version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum oracle reputation score
pub const MAX_REPUTATION: u16 = 1000;

/// Reputation assigned to newly registered oracles
pub const DEFAULT_REPUTATION: u16 = 100;

/// Smallest insurable coverage amount
pub const MIN_COVERAGE: u64 = 1;

/// Largest insurable coverage amount
pub const MAX_COVERAGE: u64 = 10_000_000_000_000;
