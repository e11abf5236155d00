//! Policy records and the policy status transition table

pub use parametrix_common::PolicyId;

use parametrix_common::{BoundedText, Height, LedgerError, Principal};
use serde::{Deserialize, Serialize};

/// Maximum length of a policy type label
pub const POLICY_TYPE_MAX_LEN: usize = 50;

/// Policy type label (e.g. "crop-rainfall", "flight-delay")
pub type PolicyType = BoundedText<POLICY_TYPE_MAX_LEN>;

/// Lifecycle status of a policy
///
/// ```text
///            ┌──────────► Expired
///            │   ┌──────► Cancelled
///  Active ◄──┴──►│Suspended
///    │  ▲        │
///    ▼  │        │
///  Triggered ──► PaidOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyStatus {
    /// In force
    Active,
    /// Temporarily not in force (administrator hold)
    Suspended,
    /// A claim trigger has been recorded against the policy
    Triggered,
    /// Payout released; terminal
    PaidOut,
    /// Coverage period over; terminal
    Expired,
    /// Cancelled by the holder; terminal
    Cancelled,
}

impl PolicyStatus {
    /// Whether `self → next` is in the transition table
    ///
    /// `Cancelled → Cancelled` is accepted so cancelling twice succeeds; every
    /// other repeat of the current status is rejected.
    pub fn can_transition_to(self, next: PolicyStatus) -> bool {
        use PolicyStatus::*;
        matches!(
            (self, next),
            (Cancelled, Cancelled)
                | (Active, Suspended | Triggered | Expired | Cancelled)
                | (Suspended, Active | Expired | Cancelled)
                | (Triggered, PaidOut | Active)
        )
    }

    /// No transitions leave this status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PolicyStatus::PaidOut | PolicyStatus::Expired | PolicyStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Suspended => "suspended",
            PolicyStatus::Triggered => "triggered",
            PolicyStatus::PaidOut => "paid-out",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for PolicyStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PolicyStatus::Active),
            "suspended" => Ok(PolicyStatus::Suspended),
            "triggered" => Ok(PolicyStatus::Triggered),
            "paid-out" => Ok(PolicyStatus::PaidOut),
            "expired" => Ok(PolicyStatus::Expired),
            "cancelled" => Ok(PolicyStatus::Cancelled),
            _ => Err(LedgerError::InvalidInput),
        }
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parametric insurance policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,

    /// Caller that created the policy
    pub holder: Principal,

    pub policy_type: PolicyType,

    /// Premium paid at creation, always > 0
    pub premium_amount: u64,

    /// Coverage, within [`parametrix_common::MIN_COVERAGE`]..=[`parametrix_common::MAX_COVERAGE`]
    pub coverage_amount: u64,

    pub status: PolicyStatus,

    /// Height at creation
    pub created_at: Height,

    /// Height of the last status change
    pub updated_at: Height,
}

impl Policy {
    /// Move to `next` if the transition table allows it
    pub(crate) fn transition(&mut self, next: PolicyStatus, height: Height) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::InvalidState);
        }
        self.status = next;
        self.updated_at = height;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }
}
