//! Trigger conditions and claim triggers
//!
//! A [`TriggerCondition`] is an administrator-defined rule. A
//! [`ClaimTrigger`] links a policy to the data point and condition that
//! fired it. The ledger never evaluates the rule against the data: whoever
//! calls `process_trigger` asserts that it holds.

use parametrix_common::{BoundedText, Height, LedgerError, PolicyId, Principal};
use serde::{Deserialize, Serialize};

use crate::data::DataId;

/// Maximum length of a condition type label
pub const CONDITION_TYPE_MAX_LEN: usize = 50;

/// Maximum length of a dispute reason
pub const DISPUTE_REASON_MAX_LEN: usize = 256;

/// Condition type label (e.g. "rainfall-below", "delay-minutes")
pub type ConditionType = BoundedText<CONDITION_TYPE_MAX_LEN>;

/// Free-text reason attached to a dispute
pub type DisputeReason = BoundedText<DISPUTE_REASON_MAX_LEN>;

/// Sequential trigger condition identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(pub u64);

impl std::fmt::Display for ConditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "condition/{}", self.0)
    }
}

/// Comparison applied between an observed value and a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl ComparisonOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
        }
    }

    /// `observed <op> threshold`
    pub fn holds<T: PartialOrd>(self, observed: &T, threshold: &T) -> bool {
        match self {
            ComparisonOperator::GreaterThan => observed > threshold,
            ComparisonOperator::GreaterOrEqual => observed >= threshold,
            ComparisonOperator::LessThan => observed < threshold,
            ComparisonOperator::LessOrEqual => observed <= threshold,
            ComparisonOperator::Equal => observed == threshold,
            ComparisonOperator::NotEqual => observed != threshold,
        }
    }
}

impl std::str::FromStr for ComparisonOperator {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(ComparisonOperator::GreaterThan),
            ">=" => Ok(ComparisonOperator::GreaterOrEqual),
            "<" => Ok(ComparisonOperator::LessThan),
            "<=" => Ok(ComparisonOperator::LessOrEqual),
            "==" => Ok(ComparisonOperator::Equal),
            "!=" => Ok(ComparisonOperator::NotEqual),
            _ => Err(LedgerError::InvalidInput),
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrator-defined payout rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub id: ConditionId,
    pub condition_type: ConditionType,
    pub threshold_value: u64,
    pub comparison_operator: ComparisonOperator,
    pub is_active: bool,
    pub created_by: Principal,
    pub created_at: Height,
}

/// Claim trigger lifecycle
///
/// ```text
/// (none) ──► Triggered ──► Disputed ──► Upheld
///               ▲                  └──► Overturned
///               └── re-trigger from Triggered / Upheld / Overturned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerStatus {
    Triggered,
    Disputed,
    /// Dispute resolved in favour of the trigger
    Upheld,
    /// Dispute resolved against the trigger
    Overturned,
}

impl TriggerStatus {
    /// `process_trigger` may overwrite a record in this status
    pub fn can_retrigger(self) -> bool {
        self != TriggerStatus::Disputed
    }

    /// `dispute_trigger` may move a record in this status to `Disputed`
    pub fn can_dispute(self) -> bool {
        self == TriggerStatus::Triggered
    }

    /// The trigger stands and the payout may be released
    pub fn is_payable(self) -> bool {
        matches!(self, TriggerStatus::Triggered | TriggerStatus::Upheld)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerStatus::Triggered => "triggered",
            TriggerStatus::Disputed => "disputed",
            TriggerStatus::Upheld => "upheld",
            TriggerStatus::Overturned => "overturned",
        }
    }
}

impl std::fmt::Display for TriggerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who disputed a trigger, why, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRecord {
    pub disputed_by: Principal,
    pub reason: DisputeReason,
    pub disputed_at: Height,
}

/// Link between a policy and the observation + rule that fired it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTrigger {
    pub policy_id: PolicyId,
    pub trigger_data_id: DataId,
    pub trigger_condition_id: ConditionId,
    pub triggered_at: Height,
    pub trigger_status: TriggerStatus,
    pub processed_by: Principal,
    pub dispute: Option<DisputeRecord>,
    pub resolved_by: Option<Principal>,
    pub resolved_at: Option<Height>,
}
