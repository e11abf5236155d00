//! Claim orchestrator
//!
//! Off-ledger half of a claim. The ledgers record triggers without looking
//! at the data; this module compares the observation with the condition,
//! issues the cross-ledger calls, and hands payable claims to a
//! [`PayoutExecutor`].

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use parametrix_common::{LedgerError, ParametrixError, PolicyId, Principal, Result};
use parametrix_oracle::{ConditionId, DataId, TriggerStatus};
use parametrix_policy::{Policy, PolicyStatus};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::actor::LedgerHandle;

/// Value transfer collaborator that releases coverage to the holder
#[async_trait]
pub trait PayoutExecutor: Send + Sync {
    /// Pay `amount` to the holder of `policy`
    async fn release(&self, policy: &Policy, amount: u64) -> Result<()>;
}

/// A released payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub policy_id: PolicyId,
    pub beneficiary: Principal,
    pub amount: u64,
}

/// Payout executor that only records what it was asked to pay
#[derive(Debug, Default)]
pub struct InMemoryPayoutExecutor {
    released: Mutex<Vec<PayoutRecord>>,
}

impl InMemoryPayoutExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn released(&self) -> Vec<PayoutRecord> {
        self.released.lock().clone()
    }

    pub fn total_released(&self) -> u128 {
        self.released.lock().iter().map(|p| p.amount as u128).sum()
    }
}

#[async_trait]
impl PayoutExecutor for InMemoryPayoutExecutor {
    async fn release(&self, policy: &Policy, amount: u64) -> Result<()> {
        self.released.lock().push(PayoutRecord {
            policy_id: policy.id,
            beneficiary: policy.holder.clone(),
            amount,
        });
        Ok(())
    }
}

/// Result of evaluating a condition against a data point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Condition held; trigger recorded and policy moved to `Triggered`
    Triggered,
    /// Condition did not hold; nothing written
    NotMet,
}

/// Result of settling a triggered claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Coverage released and policy moved to `PaidOut`
    PaidOut { amount: u64 },
    /// Trigger overturned; policy back to `Active`
    Reinstated,
    /// Disputed trigger awaiting resolution
    AwaitingResolution,
}

/// Evaluates trigger conditions and settles claims as `operator`
///
/// `operator` must be the administrator of both ledgers.
pub struct ClaimOrchestrator {
    ledgers: LedgerHandle,
    operator: Principal,
    payouts: Arc<dyn PayoutExecutor>,
}

impl ClaimOrchestrator {
    pub fn new(ledgers: LedgerHandle, operator: impl Into<Principal>, payouts: Arc<dyn PayoutExecutor>) -> Self {
        Self {
            ledgers,
            operator: operator.into(),
            payouts,
        }
    }

    async fn policy(&self, policy_id: PolicyId) -> Result<Policy> {
        self.ledgers
            .get_policy(policy_id)
            .await?
            .ok_or(ParametrixError::Ledger(LedgerError::NotFound))
    }

    /// Compare `data_id` against `condition_id` and trigger `policy_id` when it holds
    #[instrument(skip(self))]
    pub async fn evaluate(
        &self,
        policy_id: PolicyId,
        data_id: DataId,
        condition_id: ConditionId,
    ) -> Result<Evaluation> {
        let policy = self.policy(policy_id).await?;
        if policy.status != PolicyStatus::Active {
            return Err(LedgerError::InvalidState.into());
        }

        let data = self
            .ledgers
            .get_data_point(data_id)
            .await?
            .ok_or(ParametrixError::Ledger(LedgerError::NotFound))?;
        if !data.is_validated() {
            return Err(ParametrixError::Condition(format!(
                "{} is {:?}, not validated",
                data_id, data.validation_status
            )));
        }

        let condition = self
            .ledgers
            .get_trigger_condition(condition_id)
            .await?
            .ok_or(ParametrixError::Ledger(LedgerError::NotFound))?;
        if !condition.is_active {
            return Err(ParametrixError::Condition(format!(
                "{} is deactivated",
                condition_id
            )));
        }

        let observed = Decimal::from_str(data.value.as_str().trim()).map_err(|e| {
            ParametrixError::Condition(format!("{} value {:?}: {}", data_id, data.value.as_str(), e))
        })?;
        let threshold = Decimal::from(condition.threshold_value);

        if !condition.comparison_operator.holds(&observed, &threshold) {
            info!(
                policy_id = policy_id.0,
                observed = %observed,
                rule = %condition.comparison_operator,
                threshold = condition.threshold_value,
                "Condition not met"
            );
            return Ok(Evaluation::NotMet);
        }

        // The policy moves first: a concurrent cancel or evaluation fails
        // here, before the oracle ledger is touched.
        self.ledgers
            .update_policy_status(self.operator.clone(), policy_id, PolicyStatus::Triggered)
            .await?;
        if let Err(err) = self
            .ledgers
            .process_trigger(self.operator.clone(), policy_id, data_id, condition_id)
            .await
        {
            warn!(policy_id = policy_id.0, error = %err, "Trigger rejected, reinstating policy");
            if let Err(revert) = self
                .ledgers
                .update_policy_status(self.operator.clone(), policy_id, PolicyStatus::Active)
                .await
            {
                error!(policy_id = policy_id.0, error = %revert, "Policy left Triggered without a claim trigger");
            }
            return Err(err);
        }

        info!(policy_id = policy_id.0, observed = %observed, "Claim triggered");
        Ok(Evaluation::Triggered)
    }

    /// Pay out or reinstate a triggered policy according to its claim trigger
    #[instrument(skip(self))]
    pub async fn settle(&self, policy_id: PolicyId) -> Result<Settlement> {
        let trigger = self
            .ledgers
            .get_claim_trigger(policy_id)
            .await?
            .ok_or(ParametrixError::Ledger(LedgerError::NotFound))?;
        let policy = self.policy(policy_id).await?;

        if trigger.trigger_status == TriggerStatus::Disputed {
            return Ok(Settlement::AwaitingResolution);
        }
        if policy.status != PolicyStatus::Triggered {
            return Err(LedgerError::InvalidState.into());
        }

        if trigger.trigger_status.is_payable() {
            let amount = policy.coverage_amount;
            // Only the caller whose PaidOut write lands releases the payout.
            self.ledgers
                .update_policy_status(self.operator.clone(), policy_id, PolicyStatus::PaidOut)
                .await?;
            if let Err(err) = self.payouts.release(&policy, amount).await {
                error!(policy_id = policy_id.0, amount, error = %err, "Policy marked PaidOut but payout failed");
                return Err(err);
            }

            info!(policy_id = policy_id.0, holder = %policy.holder, amount, "Claim paid out");
            Ok(Settlement::PaidOut { amount })
        } else {
            self.ledgers
                .update_policy_status(self.operator.clone(), policy_id, PolicyStatus::Active)
                .await?;

            warn!(policy_id = policy_id.0, "Overturned claim, policy reinstated");
            Ok(Settlement::Reinstated)
        }
    }
}
