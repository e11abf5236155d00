//! Policy Ledger state machine
//!
//! Owns policy records and holder summaries. Every entry point takes the
//! call context, runs all checks before the first write, and returns a
//! [`LedgerError`] code on failure with no state change.

use std::collections::BTreeMap;
use std::sync::Arc;

use parametrix_common::{
    Access, AuditCategory, AuditLogger, CallContext, LedgerError, LedgerGate, LedgerResult,
    Principal, StateDigest, MAX_COVERAGE, MIN_COVERAGE,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::policy::{Policy, PolicyId, PolicyStatus, PolicyType};
use crate::summary::HolderSummary;

/// Ledger shared between threads; the mutex is the single writer
pub type SharedPolicyLedger = Arc<Mutex<PolicyLedger>>;

/// Everything the Policy Ledger persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLedgerState {
    pub gate: LedgerGate,
    /// Id assigned to the next created policy
    pub next_policy_id: u64,
    pub policies: BTreeMap<PolicyId, Policy>,
    pub summaries: BTreeMap<Principal, HolderSummary>,
}

impl PolicyLedgerState {
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self {
            gate: LedgerGate::new(owner),
            next_policy_id: 0,
            policies: BTreeMap::new(),
            summaries: BTreeMap::new(),
        }
    }
}

/// Policy Ledger
#[derive(Debug)]
pub struct PolicyLedger {
    state: PolicyLedgerState,
    audit: AuditLogger,
}

impl PolicyLedger {
    /// Empty ledger administered by `owner`
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self::from_snapshot(PolicyLedgerState::new(owner))
    }

    /// Resume from a persisted snapshot
    pub fn from_snapshot(state: PolicyLedgerState) -> Self {
        Self {
            state,
            audit: AuditLogger::default(),
        }
    }

    /// Replace the audit logger
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Wrap in a mutex for shared use
    pub fn into_shared(self) -> SharedPolicyLedger {
        Arc::new(Mutex::new(self))
    }

    // ============ MUTATING ENTRY POINTS ============

    /// Create a policy held by the caller; returns its id
    pub fn create_policy(
        &mut self,
        ctx: &CallContext,
        policy_type: &str,
        premium_amount: u64,
        coverage_amount: u64,
    ) -> LedgerResult<PolicyId> {
        let result = self.try_create_policy(ctx, policy_type, premium_amount, coverage_amount);
        self.audit.record(
            ctx,
            AuditCategory::PolicyLifecycle,
            "create_policy",
            result.as_ref().ok().map(ToString::to_string),
            &result,
        );
        result
    }

    fn try_create_policy(
        &mut self,
        ctx: &CallContext,
        policy_type: &str,
        premium_amount: u64,
        coverage_amount: u64,
    ) -> LedgerResult<PolicyId> {
        self.state.gate.admit(ctx, Access::Public)?;

        if premium_amount == 0 {
            return Err(LedgerError::InvalidInput);
        }
        if !(MIN_COVERAGE..=MAX_COVERAGE).contains(&coverage_amount) {
            return Err(LedgerError::InvalidInput);
        }
        let policy_type = PolicyType::new(policy_type)?;
        let next = self
            .state
            .next_policy_id
            .checked_add(1)
            .ok_or(LedgerError::InvalidState)?;

        let id = PolicyId(self.state.next_policy_id);
        let policy = Policy {
            id,
            holder: ctx.caller.clone(),
            policy_type,
            premium_amount,
            coverage_amount,
            status: PolicyStatus::Active,
            created_at: ctx.height,
            updated_at: ctx.height,
        };

        self.state.policies.insert(id, policy);
        self.state
            .summaries
            .entry(ctx.caller.clone())
            .and_modify(|s| s.record_policy(premium_amount))
            .or_insert_with(|| HolderSummary::first(ctx.caller.clone(), premium_amount));
        self.state.next_policy_id = next;

        info!(
            policy_id = id.0,
            holder = %ctx.caller,
            premium = premium_amount,
            coverage = coverage_amount,
            "Policy created"
        );
        Ok(id)
    }

    /// Administrator status change, checked against the transition table
    pub fn update_policy_status(
        &mut self,
        ctx: &CallContext,
        policy_id: PolicyId,
        status: PolicyStatus,
    ) -> LedgerResult<()> {
        let result = self.try_update_policy_status(ctx, policy_id, status);
        self.audit.record(
            ctx,
            AuditCategory::PolicyLifecycle,
            "update_policy_status",
            Some(policy_id.to_string()),
            &result,
        );
        result
    }

    fn try_update_policy_status(
        &mut self,
        ctx: &CallContext,
        policy_id: PolicyId,
        status: PolicyStatus,
    ) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Administrator)?;

        let policy = self
            .state
            .policies
            .get_mut(&policy_id)
            .ok_or(LedgerError::NotFound)?;
        let previous = policy.status;
        policy.transition(status, ctx.height)?;

        debug!(policy_id = policy_id.0, from = %previous, to = %status, "Policy status updated");
        Ok(())
    }

    /// Holder cancels their own policy
    ///
    /// Cancelling an already cancelled policy succeeds and leaves it cancelled.
    pub fn cancel_policy(&mut self, ctx: &CallContext, policy_id: PolicyId) -> LedgerResult<()> {
        let result = self.try_cancel_policy(ctx, policy_id);
        self.audit.record(
            ctx,
            AuditCategory::PolicyLifecycle,
            "cancel_policy",
            Some(policy_id.to_string()),
            &result,
        );
        result
    }

    fn try_cancel_policy(&mut self, ctx: &CallContext, policy_id: PolicyId) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Public)?;

        let policy = self
            .state
            .policies
            .get_mut(&policy_id)
            .ok_or(LedgerError::NotFound)?;
        if policy.holder != ctx.caller {
            return Err(LedgerError::Unauthorized);
        }
        policy.transition(PolicyStatus::Cancelled, ctx.height)?;

        info!(policy_id = policy_id.0, holder = %ctx.caller, "Policy cancelled");
        Ok(())
    }

    /// Owner-only pause switch; callable while paused
    pub fn set_active(&mut self, ctx: &CallContext, active: bool) -> LedgerResult<()> {
        let result = self.state.gate.set_active(ctx, active);
        self.audit.record(
            ctx,
            AuditCategory::Administration,
            if active { "unpause" } else { "pause" },
            Some("policy-ledger".to_string()),
            &result,
        );
        if result.is_ok() {
            info!(active, "Policy ledger gate changed");
        }
        result
    }

    /// Emergency stop
    pub fn pause(&mut self, ctx: &CallContext) -> LedgerResult<()> {
        self.set_active(ctx, false)
    }

    pub fn unpause(&mut self, ctx: &CallContext) -> LedgerResult<()> {
        self.set_active(ctx, true)
    }

    // ============ QUERIES ============

    pub fn get_policy(&self, policy_id: PolicyId) -> Option<&Policy> {
        self.state.policies.get(&policy_id)
    }

    pub fn get_holder_summary(&self, holder: &Principal) -> Option<&HolderSummary> {
        self.state.summaries.get(holder)
    }

    /// Number of policies ever created (also the next id)
    pub fn policy_count(&self) -> u64 {
        self.state.next_policy_id
    }

    /// All policies in id order, for external indexers
    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.state.policies.values()
    }

    pub fn is_active(&self) -> bool {
        self.state.gate.is_active()
    }

    pub fn owner(&self) -> &Principal {
        self.state.gate.owner()
    }

    pub fn version(&self) -> u32 {
        self.state.gate.version()
    }

    /// Persistable copy of the ledger state
    pub fn snapshot(&self) -> PolicyLedgerState {
        self.state.clone()
    }

    /// BLAKE3 digest of the canonical state encoding
    pub fn state_digest(&self) -> parametrix_common::Result<StateDigest> {
        StateDigest::of(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parametrix_common::{AuditEvent, MemoryAuditSink};
    use proptest::prelude::*;

    const OWNER: &str = "SP-OWNER";
    const HOLDER: &str = "SP-HOLDER";

    fn ctx(caller: &str, height: u64) -> CallContext {
        CallContext::new(caller, height)
    }

    fn ledger() -> PolicyLedger {
        PolicyLedger::new(OWNER).with_audit(AuditLogger::silent())
    }

    #[test]
    fn test_create_policy_assigns_sequential_ids() {
        let mut ledger = ledger();

        let before = ledger.policy_count();
        let id = ledger
            .create_policy(&ctx(HOLDER, 10), "crop-rainfall", 100, 500)
            .unwrap();
        assert_eq!(id, PolicyId(before));
        assert_eq!(ledger.policy_count(), before + 1);

        let second = ledger
            .create_policy(&ctx(HOLDER, 11), "flight-delay", 50, 500)
            .unwrap();
        assert_eq!(second, PolicyId(1));
    }

    #[test]
    fn test_create_policy_round_trip() {
        let mut ledger = ledger();
        let id = ledger
            .create_policy(&ctx(HOLDER, 42), "crop-rainfall", 100, 500)
            .unwrap();

        let policy = ledger.get_policy(id).unwrap();
        assert_eq!(policy.id, id);
        assert_eq!(policy.holder, Principal::new(HOLDER));
        assert_eq!(policy.policy_type.as_str(), "crop-rainfall");
        assert_eq!(policy.premium_amount, 100);
        assert_eq!(policy.coverage_amount, 500);
        assert_eq!(policy.status, PolicyStatus::Active);
        assert_eq!(policy.created_at, 42);
        assert_eq!(policy.updated_at, 42);
    }

    #[test]
    fn test_holder_summary_accumulates() {
        let mut ledger = ledger();
        ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();

        let summary = ledger.get_holder_summary(&HOLDER.into()).unwrap();
        assert_eq!(summary.policy_count, 1);
        assert_eq!(summary.total_premiums_paid, 100);

        ledger
            .create_policy(&ctx(HOLDER, 2), "crop-rainfall", 50, 500)
            .unwrap();
        let summary = ledger.get_holder_summary(&HOLDER.into()).unwrap();
        assert_eq!(summary.policy_count, 2);
        assert_eq!(summary.total_premiums_paid, 150);
    }

    #[test]
    fn test_summary_survives_cancellation() {
        let mut ledger = ledger();
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();
        ledger.cancel_policy(&ctx(HOLDER, 2), id).unwrap();

        let summary = ledger.get_holder_summary(&HOLDER.into()).unwrap();
        assert_eq!(summary.policy_count, 1);
        assert_eq!(summary.total_premiums_paid, 100);
    }

    #[test]
    fn test_create_policy_rejects_bad_amounts() {
        let mut ledger = ledger();
        let holder = ctx(HOLDER, 1);

        assert_eq!(
            ledger.create_policy(&holder, "crop", 0, 500),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.create_policy(&holder, "crop", 100, 0),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.create_policy(&holder, "crop", 100, MAX_COVERAGE + 1),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.create_policy(&holder, "", 100, 500),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(ledger.policy_count(), 0);
        assert!(ledger.get_holder_summary(&HOLDER.into()).is_none());

        assert!(ledger.create_policy(&holder, "crop", 1, MAX_COVERAGE).is_ok());
    }

    #[test]
    fn test_cancel_by_non_holder_is_unauthorized() {
        let mut ledger = ledger();
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();
        let before = ledger.get_policy(id).cloned();

        assert_eq!(
            ledger.cancel_policy(&ctx("SP-INTRUDER", 2), id),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(
            ledger.cancel_policy(&ctx(OWNER, 2), id),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(ledger.get_policy(id).cloned(), before);
    }

    #[test]
    fn test_cancel_twice_succeeds() {
        let mut ledger = ledger();
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();

        ledger.cancel_policy(&ctx(HOLDER, 2), id).unwrap();
        ledger.cancel_policy(&ctx(HOLDER, 3), id).unwrap();

        let policy = ledger.get_policy(id).unwrap();
        assert_eq!(policy.status, PolicyStatus::Cancelled);
        assert_eq!(policy.updated_at, 3);
    }

    #[test]
    fn test_cancel_missing_policy() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.cancel_policy(&ctx(HOLDER, 1), PolicyId(9)),
            Err(LedgerError::NotFound)
        );
    }

    #[test]
    fn test_cancel_after_payout_is_invalid_state() {
        let mut ledger = ledger();
        let admin = ctx(OWNER, 2);
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();
        ledger
            .update_policy_status(&admin, id, PolicyStatus::Triggered)
            .unwrap();
        ledger
            .update_policy_status(&admin, id, PolicyStatus::PaidOut)
            .unwrap();

        assert_eq!(
            ledger.cancel_policy(&ctx(HOLDER, 3), id),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(ledger.get_policy(id).unwrap().status, PolicyStatus::PaidOut);
    }

    #[test]
    fn test_second_payout_is_invalid_state() {
        let mut ledger = ledger();
        let admin = ctx(OWNER, 2);
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();
        ledger
            .update_policy_status(&admin, id, PolicyStatus::Triggered)
            .unwrap();
        assert_eq!(
            ledger.update_policy_status(&admin, id, PolicyStatus::Triggered),
            Err(LedgerError::InvalidState)
        );
        ledger
            .update_policy_status(&ctx(OWNER, 3), id, PolicyStatus::PaidOut)
            .unwrap();

        assert_eq!(
            ledger.update_policy_status(&ctx(OWNER, 4), id, PolicyStatus::PaidOut),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(ledger.get_policy(id).unwrap().updated_at, 3);
    }

    #[test]
    fn test_update_status_requires_owner() {
        let mut ledger = ledger();
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();

        assert_eq!(
            ledger.update_policy_status(&ctx(HOLDER, 2), id, PolicyStatus::Expired),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(
            ledger.update_policy_status(&ctx(OWNER, 2), PolicyId(5), PolicyStatus::Expired),
            Err(LedgerError::NotFound)
        );

        ledger
            .update_policy_status(&ctx(OWNER, 3), id, PolicyStatus::Suspended)
            .unwrap();
        let policy = ledger.get_policy(id).unwrap();
        assert_eq!(policy.status, PolicyStatus::Suspended);
        assert_eq!(policy.updated_at, 3);
    }

    #[test]
    fn test_update_status_rejects_illegal_transition() {
        let mut ledger = ledger();
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();
        ledger.cancel_policy(&ctx(HOLDER, 2), id).unwrap();

        assert_eq!(
            ledger.update_policy_status(&ctx(OWNER, 3), id, PolicyStatus::Active),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(ledger.get_policy(id).unwrap().updated_at, 2);
    }

    #[test]
    fn test_paused_ledger_rejects_mutations_but_serves_queries() {
        let mut ledger = ledger();
        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();

        ledger.set_active(&ctx(OWNER, 2), false).unwrap();
        assert!(!ledger.is_active());

        assert_eq!(
            ledger.create_policy(&ctx(HOLDER, 3), "crop-rainfall", 100, 500),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(
            ledger.cancel_policy(&ctx(HOLDER, 3), id),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(
            ledger.update_policy_status(&ctx(OWNER, 3), id, PolicyStatus::Expired),
            Err(LedgerError::InvalidState)
        );

        assert!(ledger.get_policy(id).is_some());
        assert!(ledger.get_holder_summary(&HOLDER.into()).is_some());
        assert_eq!(ledger.policy_count(), 1);

        ledger.unpause(&ctx(OWNER, 4)).unwrap();
        assert!(ledger
            .create_policy(&ctx(HOLDER, 5), "crop-rainfall", 100, 500)
            .is_ok());
    }

    #[test]
    fn test_only_owner_pauses() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.pause(&ctx(HOLDER, 1)),
            Err(LedgerError::Unauthorized)
        );
        assert!(ledger.is_active());
        assert_eq!(ledger.owner(), &Principal::new(OWNER));
        assert_eq!(ledger.version(), 1);
    }

    #[test]
    fn test_snapshot_restores_identical_ledger() {
        let mut ledger = ledger();
        ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();
        ledger
            .create_policy(&ctx("SP-OTHER", 2), "flight-delay", 20, 900)
            .unwrap();

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let restored = PolicyLedger::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.snapshot(), ledger.snapshot());
        assert_eq!(
            restored.state_digest().unwrap(),
            ledger.state_digest().unwrap()
        );
        assert_eq!(restored.policies().count(), 2);
    }

    #[test]
    fn test_audit_records_accepted_and_rejected_calls() {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut ledger =
            PolicyLedger::new(OWNER).with_audit(AuditLogger::silent().with_sink(sink.clone()));

        let id = ledger
            .create_policy(&ctx(HOLDER, 1), "crop-rainfall", 100, 500)
            .unwrap();
        let _ = ledger.cancel_policy(&ctx("SP-INTRUDER", 2), id);

        let events: Vec<AuditEvent> = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "create_policy");
        assert_eq!(events[0].resource.as_deref(), Some("policy/0"));
        assert!(events[1].is_rejected());
    }

    proptest! {
        #[test]
        fn prop_summary_matches_created_policies(premiums in proptest::collection::vec(1u64..1_000_000, 1..32)) {
            let mut ledger = ledger();
            for (height, premium) in premiums.iter().enumerate() {
                let before = ledger.policy_count();
                let id = ledger.create_policy(&ctx(HOLDER, height as u64), "crop", *premium, 1_000).unwrap();
                prop_assert_eq!(id, PolicyId(before));
                prop_assert_eq!(ledger.policy_count(), before + 1);
            }

            let summary = ledger.get_holder_summary(&HOLDER.into()).unwrap();
            prop_assert_eq!(summary.policy_count, premiums.len() as u64);
            prop_assert_eq!(
                summary.total_premiums_paid,
                premiums.iter().map(|p| u128::from(*p)).sum::<u128>()
            );
        }

        #[test]
        fn prop_failed_create_leaves_state_untouched(coverage in (MAX_COVERAGE + 1)..u64::MAX) {
            let mut ledger = ledger();
            let before = ledger.snapshot();
            prop_assert_eq!(
                ledger.create_policy(&ctx(HOLDER, 1), "crop", 10, coverage),
                Err(LedgerError::InvalidInput)
            );
            prop_assert_eq!(ledger.snapshot(), before);
        }
    }
}
