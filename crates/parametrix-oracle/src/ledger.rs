//! Oracle & Trigger Ledger state machine
//!
//! Owns oracle registrations, submitted data points, trigger conditions and
//! claim triggers. Each collection draws ids from its own counter.
//!
//! All checks of an entry point run before its first write: gate, argument
//! validation, entity lookups, state checks. A rejected call returns its
//! [`LedgerError`] code and leaves the ledger untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use parametrix_common::{
    Access, AuditCategory, AuditLogger, CallContext, LedgerError, LedgerGate, LedgerResult,
    PolicyId, Principal, StateDigest, MAX_REPUTATION,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::{DataId, DataPoint, DataType, DataValue, ValidationStatus};
use crate::oracle::{DataSource, Oracle, OracleId};
use crate::trigger::{
    ClaimTrigger, ComparisonOperator, ConditionId, ConditionType, DisputeReason, DisputeRecord,
    TriggerCondition, TriggerStatus,
};

/// Ledger shared between threads; the mutex is the single writer
pub type SharedOracleLedger = Arc<Mutex<OracleLedger>>;

/// Everything the Oracle & Trigger Ledger persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleLedgerState {
    pub gate: LedgerGate,
    pub next_oracle_id: u64,
    pub next_data_id: u64,
    pub next_condition_id: u64,
    pub oracles: BTreeMap<OracleId, Oracle>,
    pub data_points: BTreeMap<DataId, DataPoint>,
    pub conditions: BTreeMap<ConditionId, TriggerCondition>,
    /// At most one record per policy
    pub claim_triggers: BTreeMap<PolicyId, ClaimTrigger>,
}

impl OracleLedgerState {
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self {
            gate: LedgerGate::new(owner),
            next_oracle_id: 0,
            next_data_id: 0,
            next_condition_id: 0,
            oracles: BTreeMap::new(),
            data_points: BTreeMap::new(),
            conditions: BTreeMap::new(),
            claim_triggers: BTreeMap::new(),
        }
    }
}

/// Next value of a collection counter
fn bump(counter: u64) -> LedgerResult<u64> {
    counter.checked_add(1).ok_or(LedgerError::InvalidState)
}

/// Oracle & Trigger Ledger
#[derive(Debug)]
pub struct OracleLedger {
    state: OracleLedgerState,
    audit: AuditLogger,
}

impl OracleLedger {
    /// Empty ledger administered by `owner`
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self::from_snapshot(OracleLedgerState::new(owner))
    }

    /// Resume from a persisted snapshot
    pub fn from_snapshot(state: OracleLedgerState) -> Self {
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
    pub fn into_shared(self) -> SharedOracleLedger {
        Arc::new(Mutex::new(self))
    }

    // ============ ORACLE REGISTRY ============

    /// Register an oracle bound to `address`; returns its id
    pub fn register_oracle(
        &mut self,
        ctx: &CallContext,
        address: Principal,
        data_source: &str,
    ) -> LedgerResult<OracleId> {
        let result = self.try_register_oracle(ctx, address, data_source);
        self.audit.record(
            ctx,
            AuditCategory::OracleRegistry,
            "register_oracle",
            result.as_ref().ok().map(ToString::to_string),
            &result,
        );
        result
    }

    fn try_register_oracle(
        &mut self,
        ctx: &CallContext,
        address: Principal,
        data_source: &str,
    ) -> LedgerResult<OracleId> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        let data_source = DataSource::new(data_source)?;
        let next = bump(self.state.next_oracle_id)?;

        let id = OracleId(self.state.next_oracle_id);
        info!(oracle_id = id.0, address = %address, source = %data_source, "Oracle registered");

        self.state
            .oracles
            .insert(id, Oracle::register(id, address, data_source, ctx.height));
        self.state.next_oracle_id = next;
        Ok(id)
    }

    /// Stop an oracle from submitting; its history stays valid
    pub fn deactivate_oracle(&mut self, ctx: &CallContext, oracle_id: OracleId) -> LedgerResult<()> {
        let result = self.try_deactivate_oracle(ctx, oracle_id);
        self.audit.record(
            ctx,
            AuditCategory::OracleRegistry,
            "deactivate_oracle",
            Some(oracle_id.to_string()),
            &result,
        );
        result
    }

    fn try_deactivate_oracle(&mut self, ctx: &CallContext, oracle_id: OracleId) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        let oracle = self
            .state
            .oracles
            .get_mut(&oracle_id)
            .ok_or(LedgerError::NotFound)?;
        oracle.is_active = false;

        info!(oracle_id = oracle_id.0, "Oracle deactivated");
        Ok(())
    }

    /// Set an oracle's reputation (0..=1000)
    pub fn update_oracle_reputation(
        &mut self,
        ctx: &CallContext,
        oracle_id: OracleId,
        score: u16,
    ) -> LedgerResult<()> {
        let result = self.try_update_oracle_reputation(ctx, oracle_id, score);
        self.audit.record(
            ctx,
            AuditCategory::OracleRegistry,
            "update_oracle_reputation",
            Some(oracle_id.to_string()),
            &result,
        );
        result
    }

    fn try_update_oracle_reputation(
        &mut self,
        ctx: &CallContext,
        oracle_id: OracleId,
        score: u16,
    ) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        if score > MAX_REPUTATION {
            return Err(LedgerError::InvalidInput);
        }
        let oracle = self
            .state
            .oracles
            .get_mut(&oracle_id)
            .ok_or(LedgerError::NotFound)?;

        debug!(oracle_id = oracle_id.0, from = oracle.reputation_score, to = score, "Reputation updated");
        oracle.reputation_score = score;
        Ok(())
    }

    // ============ OBSERVATIONS ============

    /// Submit an observation through an oracle bound to the caller
    pub fn submit_data(
        &mut self,
        ctx: &CallContext,
        oracle_id: OracleId,
        data_type: &str,
        value: &str,
    ) -> LedgerResult<DataId> {
        let result = self.try_submit_data(ctx, oracle_id, data_type, value);
        self.audit.record(
            ctx,
            AuditCategory::Observation,
            "submit_data",
            Some(match &result {
                Ok(id) => id.to_string(),
                Err(_) => oracle_id.to_string(),
            }),
            &result,
        );
        result
    }

    fn try_submit_data(
        &mut self,
        ctx: &CallContext,
        oracle_id: OracleId,
        data_type: &str,
        value: &str,
    ) -> LedgerResult<DataId> {
        self.state.gate.admit(ctx, Access::Public)?;
        let data_type: DataType = data_type.parse()?;
        let value = DataValue::new(value)?;
        let next = bump(self.state.next_data_id)?;

        let oracle = self
            .state
            .oracles
            .get_mut(&oracle_id)
            .ok_or(LedgerError::NotFound)?;
        if !oracle.is_active {
            return Err(LedgerError::InvalidState);
        }
        if !oracle.is_bound_to(&ctx.caller) {
            warn!(oracle_id = oracle_id.0, caller = %ctx.caller, "Submission from unbound caller");
            return Err(LedgerError::Unauthorized);
        }
        oracle.total_submissions += 1;

        let id = DataId(self.state.next_data_id);
        self.state.data_points.insert(
            id,
            DataPoint {
                id,
                oracle_id,
                data_type,
                value,
                timestamp: ctx.height,
                validation_status: ValidationStatus::Pending,
                verified_by: None,
            },
        );
        self.state.next_data_id = next;

        debug!(data_id = id.0, oracle_id = oracle_id.0, data_type = %data_type, "Data submitted");
        Ok(id)
    }

    /// Issue the single validation verdict for a pending data point
    pub fn validate_data(&mut self, ctx: &CallContext, data_id: DataId, is_valid: bool) -> LedgerResult<()> {
        let result = self.try_validate_data(ctx, data_id, is_valid);
        self.audit.record(
            ctx,
            AuditCategory::Observation,
            "validate_data",
            Some(data_id.to_string()),
            &result,
        );
        result
    }

    fn try_validate_data(&mut self, ctx: &CallContext, data_id: DataId, is_valid: bool) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        let point = self
            .state
            .data_points
            .get_mut(&data_id)
            .ok_or(LedgerError::NotFound)?;
        if point.validation_status != ValidationStatus::Pending {
            return Err(LedgerError::InvalidState);
        }

        point.validation_status = ValidationStatus::from_verdict(is_valid);
        point.verified_by = Some(ctx.caller.clone());

        info!(data_id = data_id.0, valid = is_valid, "Data point validated");
        Ok(())
    }

    // ============ TRIGGER CONDITIONS ============

    /// Define a payout rule; returns its id
    pub fn create_trigger_condition(
        &mut self,
        ctx: &CallContext,
        condition_type: &str,
        threshold_value: u64,
        comparison_operator: &str,
    ) -> LedgerResult<ConditionId> {
        let result =
            self.try_create_trigger_condition(ctx, condition_type, threshold_value, comparison_operator);
        self.audit.record(
            ctx,
            AuditCategory::TriggerLifecycle,
            "create_trigger_condition",
            result.as_ref().ok().map(ToString::to_string),
            &result,
        );
        result
    }

    fn try_create_trigger_condition(
        &mut self,
        ctx: &CallContext,
        condition_type: &str,
        threshold_value: u64,
        comparison_operator: &str,
    ) -> LedgerResult<ConditionId> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        let condition_type = ConditionType::new(condition_type)?;
        let comparison_operator: ComparisonOperator = comparison_operator.parse()?;
        let next = bump(self.state.next_condition_id)?;

        let id = ConditionId(self.state.next_condition_id);
        info!(
            condition_id = id.0,
            condition_type = %condition_type,
            operator = %comparison_operator,
            threshold = threshold_value,
            "Trigger condition created"
        );

        self.state.conditions.insert(
            id,
            TriggerCondition {
                id,
                condition_type,
                threshold_value,
                comparison_operator,
                is_active: true,
                created_by: ctx.caller.clone(),
                created_at: ctx.height,
            },
        );
        self.state.next_condition_id = next;
        Ok(id)
    }

    /// Retire a payout rule
    pub fn deactivate_trigger_condition(
        &mut self,
        ctx: &CallContext,
        condition_id: ConditionId,
    ) -> LedgerResult<()> {
        let result = self.try_deactivate_trigger_condition(ctx, condition_id);
        self.audit.record(
            ctx,
            AuditCategory::TriggerLifecycle,
            "deactivate_trigger_condition",
            Some(condition_id.to_string()),
            &result,
        );
        result
    }

    fn try_deactivate_trigger_condition(
        &mut self,
        ctx: &CallContext,
        condition_id: ConditionId,
    ) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        let condition = self
            .state
            .conditions
            .get_mut(&condition_id)
            .ok_or(LedgerError::NotFound)?;
        condition.is_active = false;
        Ok(())
    }

    // ============ CLAIM TRIGGERS ============

    /// Record that `data_id` satisfied `condition_id` for `policy_id`
    ///
    /// The ledger does not compare the data value with the condition. The
    /// caller has evaluated the rule off-ledger and vouches for the result.
    pub fn process_trigger(
        &mut self,
        ctx: &CallContext,
        policy_id: PolicyId,
        data_id: DataId,
        condition_id: ConditionId,
    ) -> LedgerResult<()> {
        let result = self.try_process_trigger(ctx, policy_id, data_id, condition_id);
        self.audit.record(
            ctx,
            AuditCategory::TriggerLifecycle,
            "process_trigger",
            Some(policy_id.to_string()),
            &result,
        );
        result
    }

    fn try_process_trigger(
        &mut self,
        ctx: &CallContext,
        policy_id: PolicyId,
        data_id: DataId,
        condition_id: ConditionId,
    ) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        if !self.state.data_points.contains_key(&data_id)
            || !self.state.conditions.contains_key(&condition_id)
        {
            return Err(LedgerError::NotFound);
        }
        if let Some(existing) = self.state.claim_triggers.get(&policy_id) {
            if !existing.trigger_status.can_retrigger() {
                return Err(LedgerError::InvalidState);
            }
        }

        self.state.claim_triggers.insert(
            policy_id,
            ClaimTrigger {
                policy_id,
                trigger_data_id: data_id,
                trigger_condition_id: condition_id,
                triggered_at: ctx.height,
                trigger_status: TriggerStatus::Triggered,
                processed_by: ctx.caller.clone(),
                dispute: None,
                resolved_by: None,
                resolved_at: None,
            },
        );

        info!(
            policy_id = policy_id.0,
            data_id = data_id.0,
            condition_id = condition_id.0,
            "Claim triggered"
        );
        Ok(())
    }

    /// Contest a standing trigger; anyone may dispute
    pub fn dispute_trigger(&mut self, ctx: &CallContext, policy_id: PolicyId, reason: &str) -> LedgerResult<()> {
        let result = self.try_dispute_trigger(ctx, policy_id, reason);
        self.audit.record(
            ctx,
            AuditCategory::TriggerLifecycle,
            "dispute_trigger",
            Some(policy_id.to_string()),
            &result,
        );
        result
    }

    fn try_dispute_trigger(&mut self, ctx: &CallContext, policy_id: PolicyId, reason: &str) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Public)?;
        let reason = DisputeReason::new(reason)?;
        let trigger = self
            .state
            .claim_triggers
            .get_mut(&policy_id)
            .ok_or(LedgerError::NotFound)?;
        if !trigger.trigger_status.can_dispute() {
            return Err(LedgerError::InvalidState);
        }

        warn!(policy_id = policy_id.0, disputed_by = %ctx.caller, reason = %reason, "Claim trigger disputed");

        trigger.trigger_status = TriggerStatus::Disputed;
        trigger.dispute = Some(DisputeRecord {
            disputed_by: ctx.caller.clone(),
            reason,
            disputed_at: ctx.height,
        });
        Ok(())
    }

    /// Close a dispute: `uphold` keeps the trigger, otherwise it is overturned
    pub fn resolve_dispute(&mut self, ctx: &CallContext, policy_id: PolicyId, uphold: bool) -> LedgerResult<()> {
        let result = self.try_resolve_dispute(ctx, policy_id, uphold);
        self.audit.record(
            ctx,
            AuditCategory::TriggerLifecycle,
            "resolve_dispute",
            Some(policy_id.to_string()),
            &result,
        );
        result
    }

    fn try_resolve_dispute(&mut self, ctx: &CallContext, policy_id: PolicyId, uphold: bool) -> LedgerResult<()> {
        self.state.gate.admit(ctx, Access::Administrator)?;
        let trigger = self
            .state
            .claim_triggers
            .get_mut(&policy_id)
            .ok_or(LedgerError::NotFound)?;
        if trigger.trigger_status != TriggerStatus::Disputed {
            return Err(LedgerError::InvalidState);
        }

        trigger.trigger_status = if uphold {
            TriggerStatus::Upheld
        } else {
            TriggerStatus::Overturned
        };
        trigger.resolved_by = Some(ctx.caller.clone());
        trigger.resolved_at = Some(ctx.height);

        info!(policy_id = policy_id.0, status = %trigger.trigger_status, "Dispute resolved");
        Ok(())
    }

    // ============ ADMINISTRATION ============

    /// Owner-only pause switch; callable while paused
    pub fn set_active(&mut self, ctx: &CallContext, active: bool) -> LedgerResult<()> {
        let result = self.state.gate.set_active(ctx, active);
        self.audit.record(
            ctx,
            AuditCategory::Administration,
            if active { "unpause" } else { "pause" },
            Some("oracle-ledger".to_string()),
            &result,
        );
        if result.is_ok() {
            info!(active, "Oracle ledger gate changed");
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

    pub fn get_oracle(&self, oracle_id: OracleId) -> Option<&Oracle> {
        self.state.oracles.get(&oracle_id)
    }

    pub fn get_data_point(&self, data_id: DataId) -> Option<&DataPoint> {
        self.state.data_points.get(&data_id)
    }

    pub fn get_trigger_condition(&self, condition_id: ConditionId) -> Option<&TriggerCondition> {
        self.state.conditions.get(&condition_id)
    }

    pub fn get_claim_trigger(&self, policy_id: PolicyId) -> Option<&ClaimTrigger> {
        self.state.claim_triggers.get(&policy_id)
    }

    pub fn oracle_count(&self) -> u64 {
        self.state.next_oracle_id
    }

    pub fn data_point_count(&self) -> u64 {
        self.state.next_data_id
    }

    pub fn condition_count(&self) -> u64 {
        self.state.next_condition_id
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
    pub fn snapshot(&self) -> OracleLedgerState {
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
    use parametrix_common::MemoryAuditSink;
    use proptest::prelude::*;

    const OWNER: &str = "SP-ADMIN";
    const ORACLE_A: &str = "SP-ORACLE-A";
    const ORACLE_B: &str = "SP-ORACLE-B";

    fn ctx(caller: &str, height: u64) -> CallContext {
        CallContext::new(caller, height)
    }

    fn admin() -> CallContext {
        ctx(OWNER, 1)
    }

    fn ledger() -> OracleLedger {
        OracleLedger::new(OWNER).with_audit(AuditLogger::silent())
    }

    /// Ledger with oracle 0 bound to ORACLE_A
    fn ledger_with_oracle() -> (OracleLedger, OracleId) {
        let mut ledger = ledger();
        let id = ledger
            .register_oracle(&admin(), ORACLE_A.into(), "noaa-gsod")
            .unwrap();
        (ledger, id)
    }

    #[test]
    fn test_register_oracle_round_trip() {
        let mut ledger = ledger();
        let id = ledger
            .register_oracle(&ctx(OWNER, 5), ORACLE_A.into(), "noaa-gsod")
            .unwrap();
        assert_eq!(id, OracleId(0));

        let oracle = ledger.get_oracle(id).unwrap();
        assert_eq!(oracle.address, Principal::new(ORACLE_A));
        assert_eq!(oracle.data_source.as_str(), "noaa-gsod");
        assert_eq!(oracle.reputation_score, 100);
        assert_eq!(oracle.total_submissions, 0);
        assert!(oracle.is_active);
        assert_eq!(oracle.registered_at, 5);
        assert_eq!(ledger.oracle_count(), 1);
    }

    #[test]
    fn test_register_oracle_requires_owner() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.register_oracle(&ctx(ORACLE_A, 1), ORACLE_A.into(), "self-service"),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(ledger.oracle_count(), 0);
    }

    #[test]
    fn test_submit_and_impersonation_scenario() {
        let (mut ledger, oracle) = ledger_with_oracle();

        let data = ledger
            .submit_data(&ctx(ORACLE_A, 2), oracle, "weather", "72")
            .unwrap();
        assert_eq!(data, DataId(0));
        assert_eq!(ledger.get_oracle(oracle).unwrap().total_submissions, 1);

        assert_eq!(
            ledger.submit_data(&ctx(ORACLE_B, 3), oracle, "weather", "10"),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(ledger.get_oracle(oracle).unwrap().total_submissions, 1);
        assert_eq!(ledger.data_point_count(), 1);
    }

    #[test]
    fn test_submit_data_round_trip() {
        let (mut ledger, oracle) = ledger_with_oracle();
        let id = ledger
            .submit_data(&ctx(ORACLE_A, 9), oracle, "rainfall", "41.5")
            .unwrap();

        let point = ledger.get_data_point(id).unwrap();
        assert_eq!(point.oracle_id, oracle);
        assert_eq!(point.data_type, DataType::Rainfall);
        assert_eq!(point.value.as_str(), "41.5");
        assert_eq!(point.timestamp, 9);
        assert_eq!(point.validation_status, ValidationStatus::Pending);
        assert!(point.verified_by.is_none());
    }

    #[test]
    fn test_submit_data_failure_codes_leave_counters() {
        let (mut ledger, oracle) = ledger_with_oracle();
        let before = ledger.snapshot();

        assert_eq!(
            ledger.submit_data(&ctx(ORACLE_A, 2), oracle, "tsunami", "1"),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.submit_data(&ctx(ORACLE_A, 2), oracle, "weather", ""),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.submit_data(&ctx(ORACLE_A, 2), OracleId(7), "weather", "1"),
            Err(LedgerError::NotFound)
        );
        assert_eq!(ledger.snapshot(), before);

        ledger.deactivate_oracle(&admin(), oracle).unwrap();
        let before = ledger.snapshot();
        assert_eq!(
            ledger.submit_data(&ctx(ORACLE_A, 3), oracle, "weather", "1"),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_deactivate_oracle_is_idempotent() {
        let (mut ledger, oracle) = ledger_with_oracle();
        let data = ledger
            .submit_data(&ctx(ORACLE_A, 2), oracle, "weather", "72")
            .unwrap();

        ledger.deactivate_oracle(&admin(), oracle).unwrap();
        assert!(!ledger.get_oracle(oracle).unwrap().is_active);
        ledger.deactivate_oracle(&admin(), oracle).unwrap();
        assert!(!ledger.get_oracle(oracle).unwrap().is_active);

        // history stays
        assert!(ledger.get_data_point(data).is_some());
        assert_eq!(
            ledger.deactivate_oracle(&admin(), OracleId(3)),
            Err(LedgerError::NotFound)
        );
    }

    #[test]
    fn test_validate_data_single_shot() {
        let (mut ledger, oracle) = ledger_with_oracle();
        let data = ledger
            .submit_data(&ctx(ORACLE_A, 2), oracle, "weather", "72")
            .unwrap();

        assert_eq!(
            ledger.validate_data(&ctx(ORACLE_A, 3), data, true),
            Err(LedgerError::Unauthorized)
        );
        ledger.validate_data(&ctx(OWNER, 3), data, true).unwrap();

        let point = ledger.get_data_point(data).unwrap();
        assert_eq!(point.validation_status, ValidationStatus::Validated);
        assert_eq!(point.verified_by, Some(Principal::new(OWNER)));

        assert_eq!(
            ledger.validate_data(&ctx(OWNER, 4), data, false),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(
            ledger.get_data_point(data).unwrap().validation_status,
            ValidationStatus::Validated
        );
        assert_eq!(
            ledger.validate_data(&ctx(OWNER, 4), DataId(99), false),
            Err(LedgerError::NotFound)
        );
    }

    #[test]
    fn test_condition_and_data_counters_are_independent() {
        let (mut ledger, oracle) = ledger_with_oracle();
        ledger
            .submit_data(&ctx(ORACLE_A, 2), oracle, "weather", "72")
            .unwrap();
        ledger
            .submit_data(&ctx(ORACLE_A, 3), oracle, "weather", "73")
            .unwrap();

        let condition = ledger
            .create_trigger_condition(&admin(), "temperature-above", 90, ">")
            .unwrap();
        assert_eq!(condition, ConditionId(0));
        assert_eq!(ledger.condition_count(), 1);
        assert_eq!(ledger.data_point_count(), 2);

        let next = ledger
            .submit_data(&ctx(ORACLE_A, 4), oracle, "weather", "74")
            .unwrap();
        assert_eq!(next, DataId(2));
    }

    #[test]
    fn test_create_trigger_condition() {
        let mut ledger = ledger();
        let id = ledger
            .create_trigger_condition(&ctx(OWNER, 4), "rainfall-below", 50, "<")
            .unwrap();

        let condition = ledger.get_trigger_condition(id).unwrap();
        assert_eq!(condition.condition_type.as_str(), "rainfall-below");
        assert_eq!(condition.threshold_value, 50);
        assert_eq!(condition.comparison_operator, ComparisonOperator::LessThan);
        assert!(condition.is_active);
        assert_eq!(condition.created_by, Principal::new(OWNER));
        assert_eq!(condition.created_at, 4);

        assert_eq!(
            ledger.create_trigger_condition(&admin(), "rainfall-below", 50, "≤"),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.create_trigger_condition(&ctx(ORACLE_A, 1), "rainfall-below", 50, "<"),
            Err(LedgerError::Unauthorized)
        );

        ledger.deactivate_trigger_condition(&admin(), id).unwrap();
        assert!(!ledger.get_trigger_condition(id).unwrap().is_active);
        assert_eq!(
            ledger.deactivate_trigger_condition(&admin(), ConditionId(8)),
            Err(LedgerError::NotFound)
        );
    }

    /// Ledger with one validated data point and one condition
    fn ledger_ready_to_trigger() -> (OracleLedger, DataId, ConditionId) {
        let (mut ledger, oracle) = ledger_with_oracle();
        let data = ledger
            .submit_data(&ctx(ORACLE_A, 2), oracle, "rainfall", "12")
            .unwrap();
        ledger.validate_data(&admin(), data, true).unwrap();
        let condition = ledger
            .create_trigger_condition(&admin(), "rainfall-below", 50, "<")
            .unwrap();
        (ledger, data, condition)
    }

    #[test]
    fn test_process_trigger_missing_references() {
        let (mut ledger, data, condition) = ledger_ready_to_trigger();

        assert_eq!(
            ledger.process_trigger(&admin(), PolicyId(0), DataId(42), condition),
            Err(LedgerError::NotFound)
        );
        assert_eq!(
            ledger.process_trigger(&admin(), PolicyId(0), data, ConditionId(42)),
            Err(LedgerError::NotFound)
        );
        assert!(ledger.get_claim_trigger(PolicyId(0)).is_none());
    }

    #[test]
    fn test_process_trigger_records_claim() {
        let (mut ledger, data, condition) = ledger_ready_to_trigger();

        assert_eq!(
            ledger.process_trigger(&ctx(ORACLE_A, 5), PolicyId(3), data, condition),
            Err(LedgerError::Unauthorized)
        );
        ledger
            .process_trigger(&ctx(OWNER, 5), PolicyId(3), data, condition)
            .unwrap();

        let trigger = ledger.get_claim_trigger(PolicyId(3)).unwrap();
        assert_eq!(trigger.trigger_data_id, data);
        assert_eq!(trigger.trigger_condition_id, condition);
        assert_eq!(trigger.triggered_at, 5);
        assert_eq!(trigger.trigger_status, TriggerStatus::Triggered);
        assert_eq!(trigger.processed_by, Principal::new(OWNER));
    }

    #[test]
    fn test_process_trigger_does_not_evaluate_condition() {
        let (mut ledger, oracle) = ledger_with_oracle();
        // 90 is not below 50, the ledger records it anyway
        let data = ledger
            .submit_data(&ctx(ORACLE_A, 2), oracle, "rainfall", "90")
            .unwrap();
        let condition = ledger
            .create_trigger_condition(&admin(), "rainfall-below", 50, "<")
            .unwrap();

        ledger
            .process_trigger(&admin(), PolicyId(0), data, condition)
            .unwrap();
        assert!(ledger.get_claim_trigger(PolicyId(0)).is_some());
    }

    #[test]
    fn test_retrigger_overwrites() {
        let (mut ledger, data, condition) = ledger_ready_to_trigger();
        ledger
            .process_trigger(&ctx(OWNER, 5), PolicyId(0), data, condition)
            .unwrap();
        ledger
            .process_trigger(&ctx(OWNER, 6), PolicyId(0), data, condition)
            .unwrap();
        assert_eq!(ledger.get_claim_trigger(PolicyId(0)).unwrap().triggered_at, 6);
    }

    #[test]
    fn test_dispute_and_resolution_flow() {
        let (mut ledger, data, condition) = ledger_ready_to_trigger();

        assert_eq!(
            ledger.dispute_trigger(&ctx("SP-ANYONE", 5), PolicyId(0), "gauge fault"),
            Err(LedgerError::NotFound)
        );

        ledger
            .process_trigger(&admin(), PolicyId(0), data, condition)
            .unwrap();
        ledger
            .dispute_trigger(&ctx("SP-ANYONE", 6), PolicyId(0), "gauge fault")
            .unwrap();

        let trigger = ledger.get_claim_trigger(PolicyId(0)).unwrap();
        assert_eq!(trigger.trigger_status, TriggerStatus::Disputed);
        let dispute = trigger.dispute.as_ref().unwrap();
        assert_eq!(dispute.disputed_by, Principal::new("SP-ANYONE"));
        assert_eq!(dispute.reason.as_str(), "gauge fault");
        assert_eq!(dispute.disputed_at, 6);

        // no second dispute, no overwrite while disputed
        assert_eq!(
            ledger.dispute_trigger(&ctx("SP-ANYONE", 7), PolicyId(0), "again"),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(
            ledger.process_trigger(&admin(), PolicyId(0), data, condition),
            Err(LedgerError::InvalidState)
        );

        assert_eq!(
            ledger.resolve_dispute(&ctx("SP-ANYONE", 8), PolicyId(0), true),
            Err(LedgerError::Unauthorized)
        );
        ledger
            .resolve_dispute(&ctx(OWNER, 8), PolicyId(0), false)
            .unwrap();

        let trigger = ledger.get_claim_trigger(PolicyId(0)).unwrap();
        assert_eq!(trigger.trigger_status, TriggerStatus::Overturned);
        assert_eq!(trigger.resolved_by, Some(Principal::new(OWNER)));
        assert_eq!(trigger.resolved_at, Some(8));

        assert_eq!(
            ledger.resolve_dispute(&ctx(OWNER, 9), PolicyId(0), true),
            Err(LedgerError::InvalidState)
        );

        // overturned claims can be re-triggered with fresh evidence
        ledger
            .process_trigger(&ctx(OWNER, 10), PolicyId(0), data, condition)
            .unwrap();
        let trigger = ledger.get_claim_trigger(PolicyId(0)).unwrap();
        assert_eq!(trigger.trigger_status, TriggerStatus::Triggered);
        assert!(trigger.dispute.is_none());
    }

    #[test]
    fn test_dispute_reason_is_bounded() {
        let (mut ledger, data, condition) = ledger_ready_to_trigger();
        ledger
            .process_trigger(&admin(), PolicyId(0), data, condition)
            .unwrap();

        let long = "x".repeat(257);
        assert_eq!(
            ledger.dispute_trigger(&ctx("SP-ANYONE", 5), PolicyId(0), &long),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.get_claim_trigger(PolicyId(0)).unwrap().trigger_status,
            TriggerStatus::Triggered
        );
    }

    #[test]
    fn test_update_oracle_reputation() {
        let (mut ledger, oracle) = ledger_with_oracle();

        ledger
            .update_oracle_reputation(&admin(), oracle, 1000)
            .unwrap();
        assert_eq!(ledger.get_oracle(oracle).unwrap().reputation_score, 1000);

        assert_eq!(
            ledger.update_oracle_reputation(&admin(), oracle, 1001),
            Err(LedgerError::InvalidInput)
        );
        assert_eq!(
            ledger.update_oracle_reputation(&admin(), OracleId(4), 10),
            Err(LedgerError::NotFound)
        );
        assert_eq!(
            ledger.update_oracle_reputation(&ctx(ORACLE_A, 2), oracle, 10),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(ledger.get_oracle(oracle).unwrap().reputation_score, 1000);
    }

    #[test]
    fn test_paused_ledger() {
        let (mut ledger, oracle) = ledger_with_oracle();
        ledger.pause(&admin()).unwrap();

        assert_eq!(
            ledger.submit_data(&ctx(ORACLE_A, 2), oracle, "weather", "72"),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(
            ledger.register_oracle(&admin(), ORACLE_B.into(), "flightaware"),
            Err(LedgerError::InvalidState)
        );
        assert_eq!(
            ledger.dispute_trigger(&ctx("SP-ANYONE", 2), PolicyId(0), "paused"),
            Err(LedgerError::InvalidState)
        );
        assert!(ledger.get_oracle(oracle).is_some());
        assert!(!ledger.is_active());

        assert_eq!(ledger.unpause(&ctx(ORACLE_A, 3)), Err(LedgerError::Unauthorized));
        ledger.unpause(&admin()).unwrap();
        assert!(ledger
            .submit_data(&ctx(ORACLE_A, 4), oracle, "weather", "72")
            .is_ok());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut ledger, data, condition) = ledger_ready_to_trigger();
        ledger
            .process_trigger(&admin(), PolicyId(2), data, condition)
            .unwrap();
        ledger
            .dispute_trigger(&ctx("SP-ANYONE", 3), PolicyId(2), "sensor offline")
            .unwrap();

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let restored = OracleLedger::from_snapshot(serde_json::from_str(&json).unwrap())
            .with_audit(AuditLogger::silent());

        assert_eq!(restored.snapshot(), ledger.snapshot());
        assert_eq!(restored.state_digest().unwrap(), ledger.state_digest().unwrap());
        assert_eq!(restored.version(), 1);
        assert_eq!(restored.owner(), &Principal::new(OWNER));
    }

    #[test]
    fn test_audit_trail() {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut ledger =
            OracleLedger::new(OWNER).with_audit(AuditLogger::silent().with_sink(sink.clone()));

        let oracle = ledger
            .register_oracle(&admin(), ORACLE_A.into(), "noaa-gsod")
            .unwrap();
        let _ = ledger.submit_data(&ctx(ORACLE_B, 2), oracle, "weather", "1");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].resource.as_deref(), Some("oracle/0"));
        assert_eq!(events[1].action, "submit_data");
        assert!(events[1].is_rejected());
    }

    proptest! {
        #[test]
        fn prop_submit_succeeds_iff_bound_active_oracle(
            registered in any::<bool>(),
            active in any::<bool>(),
            bound in any::<bool>(),
        ) {
            let mut ledger = ledger();
            let oracle = if registered {
                let id = ledger.register_oracle(&admin(), ORACLE_A.into(), "noaa").unwrap();
                if !active {
                    ledger.deactivate_oracle(&admin(), id).unwrap();
                }
                id
            } else {
                OracleId(0)
            };
            let caller = if bound { ORACLE_A } else { ORACLE_B };
            let before = ledger.snapshot();

            let result = ledger.submit_data(&ctx(caller, 9), oracle, "custom", "v");
            let expected = if !registered {
                Err(LedgerError::NotFound)
            } else if !active {
                Err(LedgerError::InvalidState)
            } else if !bound {
                Err(LedgerError::Unauthorized)
            } else {
                Ok(DataId(0))
            };
            let failed = result.is_err();
            prop_assert_eq!(result, expected);
            if failed {
                prop_assert_eq!(ledger.snapshot(), before);
            } else {
                prop_assert_eq!(ledger.get_oracle(oracle).unwrap().total_submissions, 1);
            }
        }
    }
}
