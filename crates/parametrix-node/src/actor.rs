//! Ledger actor
//!
//! One task owns both ledgers and applies [`Command`]s in arrival order.
//! Callers hold a cloneable [`LedgerHandle`] and await the reply. Every
//! mutating call is stamped with the next height from the [`HeightClock`];
//! queries do not consume heights.

use std::sync::Arc;

use parametrix_common::{
    CallContext, LedgerResult, ParametrixError, PolicyId, Principal, Result, StateDigest,
};
use parametrix_oracle::{
    ClaimTrigger, ConditionId, DataId, DataPoint, Oracle, OracleId, OracleLedger, TriggerCondition,
};
use parametrix_policy::{HolderSummary, Policy, PolicyLedger, PolicyStatus};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::clock::HeightClock;
use crate::metrics::LedgerMetrics;
use crate::snapshot::NodeSnapshot;

type Reply<T> = oneshot::Sender<LedgerResult<T>>;

/// Requests understood by the ledger actor
#[derive(Debug)]
pub enum Command {
    // Policy Ledger
    CreatePolicy {
        caller: Principal,
        policy_type: String,
        premium_amount: u64,
        coverage_amount: u64,
        reply: Reply<PolicyId>,
    },
    UpdatePolicyStatus {
        caller: Principal,
        policy_id: PolicyId,
        status: PolicyStatus,
        reply: Reply<()>,
    },
    CancelPolicy {
        caller: Principal,
        policy_id: PolicyId,
        reply: Reply<()>,
    },
    SetPolicyLedgerActive {
        caller: Principal,
        active: bool,
        reply: Reply<()>,
    },

    // Oracle & Trigger Ledger
    RegisterOracle {
        caller: Principal,
        address: Principal,
        data_source: String,
        reply: Reply<OracleId>,
    },
    DeactivateOracle {
        caller: Principal,
        oracle_id: OracleId,
        reply: Reply<()>,
    },
    UpdateOracleReputation {
        caller: Principal,
        oracle_id: OracleId,
        score: u16,
        reply: Reply<()>,
    },
    SubmitData {
        caller: Principal,
        oracle_id: OracleId,
        data_type: String,
        value: String,
        reply: Reply<DataId>,
    },
    ValidateData {
        caller: Principal,
        data_id: DataId,
        is_valid: bool,
        reply: Reply<()>,
    },
    CreateTriggerCondition {
        caller: Principal,
        condition_type: String,
        threshold_value: u64,
        comparison_operator: String,
        reply: Reply<ConditionId>,
    },
    DeactivateTriggerCondition {
        caller: Principal,
        condition_id: ConditionId,
        reply: Reply<()>,
    },
    ProcessTrigger {
        caller: Principal,
        policy_id: PolicyId,
        data_id: DataId,
        condition_id: ConditionId,
        reply: Reply<()>,
    },
    DisputeTrigger {
        caller: Principal,
        policy_id: PolicyId,
        reason: String,
        reply: Reply<()>,
    },
    ResolveDispute {
        caller: Principal,
        policy_id: PolicyId,
        uphold: bool,
        reply: Reply<()>,
    },
    SetOracleLedgerActive {
        caller: Principal,
        active: bool,
        reply: Reply<()>,
    },

    // Queries
    GetPolicy {
        policy_id: PolicyId,
        reply: oneshot::Sender<Option<Policy>>,
    },
    GetHolderSummary {
        holder: Principal,
        reply: oneshot::Sender<Option<HolderSummary>>,
    },
    GetOracle {
        oracle_id: OracleId,
        reply: oneshot::Sender<Option<Oracle>>,
    },
    GetDataPoint {
        data_id: DataId,
        reply: oneshot::Sender<Option<DataPoint>>,
    },
    GetTriggerCondition {
        condition_id: ConditionId,
        reply: oneshot::Sender<Option<TriggerCondition>>,
    },
    GetClaimTrigger {
        policy_id: PolicyId,
        reply: oneshot::Sender<Option<ClaimTrigger>>,
    },
    Snapshot {
        reply: oneshot::Sender<NodeSnapshot>,
    },
}

/// Owner of both ledgers
pub struct LedgerActor {
    policies: PolicyLedger,
    oracles: OracleLedger,
    clock: Arc<HeightClock>,
    metrics: Option<LedgerMetrics>,
}

impl LedgerActor {
    pub fn new(policies: PolicyLedger, oracles: OracleLedger, clock: Arc<HeightClock>) -> Self {
        Self {
            policies,
            oracles,
            clock,
            metrics: None,
        }
    }

    /// Rebuild both ledgers and the clock from a snapshot
    pub fn from_snapshot(snapshot: NodeSnapshot) -> Self {
        Self::new(
            PolicyLedger::from_snapshot(snapshot.policy),
            OracleLedger::from_snapshot(snapshot.oracle),
            Arc::new(HeightClock::starting_at(snapshot.height)),
        )
    }

    pub fn with_metrics(mut self, metrics: LedgerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start the actor task; it exits once every handle is dropped
    pub fn spawn(self, capacity: usize) -> (LedgerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(self.run(rx));
        (LedgerHandle { commands: tx }, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(height = self.clock.peek(), "Ledger actor started");
        while let Some(command) = commands.recv().await {
            self.apply(command);
        }
        info!(height = self.clock.peek(), "Ledger actor stopped");
    }

    fn context(&self, caller: Principal) -> CallContext {
        let ctx = CallContext::new(caller, self.clock.tick());
        if let Some(metrics) = &self.metrics {
            metrics.height.set(i64::try_from(self.clock.peek()).unwrap_or(i64::MAX));
        }
        ctx
    }

    fn observe<T>(&self, ledger: &str, operation: &str, result: &LedgerResult<T>) {
        if let Some(metrics) = &self.metrics {
            metrics.observe(ledger, operation, result);
        }
    }

    /// Apply one command; a dropped reply receiver is ignored
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::CreatePolicy {
                caller,
                policy_type,
                premium_amount,
                coverage_amount,
                reply,
            } => {
                let ctx = self.context(caller);
                let result =
                    self.policies
                        .create_policy(&ctx, &policy_type, premium_amount, coverage_amount);
                self.observe("policy", "create_policy", &result);
                let _ = reply.send(result);
            }
            Command::UpdatePolicyStatus {
                caller,
                policy_id,
                status,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.policies.update_policy_status(&ctx, policy_id, status);
                self.observe("policy", "update_policy_status", &result);
                let _ = reply.send(result);
            }
            Command::CancelPolicy {
                caller,
                policy_id,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.policies.cancel_policy(&ctx, policy_id);
                self.observe("policy", "cancel_policy", &result);
                let _ = reply.send(result);
            }
            Command::SetPolicyLedgerActive {
                caller,
                active,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.policies.set_active(&ctx, active);
                self.observe("policy", "set_active", &result);
                let _ = reply.send(result);
            }
            Command::RegisterOracle {
                caller,
                address,
                data_source,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.register_oracle(&ctx, address, &data_source);
                self.observe("oracle", "register_oracle", &result);
                let _ = reply.send(result);
            }
            Command::DeactivateOracle {
                caller,
                oracle_id,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.deactivate_oracle(&ctx, oracle_id);
                self.observe("oracle", "deactivate_oracle", &result);
                let _ = reply.send(result);
            }
            Command::UpdateOracleReputation {
                caller,
                oracle_id,
                score,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.update_oracle_reputation(&ctx, oracle_id, score);
                self.observe("oracle", "update_oracle_reputation", &result);
                let _ = reply.send(result);
            }
            Command::SubmitData {
                caller,
                oracle_id,
                data_type,
                value,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.submit_data(&ctx, oracle_id, &data_type, &value);
                self.observe("oracle", "submit_data", &result);
                let _ = reply.send(result);
            }
            Command::ValidateData {
                caller,
                data_id,
                is_valid,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.validate_data(&ctx, data_id, is_valid);
                self.observe("oracle", "validate_data", &result);
                let _ = reply.send(result);
            }
            Command::CreateTriggerCondition {
                caller,
                condition_type,
                threshold_value,
                comparison_operator,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.create_trigger_condition(
                    &ctx,
                    &condition_type,
                    threshold_value,
                    &comparison_operator,
                );
                self.observe("oracle", "create_trigger_condition", &result);
                let _ = reply.send(result);
            }
            Command::DeactivateTriggerCondition {
                caller,
                condition_id,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.deactivate_trigger_condition(&ctx, condition_id);
                self.observe("oracle", "deactivate_trigger_condition", &result);
                let _ = reply.send(result);
            }
            Command::ProcessTrigger {
                caller,
                policy_id,
                data_id,
                condition_id,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self
                    .oracles
                    .process_trigger(&ctx, policy_id, data_id, condition_id);
                self.observe("oracle", "process_trigger", &result);
                let _ = reply.send(result);
            }
            Command::DisputeTrigger {
                caller,
                policy_id,
                reason,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.dispute_trigger(&ctx, policy_id, &reason);
                self.observe("oracle", "dispute_trigger", &result);
                let _ = reply.send(result);
            }
            Command::ResolveDispute {
                caller,
                policy_id,
                uphold,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.resolve_dispute(&ctx, policy_id, uphold);
                self.observe("oracle", "resolve_dispute", &result);
                let _ = reply.send(result);
            }
            Command::SetOracleLedgerActive {
                caller,
                active,
                reply,
            } => {
                let ctx = self.context(caller);
                let result = self.oracles.set_active(&ctx, active);
                self.observe("oracle", "set_active", &result);
                let _ = reply.send(result);
            }
            Command::GetPolicy { policy_id, reply } => {
                let _ = reply.send(self.policies.get_policy(policy_id).cloned());
            }
            Command::GetHolderSummary { holder, reply } => {
                let _ = reply.send(self.policies.get_holder_summary(&holder).cloned());
            }
            Command::GetOracle { oracle_id, reply } => {
                let _ = reply.send(self.oracles.get_oracle(oracle_id).cloned());
            }
            Command::GetDataPoint { data_id, reply } => {
                let _ = reply.send(self.oracles.get_data_point(data_id).cloned());
            }
            Command::GetTriggerCondition {
                condition_id,
                reply,
            } => {
                let _ = reply.send(self.oracles.get_trigger_condition(condition_id).cloned());
            }
            Command::GetClaimTrigger { policy_id, reply } => {
                let _ = reply.send(self.oracles.get_claim_trigger(policy_id).cloned());
            }
            Command::Snapshot { reply } => {
                debug!(height = self.clock.peek(), "Snapshot requested");
                let _ = reply.send(NodeSnapshot {
                    height: self.clock.peek(),
                    policy: self.policies.snapshot(),
                    oracle: self.oracles.snapshot(),
                });
            }
        }
    }
}

/// Cloneable client of a running [`LedgerActor`]
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<Command>,
}

impl LedgerHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| ParametrixError::Channel("ledger actor stopped".into()))?;
        rx.await
            .map_err(|_| ParametrixError::Channel("ledger actor dropped reply".into()))
    }

    /// Send a ledger call and lift its [`LedgerError`] into [`ParametrixError`]
    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        Ok(self.request(command).await??)
    }

    // ============ POLICY LEDGER ============

    #[instrument(skip(self))]
    pub async fn create_policy(
        &self,
        caller: Principal,
        policy_type: &str,
        premium_amount: u64,
        coverage_amount: u64,
    ) -> Result<PolicyId> {
        let policy_type = policy_type.to_string();
        self.call(|reply| Command::CreatePolicy {
            caller,
            policy_type,
            premium_amount,
            coverage_amount,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn update_policy_status(
        &self,
        caller: Principal,
        policy_id: PolicyId,
        status: PolicyStatus,
    ) -> Result<()> {
        self.call(|reply| Command::UpdatePolicyStatus {
            caller,
            policy_id,
            status,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn cancel_policy(&self, caller: Principal, policy_id: PolicyId) -> Result<()> {
        self.call(|reply| Command::CancelPolicy {
            caller,
            policy_id,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_policy_ledger_active(&self, caller: Principal, active: bool) -> Result<()> {
        self.call(|reply| Command::SetPolicyLedgerActive {
            caller,
            active,
            reply,
        })
        .await
    }

    // ============ ORACLE & TRIGGER LEDGER ============

    #[instrument(skip(self))]
    pub async fn register_oracle(
        &self,
        caller: Principal,
        address: Principal,
        data_source: &str,
    ) -> Result<OracleId> {
        let data_source = data_source.to_string();
        self.call(|reply| Command::RegisterOracle {
            caller,
            address,
            data_source,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn deactivate_oracle(&self, caller: Principal, oracle_id: OracleId) -> Result<()> {
        self.call(|reply| Command::DeactivateOracle {
            caller,
            oracle_id,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn update_oracle_reputation(
        &self,
        caller: Principal,
        oracle_id: OracleId,
        score: u16,
    ) -> Result<()> {
        self.call(|reply| Command::UpdateOracleReputation {
            caller,
            oracle_id,
            score,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn submit_data(
        &self,
        caller: Principal,
        oracle_id: OracleId,
        data_type: &str,
        value: &str,
    ) -> Result<DataId> {
        let data_type = data_type.to_string();
        let value = value.to_string();
        self.call(|reply| Command::SubmitData {
            caller,
            oracle_id,
            data_type,
            value,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn validate_data(&self, caller: Principal, data_id: DataId, is_valid: bool) -> Result<()> {
        self.call(|reply| Command::ValidateData {
            caller,
            data_id,
            is_valid,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_trigger_condition(
        &self,
        caller: Principal,
        condition_type: &str,
        threshold_value: u64,
        comparison_operator: &str,
    ) -> Result<ConditionId> {
        let condition_type = condition_type.to_string();
        let comparison_operator = comparison_operator.to_string();
        self.call(|reply| Command::CreateTriggerCondition {
            caller,
            condition_type,
            threshold_value,
            comparison_operator,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn deactivate_trigger_condition(
        &self,
        caller: Principal,
        condition_id: ConditionId,
    ) -> Result<()> {
        self.call(|reply| Command::DeactivateTriggerCondition {
            caller,
            condition_id,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn process_trigger(
        &self,
        caller: Principal,
        policy_id: PolicyId,
        data_id: DataId,
        condition_id: ConditionId,
    ) -> Result<()> {
        self.call(|reply| Command::ProcessTrigger {
            caller,
            policy_id,
            data_id,
            condition_id,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn dispute_trigger(&self, caller: Principal, policy_id: PolicyId, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.call(|reply| Command::DisputeTrigger {
            caller,
            policy_id,
            reason,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn resolve_dispute(&self, caller: Principal, policy_id: PolicyId, uphold: bool) -> Result<()> {
        self.call(|reply| Command::ResolveDispute {
            caller,
            policy_id,
            uphold,
            reply,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_oracle_ledger_active(&self, caller: Principal, active: bool) -> Result<()> {
        self.call(|reply| Command::SetOracleLedgerActive {
            caller,
            active,
            reply,
        })
        .await
    }

    // ============ QUERIES ============

    pub async fn get_policy(&self, policy_id: PolicyId) -> Result<Option<Policy>> {
        self.request(|reply| Command::GetPolicy { policy_id, reply })
            .await
    }

    pub async fn get_holder_summary(&self, holder: Principal) -> Result<Option<HolderSummary>> {
        self.request(|reply| Command::GetHolderSummary { holder, reply })
            .await
    }

    pub async fn get_oracle(&self, oracle_id: OracleId) -> Result<Option<Oracle>> {
        self.request(|reply| Command::GetOracle { oracle_id, reply })
            .await
    }

    pub async fn get_data_point(&self, data_id: DataId) -> Result<Option<DataPoint>> {
        self.request(|reply| Command::GetDataPoint { data_id, reply })
            .await
    }

    pub async fn get_trigger_condition(
        &self,
        condition_id: ConditionId,
    ) -> Result<Option<TriggerCondition>> {
        self.request(|reply| Command::GetTriggerCondition {
            condition_id,
            reply,
        })
        .await
    }

    pub async fn get_claim_trigger(&self, policy_id: PolicyId) -> Result<Option<ClaimTrigger>> {
        self.request(|reply| Command::GetClaimTrigger { policy_id, reply })
            .await
    }

    /// Consistent copy of both ledgers between two commands
    pub async fn snapshot(&self) -> Result<NodeSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn state_digest(&self) -> Result<StateDigest> {
        self.snapshot().await?.digest()
    }
}
