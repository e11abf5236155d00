//! Ledger audit trail
//!
//! Every mutating ledger call, accepted or rejected, produces one
//! [`AuditEvent`]. Events are written to any number of [`AuditSink`]s:
//! - [`TracingAuditSink`]: structured `tracing` output (default)
//! - [`MemoryAuditSink`]: in-process buffer for tests and inspection
//!
//! The trail is an off-ledger observation channel. It carries a wall-clock
//! timestamp next to the call height, so it is never part of ledger state or
//! state digests.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult, Result};
use crate::types::context::{CallContext, Height};

/// Audit event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuditSeverity {
    /// Accepted call
    Info,
    /// Rejected call
    Warning,
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditSeverity::Info => write!(f, "INFO"),
            AuditSeverity::Warning => write!(f, "WARN"),
        }
    }
}

/// Audit event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditCategory {
    /// Gate changes (pause, resume)
    Administration,
    /// Policy creation and status changes
    PolicyLifecycle,
    /// Oracle registration, deactivation, reputation
    OracleRegistry,
    /// Data point submission and validation
    Observation,
    /// Trigger conditions, claim triggers, disputes
    TriggerLifecycle,
}

impl std::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditCategory::Administration => write!(f, "ADMIN"),
            AuditCategory::PolicyLifecycle => write!(f, "POLICY"),
            AuditCategory::OracleRegistry => write!(f, "ORACLE"),
            AuditCategory::Observation => write!(f, "DATA"),
            AuditCategory::TriggerLifecycle => write!(f, "TRIGGER"),
        }
    }
}

/// Audit outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Accepted,
    Rejected(LedgerError),
}

/// Audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub event_id: String,

    /// Wall-clock timestamp (Unix millis)
    pub recorded_at: i64,

    /// Ledger height of the call
    pub height: Height,

    /// Event severity
    pub severity: AuditSeverity,

    /// Event category
    pub category: AuditCategory,

    /// Entry point name (e.g. "create_policy")
    pub action: String,

    pub outcome: AuditOutcome,

    /// Caller identity
    pub actor: String,

    /// Target entity (e.g. "policy/3")
    pub resource: Option<String>,

    /// Additional details
    pub details: BTreeMap<String, String>,
}

impl AuditEvent {
    /// Create a new audit event for a call
    pub fn new(ctx: &CallContext, category: AuditCategory, action: &str, outcome: AuditOutcome) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7().to_string(),
            recorded_at: chrono::Utc::now().timestamp_millis(),
            height: ctx.height,
            severity: match outcome {
                AuditOutcome::Accepted => AuditSeverity::Info,
                AuditOutcome::Rejected(_) => AuditSeverity::Warning,
            },
            category,
            action: action.to_string(),
            outcome,
            actor: ctx.caller.to_string(),
            resource: None,
            details: BTreeMap::new(),
        }
    }

    /// Set resource
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Add detail
    pub fn with_detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.outcome, AuditOutcome::Rejected(_))
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Audit log sink
pub trait AuditSink: Send + Sync {
    /// Write an audit event
    fn write(&self, event: &AuditEvent);

    /// Flush pending events
    fn flush(&self) {}
}

/// Writes audit events as structured tracing records
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn write(&self, event: &AuditEvent) {
        let resource = event.resource.as_deref().unwrap_or("-");
        match event.outcome {
            AuditOutcome::Accepted => info!(
                target: "parametrix::audit",
                category = %event.category,
                action = %event.action,
                actor = %event.actor,
                resource = %resource,
                height = event.height,
                "call accepted"
            ),
            AuditOutcome::Rejected(err) => warn!(
                target: "parametrix::audit",
                category = %event.category,
                action = %event.action,
                actor = %event.actor,
                resource = %resource,
                height = event.height,
                code = err.code(),
                "call rejected: {}",
                err
            ),
        }
    }
}

/// Keeps audit events in memory
#[derive(Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded events
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, event: &AuditEvent) {
        self.events.write().push(event.clone());
    }
}

/// Fans audit events out to sinks
#[derive(Clone)]
pub struct AuditLogger {
    sinks: Vec<Arc<dyn AuditSink>>,
    /// Minimum severity to log
    min_severity: AuditSeverity,
}

impl AuditLogger {
    /// Logger writing to tracing only
    pub fn new() -> Self {
        Self {
            sinks: vec![Arc::new(TracingAuditSink)],
            min_severity: AuditSeverity::Info,
        }
    }

    /// Logger with no sinks
    pub fn silent() -> Self {
        Self {
            sinks: Vec::new(),
            min_severity: AuditSeverity::Info,
        }
    }

    /// Add a sink
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Set minimum severity
    pub fn with_min_severity(mut self, severity: AuditSeverity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Log an audit event
    pub fn log(&self, event: AuditEvent) {
        if event.severity < self.min_severity {
            return;
        }
        for sink in &self.sinks {
            sink.write(&event);
        }
    }

    /// Record the outcome of a ledger call
    pub fn record<T>(
        &self,
        ctx: &CallContext,
        category: AuditCategory,
        action: &str,
        resource: Option<String>,
        result: &LedgerResult<T>,
    ) {
        let outcome = match result {
            Ok(_) => AuditOutcome::Accepted,
            Err(err) => AuditOutcome::Rejected(*err),
        };
        let mut event = AuditEvent::new(ctx, category, action, outcome);
        if let Some(resource) = resource {
            event = event.with_resource(resource);
        }
        self.log(event);
    }

    /// Flush all sinks
    pub fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("sinks", &self.sinks.len())
            .field("min_severity", &self.min_severity)
            .finish()
    }
}
