//! Prometheus metrics for ledger calls

use parametrix_common::LedgerResult;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

/// Counters for calls applied by the ledger actor
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Calls by ledger, operation and outcome
    pub calls_total: IntCounterVec,
    /// Next height the clock will hand out
    pub height: IntGauge,
}

impl LedgerMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            calls_total: IntCounterVec::new(
                Opts::new("parametrix_ledger_calls_total", "Ledger calls by outcome"),
                &["ledger", "operation", "outcome"],
            )?,
            height: IntGauge::new("parametrix_ledger_height", "Next ledger height")?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.calls_total.clone()))?;
        registry.register(Box::new(self.height.clone()))?;
        Ok(())
    }

    /// Count one call; rejections are labelled with their error
    pub fn observe<T>(&self, ledger: &str, operation: &str, result: &LedgerResult<T>) {
        let outcome = match result {
            Ok(_) => "ok".to_string(),
            Err(err) => err.to_string().replace(' ', "_"),
        };
        self.calls_total
            .with_label_values(&[ledger, operation, &outcome])
            .inc();
    }
}
