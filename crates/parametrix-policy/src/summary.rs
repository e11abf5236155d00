//! Per-holder aggregate
//!
//! Historical ledger, not a live balance: counts and premium totals only
//! ever grow, cancellation included.

use parametrix_common::Principal;
use serde::{Deserialize, Serialize};

/// Policy count and premiums paid by one holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSummary {
    pub holder: Principal,
    pub policy_count: u64,
    pub total_premiums_paid: u128,
}

impl HolderSummary {
    /// Summary for a holder's first policy
    pub fn first(holder: Principal, premium: u64) -> Self {
        Self {
            holder,
            policy_count: 1,
            total_premiums_paid: u128::from(premium),
        }
    }

    /// Account for one more policy
    pub fn record_policy(&mut self, premium: u64) {
        self.policy_count = self.policy_count.saturating_add(1);
        self.total_premiums_paid = self.total_premiums_paid.saturating_add(u128::from(premium));
    }
}
