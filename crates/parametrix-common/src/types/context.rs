//! Call context - what the host hands the engine with every call

use super::principal::Principal;
use serde::{Deserialize, Serialize};

/// Monotonic height used as the ledger's only time source
pub type Height = u64;

/// Caller identity and current height for one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Who is transacting
    pub caller: Principal,
    /// Height at which the call is applied
    pub height: Height,
}

impl CallContext {
    pub fn new(caller: impl Into<Principal>, height: Height) -> Self {
        Self {
            caller: caller.into(),
            height,
        }
    }

    /// Same caller at another height
    pub fn at(&self, height: Height) -> Self {
        Self {
            caller: self.caller.clone(),
            height,
        }
    }
}
