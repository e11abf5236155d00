//! Ledger gate - the cross-cutting precondition for every mutating call
//!
//! Each ledger owns one gate holding the administrator identity fixed at
//! construction, the active/paused flag and an informational version.
//! Entry points call [`LedgerGate::admit`] before touching any state:
//!
//! 1. paused ledger → [`LedgerError::InvalidState`]
//! 2. administrator access and caller ≠ owner → [`LedgerError::Unauthorized`]
//!
//! The owner-only switches ([`LedgerGate::set_active`]) skip the paused check
//! so a paused ledger can always be resumed.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{context::CallContext, principal::Principal};
use serde::{Deserialize, Serialize};

/// Access level required by an entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any caller
    Public,
    /// Only the ledger owner
    Administrator,
}

/// Owner identity, active flag and version of one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerGate {
    owner: Principal,
    active: bool,
    version: u32,
}

impl LedgerGate {
    /// Active gate owned by `owner`, version 1
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self {
            owner: owner.into(),
            active: true,
            version: 1,
        }
    }

    /// Admit a mutating call
    #[inline]
    pub fn admit(&self, ctx: &CallContext, access: Access) -> LedgerResult<()> {
        if !self.active {
            return Err(LedgerError::InvalidState);
        }
        match access {
            Access::Public => Ok(()),
            Access::Administrator => self.ensure_owner(ctx),
        }
    }

    /// Caller must be the owner; ignores the paused flag
    pub fn ensure_owner(&self, ctx: &CallContext) -> LedgerResult<()> {
        if ctx.caller != self.owner {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    /// Flip the active flag (owner only, allowed while paused)
    pub fn set_active(&mut self, ctx: &CallContext, active: bool) -> LedgerResult<()> {
        self.ensure_owner(ctx)?;
        self.active = active;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}
