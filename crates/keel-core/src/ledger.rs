// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Append-only action sequencing.
//!
//! The ledger is the source of truth for control-plane ordering: actions
//! commit in strict `last_seq + 1` order, and an `action_id` is applied at
//! most once. Emergency stops bypass sequencing entirely and never advance
//! the sequence. `last_seq` only increases and ids are never forgotten.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::action::{Action, ActionKind};

/// Ordering or replay violation on [`Ledger::apply`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The action was not applicable (wrong sequence or replayed id).
    #[error("ledger ordering / replay violation for seq {0}")]
    OrderViolation(u64),
}

/// Minimal seriality enforcement for control-plane actions.
///
/// In a full deployment this would be an append-only log with fsync and a
/// hash chain; the kernel only needs the ordering and at-most-once checks.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    last_seq: u64,
    seen_action_ids: FxHashSet<String>,
}

impl Ledger {
    /// Creates a ledger with no committed actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger resuming from a known committed sequence.
    #[must_use]
    pub fn with_last_seq(last_seq: u64) -> Self {
        Self {
            last_seq,
            seen_action_ids: FxHashSet::default(),
        }
    }

    /// Last committed sequence number.
    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Whether `action` could be applied right now.
    ///
    /// Emergency stops always pass. Everything else requires
    /// `action.seq == last_seq + 1` and a fresh `action_id` (if any).
    #[must_use]
    pub fn can_apply(&self, action: &Action) -> bool {
        if action.kind == ActionKind::EmergencyStop {
            return true;
        }
        if action.seq != self.last_seq + 1 {
            return false;
        }
        if let Some(id) = &action.action_id {
            if self.seen_action_ids.contains(id) {
                return false;
            }
        }
        true
    }

    /// Commits `action`, advancing the sequence (except for emergency
    /// stops) and recording its `action_id`.
    pub fn apply(&mut self, action: &Action) -> Result<(), LedgerError> {
        if !self.can_apply(action) {
            return Err(LedgerError::OrderViolation(action.seq));
        }
        if action.kind != ActionKind::EmergencyStop {
            self.last_seq = action.seq;
        }
        if let Some(id) = &action.action_id {
            self.seen_action_ids.insert(id.clone());
        }
        Ok(())
    }
}
