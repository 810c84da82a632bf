//! Reconciliation plans.

use std::fmt;

use crate::diff::{Operation, OperationKind};
use crate::identity::IdentityKey;
use crate::mapper::InvalidSession;

/// A scraped session whose identity key was already taken by an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateSessionWarning {
    pub key: IdentityKey,
    /// Label of the session that was kept.
    pub kept: String,
    /// Label of the session that was dropped.
    pub dropped: String,
}

impl fmt::Display for DuplicateSessionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate session '{}' ignored, keeping '{}'", self.dropped, self.kept)
    }
}

/// Operation counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanCounts {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub noop: usize,
}

/// Ordered set of operations that brings the calendar in line with the schedule.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub operations: Vec<Operation>,
    /// Sessions excluded because they could not be mapped.
    pub invalid: Vec<InvalidSession>,
    pub duplicates: Vec<DuplicateSessionWarning>,
    /// Existing events without a schedsync key. Left untouched.
    pub foreign_events: usize,
}

impl Plan {
    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts::default();

        for op in &self.operations {
            match op.kind() {
                OperationKind::Create => counts.create += 1,
                OperationKind::Update => counts.update += 1,
                OperationKind::Delete => counts.delete += 1,
                OperationKind::Noop => counts.noop += 1,
            }
        }

        counts
    }

    /// Operations that change the calendar.
    pub fn changes(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| op.kind() != OperationKind::Noop)
    }

    pub fn is_empty(&self) -> bool {
        self.changes().next().is_none()
    }

    /// True when every owned event is about to be removed and nothing replaces it.
    pub fn deletes_everything(&self) -> bool {
        let counts = self.counts();
        counts.delete > 0 && counts.create == 0 && counts.update == 0 && counts.noop == 0
    }
}
