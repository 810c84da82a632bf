//! Aggregated outcome of executing a plan.

use std::fmt;

use serde::Serialize;

use crate::diff::OperationKind;
use crate::event::EventId;

/// Why a single operation did not apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: OperationKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    pub cause: String,
    /// Whether the last error was transient (retries exhausted or cancelled).
    pub transient: bool,
    pub attempts: u32,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.label, self.cause)?;
        if self.attempts > 1 {
            write!(f, " (after {} attempts)", self.attempts)?;
        }
        Ok(())
    }
}

/// What happened to one operation. Workers send these to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Applied(OperationKind),
    Skipped,
    Failed(Failure),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
    /// Non-fatal problems found while planning: invalid and duplicate sessions.
    pub warnings: Vec<String>,
    /// Set when cancellation stopped dispatch before the plan was exhausted.
    pub cancelled: bool,
}

impl SyncReport {
    pub fn record(&mut self, outcome: OperationOutcome) {
        match outcome {
            OperationOutcome::Applied(OperationKind::Create) => self.created += 1,
            OperationOutcome::Applied(OperationKind::Update) => self.updated += 1,
            OperationOutcome::Applied(OperationKind::Delete) => self.deleted += 1,
            OperationOutcome::Applied(OperationKind::Noop) | OperationOutcome::Skipped => {
                self.skipped += 1
            }
            OperationOutcome::Failed(failure) => {
                self.failed += 1;
                self.failures.push(failure);
            }
        }
    }

    /// Operations that changed the calendar.
    pub fn applied(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit status: non-zero when any operation failed or was left
    /// undone by cancellation.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() || self.cancelled { 1 } else { 0 }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} skipped, {} failed",
            self.created, self.updated, self.deleted, self.skipped, self.failed
        )
    }
}
