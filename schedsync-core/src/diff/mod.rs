//! Reconciliation: turning a schedule snapshot into calendar operations.

mod operation;
mod operation_kind;
mod plan;
mod reconcile;

pub use operation::{DeleteReason, Operation};
pub use operation_kind::OperationKind;
pub use plan::{DuplicateSessionWarning, Plan, PlanCounts};
pub use reconcile::reconcile;
