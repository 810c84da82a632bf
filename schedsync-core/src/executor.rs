//! Applies a reconciliation plan to a calendar store.
//!
//! Operations target disjoint events, so they are dispatched to a bounded
//! pool of workers in plan order. A shared [`RateLimiter`] spaces out every
//! provider request, retries included. Each worker hands its
//! [`OperationOutcome`] back to the dispatching task, which is the only
//! place the [`SyncReport`] is mutated.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

use crate::cancel::CancelToken;
use crate::config::ExecutorConfig;
use crate::diff::{Operation, OperationKind};
use crate::error::{Retryable, SyncResult};
use crate::event::EventId;
use crate::identity::IdentityKey;
use crate::rate_limit::RateLimiter;
use crate::report::{Failure, OperationOutcome, SyncReport};
use crate::retry::{RetryPolicy, retry};
use crate::store::CalendarStore;

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum operations in flight at once.
    pub concurrency: usize,
    /// Request-rate cap across all workers. Zero disables it.
    pub requests_per_second: f64,
    pub retry: RetryPolicy,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        ExecutorOptions::from(&ExecutorConfig::default())
    }
}

impl From<&ExecutorConfig> for ExecutorOptions {
    fn from(config: &ExecutorConfig) -> Self {
        ExecutorOptions {
            concurrency: config.concurrency,
            requests_per_second: config.requests_per_second,
            retry: RetryPolicy::from(config),
        }
    }
}

struct Worker {
    store: Arc<dyn CalendarStore>,
    calendar_id: String,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

pub struct SyncExecutor {
    worker: Arc<Worker>,
    concurrency: usize,
}

impl SyncExecutor {
    pub fn new(store: Arc<dyn CalendarStore>, calendar_id: impl Into<String>, options: ExecutorOptions) -> Self {
        SyncExecutor {
            worker: Arc::new(Worker {
                store,
                calendar_id: calendar_id.into(),
                limiter: RateLimiter::per_second(options.requests_per_second),
                policy: options.retry,
            }),
            concurrency: options.concurrency.max(1),
        }
    }

    /// Apply every operation and report what happened.
    ///
    /// Failures never stop the run. Once `cancel` fires no further
    /// operations are dispatched; those already in flight finish normally.
    #[tracing::instrument(skip_all, fields(calendar_id = %self.worker.calendar_id, operations = operations.len()))]
    pub async fn execute(&self, operations: Vec<Operation>, cancel: &CancelToken) -> SyncReport {
        let mut report = SyncReport::default();

        if is_full_deletion(&operations) {
            tracing::warn!(
                deletes = operations.len(),
                "!!! Plan deletes EVERY schedsync event in the window !!!"
            );
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();
        // What each task was applying, for tasks that die without an outcome
        let mut in_flight: HashMap<task::Id, (OperationKind, String, Option<EventId>)> = HashMap::new();
        let total = operations.len();

        for (index, op) in operations.into_iter().enumerate() {
            if op.kind() == OperationKind::Noop {
                report.record(OperationOutcome::Skipped);
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                let remaining = total - index;
                tracing::warn!(remaining, "Cancelled, not dispatching remaining operations");
                report.skipped += remaining;
                report.cancelled = true;
                break;
            };

            let attribution = (op.kind(), op.label(), op.event_id().cloned());
            let worker = self.worker.clone();
            let cancel = cancel.clone();
            let handle = join_set.spawn(async move {
                let outcome = worker.apply(op, &cancel).await;
                drop(permit);
                outcome
            });
            in_flight.insert(handle.id(), attribution);
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    let (kind, label, event_id) = in_flight
                        .remove(&e.id())
                        .unwrap_or_else(|| (OperationKind::Noop, "unknown operation".into(), None));
                    tracing::error!(error = %e, operation = %label, "Worker task failed");
                    report.record(OperationOutcome::Failed(Failure {
                        kind,
                        label,
                        event_id,
                        cause: e.to_string(),
                        transient: false,
                        attempts: 0,
                    }));
                }
            }
        }

        tracing::info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            "Plan executed"
        );

        report
    }
}

impl Worker {
    async fn apply(&self, op: Operation, cancel: &CancelToken) -> OperationOutcome {
        let kind = op.kind();

        if let Err(cause) = verify_ownership(&op) {
            tracing::warn!(operation = %op, %cause, "Refusing to touch event");
            return OperationOutcome::Failed(failure(&op, cause, false, 0));
        }

        let store = self.store.as_ref();
        let limiter = &self.limiter;
        let calendar_id = self.calendar_id.as_str();
        let target = &op;

        let outcome = retry(&self.policy, cancel, |_| async move {
            limiter.acquire().await;
            send(store, calendar_id, target).await
        })
        .await;

        match outcome.result {
            Ok(()) => {
                tracing::debug!(operation = %op, attempts = outcome.attempts, "Applied");
                OperationOutcome::Applied(kind)
            }
            Err(err) => {
                tracing::warn!(operation = %op, attempts = outcome.attempts, error = %err, "Operation failed");
                OperationOutcome::Failed(failure(&op, err.to_string(), err.is_transient(), outcome.attempts))
            }
        }
    }
}

async fn send(store: &dyn CalendarStore, calendar_id: &str, op: &Operation) -> SyncResult<()> {
    match op {
        Operation::Create(mapped) => {
            let id = store.create_event(calendar_id, &mapped.draft).await?;
            tracing::debug!(event_id = %id, "Created event");
            Ok(())
        }
        Operation::Update { event, mapped } => store.update_event(calendar_id, &event.id, &mapped.draft).await,
        Operation::Delete { event, .. } => store.delete_event(calendar_id, &event.id).await,
        Operation::Noop { .. } => Ok(()),
    }
}

/// Updates and deletes may only target events whose stored key proves
/// schedsync wrote them. An update must also target the key it was planned for.
fn verify_ownership(op: &Operation) -> Result<(), String> {
    let Some(event) = op.target() else {
        return Ok(());
    };

    let Some(stored) = IdentityKey::from_event(event) else {
        return Err(format!(
            "refused: event {} was not created by schedsync",
            event.id
        ));
    };

    match op {
        Operation::Update { mapped, .. } if mapped.key != stored => Err(format!(
            "refused: event {} carries a different identity key",
            event.id
        )),
        _ => Ok(()),
    }
}

fn failure(op: &Operation, cause: String, transient: bool, attempts: u32) -> Failure {
    Failure {
        kind: op.kind(),
        label: op.label(),
        event_id: op.event_id().cloned(),
        cause,
        transient,
        attempts,
    }
}

fn is_full_deletion(operations: &[Operation]) -> bool {
    !operations.is_empty() && operations.iter().all(|op| op.kind() == OperationKind::Delete)
}
