//! One end-to-end run: fetch, reconcile, execute.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::config::SyncConfig;
use crate::date_range::DateRange;
use crate::diff::{Plan, reconcile};
use crate::error::{SyncError, SyncResult};
use crate::event::CalendarEvent;
use crate::executor::{ExecutorOptions, SyncExecutor};
use crate::mapper::EventMapper;
use crate::remote::provider::Provider;
use crate::remote::{Remote, RemoteSource};
use crate::report::SyncReport;
use crate::retry::{RetryPolicy, retry};
use crate::session::Session;
use crate::source::{FileSource, ScheduleQuery, ScheduleSource};
use crate::store::CalendarStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Plan only. Nothing is written to the calendar.
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub calendar_id: String,
    pub plan: Plan,
    /// Empty on a dry run apart from planning warnings.
    pub report: SyncReport,
}

pub struct SyncRun {
    config: SyncConfig,
    source: Arc<dyn ScheduleSource>,
    store: Arc<dyn CalendarStore>,
}

impl SyncRun {
    pub fn new(config: SyncConfig, source: Arc<dyn ScheduleSource>, store: Arc<dyn CalendarStore>) -> Self {
        SyncRun {
            config,
            source,
            store,
        }
    }

    /// Build the source and store named in the configuration.
    pub fn from_config(config: SyncConfig) -> SyncResult<Self> {
        let source: Arc<dyn ScheduleSource> = match (&config.source.file, &config.source.provider) {
            (Some(path), _) => Arc::new(FileSource::new(path)),
            (None, Some(name)) => Arc::new(RemoteSource::new(
                Provider::schedule(name),
                config.source_timeout(),
            )),
            (None, None) => {
                return Err(SyncError::Config(
                    "No schedule source configured. Set source.provider or source.file".into(),
                ));
            }
        };

        let store = Arc::new(Remote::new(Provider::calendar(&config.calendar.provider)));

        Ok(SyncRun::new(config, source, store))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fill in the configured defaults for anything not given.
    pub fn query(&self, group: Option<String>, building: Option<String>, range: Option<DateRange>) -> ScheduleQuery {
        ScheduleQuery {
            group: group.unwrap_or_else(|| self.config.scraping.default_group.clone()),
            building: building.unwrap_or_else(|| self.config.scraping.default_building.clone()),
            range: range.unwrap_or_else(|| DateRange::upcoming(self.config.scraping.window_days)),
        }
    }

    /// Fetch, reconcile and (unless dry-running) execute.
    ///
    /// Fails only when nothing could be reconciled: the schedule or the
    /// existing events could not be loaded, or the run was cancelled first.
    /// Per-operation failures end up in the report.
    #[tracing::instrument(skip_all, fields(group = %query.group, range = %query.range, dry_run = options.dry_run))]
    pub async fn run(&self, query: &ScheduleQuery, options: RunOptions, cancel: &CancelToken) -> SyncResult<RunOutcome> {
        let calendar_id = self.config.calendar_id()?.to_string();

        let sessions = self.fetch_schedule(query, cancel).await?;
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let mut warnings = Vec::new();
        let calendar_id = if options.dry_run {
            calendar_id
        } else {
            let assigned = self.ensure_calendar(&calendar_id, cancel).await?;
            if assigned != calendar_id {
                tracing::warn!(
                    configured = %calendar_id,
                    assigned = %assigned,
                    "Calendar was created under a new id, set calendar.calendar_id to keep using it"
                );
                warnings.push(format!(
                    "calendar {calendar_id} was created as {assigned}: set calendar.calendar_id = \"{assigned}\" \
                     or the next run will create another calendar"
                ));
            }
            assigned
        };

        let existing = self.list_existing(&calendar_id, &query.range, cancel).await?;

        let mapper = EventMapper::new(self.config.calendar.time_zone.clone());
        let plan = reconcile(&mapper, &sessions, &existing);
        warnings.extend(log_plan(&plan));
        let mut report = SyncReport {
            warnings,
            ..SyncReport::default()
        };

        if options.dry_run {
            return Ok(RunOutcome {
                calendar_id,
                plan,
                report,
            });
        }

        let executor = SyncExecutor::new(
            self.store.clone(),
            calendar_id.clone(),
            ExecutorOptions::from(&self.config.executor),
        );
        let executed = executor.execute(plan.operations.clone(), cancel).await;
        report = SyncReport {
            warnings: report.warnings,
            ..executed
        };

        Ok(RunOutcome {
            calendar_id,
            plan,
            report,
        })
    }

    /// The schedule, or `SourceUnavailable`. Never a partial list.
    async fn fetch_schedule(&self, query: &ScheduleQuery, cancel: &CancelToken) -> SyncResult<Vec<Session>> {
        let source = self.source.as_ref();
        let timeout = self.config.source_timeout();

        let outcome = retry(&self.config.source_policy(), cancel, |attempt| async move {
            tracing::debug!(attempt, "Fetching schedule");
            match tokio::time::timeout(timeout, source.fetch(query)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::ProviderTimeout(timeout.as_secs())),
            }
        })
        .await;

        match outcome.result {
            Ok(sessions) => {
                tracing::info!(sessions = sessions.len(), attempts = outcome.attempts, "Fetched schedule");
                Ok(sessions)
            }
            Err(SyncError::SourceUnavailable(msg)) => Err(SyncError::SourceUnavailable(msg)),
            Err(e) => Err(SyncError::SourceUnavailable(format!(
                "{e} (after {} attempts)",
                outcome.attempts
            ))),
        }
    }

    async fn ensure_calendar(&self, calendar_id: &str, cancel: &CancelToken) -> SyncResult<String> {
        let store = self.store.as_ref();
        let calendar = &self.config.calendar;
        let policy = RetryPolicy::from(&self.config.executor);

        let outcome = retry(&policy, cancel, |_| async move {
            store
                .ensure_calendar(calendar_id, &calendar.calendar_name, &calendar.time_zone)
                .await
        })
        .await;

        outcome.result
    }

    async fn list_existing(
        &self,
        calendar_id: &str,
        range: &DateRange,
        cancel: &CancelToken,
    ) -> SyncResult<Vec<CalendarEvent>> {
        let store = self.store.as_ref();
        let policy = RetryPolicy::from(&self.config.executor);

        let outcome = retry(&policy, cancel, |_| async move {
            store.list_events(calendar_id, range).await
        })
        .await;

        let events = outcome.result?;
        tracing::info!(events = events.len(), "Listed existing events");
        Ok(events)
    }
}

/// Log the plan summary and every warning. Returns the warnings for the report.
fn log_plan(plan: &Plan) -> Vec<String> {
    let counts = plan.counts();
    tracing::info!(
        create = counts.create,
        update = counts.update,
        delete = counts.delete,
        noop = counts.noop,
        foreign = plan.foreign_events,
        "Reconciled schedule"
    );

    let mut warnings = Vec::new();

    for invalid in &plan.invalid {
        tracing::warn!(session = %invalid.label, reason = %invalid.reason, "Invalid session excluded");
        warnings.push(format!("invalid session {invalid}"));
    }
    for duplicate in &plan.duplicates {
        tracing::warn!(key = %duplicate.key, kept = %duplicate.kept, dropped = %duplicate.dropped, "Duplicate session");
        warnings.push(duplicate.to_string());
    }
    if plan.deletes_everything() {
        if plan.invalid.is_empty() {
            tracing::warn!(deletes = counts.delete, "Schedule window is empty, every schedsync event will be deleted");
            warnings.push(format!(
                "schedule is empty: all {} schedsync events in the window will be deleted",
                counts.delete
            ));
        } else {
            tracing::warn!(
                invalid = plan.invalid.len(),
                deletes = counts.delete,
                "Every session in the window is invalid, every schedsync event will be deleted"
            );
            warnings.push(format!(
                "all {} sessions in the window are invalid: all {} schedsync events in the window will be deleted",
                plan.invalid.len(),
                counts.delete
            ));
        }
    }

    warnings
}
