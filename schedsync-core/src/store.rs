//! The remote calendar as seen by the executor.

use async_trait::async_trait;

use crate::date_range::DateRange;
use crate::error::SyncResult;
use crate::event::{CalendarEvent, EventDraft, EventId};

/// List and mutate events in one calendar.
///
/// Implementations report retryable conditions (network errors, timeouts,
/// rate limits) as [`SyncError::TransientProvider`](crate::error::SyncError::TransientProvider)
/// and everything else as `PermanentProvider`. Each call is atomic from
/// the caller's point of view.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Make sure the target calendar exists, creating it if needed, and
    /// return the id to use for the rest of the run.
    async fn ensure_calendar(&self, calendar_id: &str, _calendar_name: &str, _time_zone: &str) -> SyncResult<String> {
        Ok(calendar_id.to_string())
    }

    async fn list_events(&self, calendar_id: &str, range: &DateRange) -> SyncResult<Vec<CalendarEvent>>;

    /// Returns the provider-assigned id of the new event.
    async fn create_event(&self, calendar_id: &str, draft: &EventDraft) -> SyncResult<EventId>;

    async fn update_event(&self, calendar_id: &str, event_id: &EventId, draft: &EventDraft) -> SyncResult<()>;

    /// Deleting an event that is already gone succeeds.
    async fn delete_event(&self, calendar_id: &str, event_id: &EventId) -> SyncResult<()>;
}
