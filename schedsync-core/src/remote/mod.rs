pub mod protocol;
pub mod provider;

use std::time::Duration;

use async_trait::async_trait;

use crate::date_range::DateRange;
use crate::error::{SyncError, SyncResult};
use crate::event::{CalendarEvent, EventDraft, EventId};
use crate::remote::protocol::{
    CreateEvent, DeleteEvent, EnsureCalendar, FetchSchedule, ListEvents, UpdateEvent,
};
use crate::remote::provider::Provider;
use crate::session::Session;
use crate::source::{ScheduleQuery, ScheduleSource, select};
use crate::store::CalendarStore;

/// A calendar store backed by a provider binary.
#[derive(Debug, Clone)]
pub struct Remote {
    provider: Provider,
}

impl Remote {
    pub fn new(provider: Provider) -> Self {
        Remote { provider }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

#[async_trait]
impl CalendarStore for Remote {
    async fn ensure_calendar(&self, calendar_id: &str, calendar_name: &str, time_zone: &str) -> SyncResult<String> {
        self.provider
            .call(EnsureCalendar {
                calendar_id: calendar_id.to_string(),
                calendar_name: calendar_name.to_string(),
                time_zone: time_zone.to_string(),
            })
            .await
    }

    async fn list_events(&self, calendar_id: &str, range: &DateRange) -> SyncResult<Vec<CalendarEvent>> {
        self.provider
            .call(ListEvents {
                calendar_id: calendar_id.to_string(),
                from: range.from_rfc3339(),
                to: range.to_rfc3339(),
            })
            .await
    }

    async fn create_event(&self, calendar_id: &str, draft: &EventDraft) -> SyncResult<EventId> {
        self.provider
            .call(CreateEvent {
                calendar_id: calendar_id.to_string(),
                event: draft.clone(),
            })
            .await
    }

    async fn update_event(&self, calendar_id: &str, event_id: &EventId, draft: &EventDraft) -> SyncResult<()> {
        self.provider
            .call(UpdateEvent {
                calendar_id: calendar_id.to_string(),
                event_id: event_id.clone(),
                event: draft.clone(),
            })
            .await
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &EventId) -> SyncResult<()> {
        self.provider
            .call(DeleteEvent {
                calendar_id: calendar_id.to_string(),
                event_id: event_id.clone(),
            })
            .await
    }
}

/// A schedule source backed by a scraper binary.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    provider: Provider,
}

impl RemoteSource {
    pub fn new(provider: Provider, timeout: Duration) -> Self {
        RemoteSource {
            provider: provider.with_timeout(timeout),
        }
    }
}

#[async_trait]
impl ScheduleSource for RemoteSource {
    async fn fetch(&self, query: &ScheduleQuery) -> SyncResult<Vec<Session>> {
        let sessions = self
            .provider
            .call(FetchSchedule {
                group: query.group.clone(),
                building: query.building.clone(),
                from: query.range.from_rfc3339(),
                to: query.range.to_rfc3339(),
            })
            .await
            .map_err(|e| match e {
                // keep retryable failures retryable
                SyncError::TransientProvider { .. } | SyncError::ProviderTimeout(_) => e,
                other => SyncError::SourceUnavailable(other.to_string()),
            })?;

        Ok(select(sessions, query))
    }
}
