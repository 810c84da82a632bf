//! In-memory collaborators for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use schedsync_core::config::SyncConfig;
use schedsync_core::date_range::DateRange;
use schedsync_core::error::{SyncError, SyncResult};
use schedsync_core::event::{CalendarEvent, EventDraft, EventId};
use schedsync_core::session::{Location, Session, SessionKind};
use schedsync_core::source::{ScheduleQuery, ScheduleSource};
use schedsync_core::store::CalendarStore;

/// A failure the fake store returns instead of performing a call.
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Transient,
    Permanent,
}

impl Scripted {
    fn error(self, target: &str) -> SyncError {
        match self {
            Scripted::Transient => SyncError::transient(format!("503 for {target}")),
            Scripted::Permanent => SyncError::permanent(format!("403 for {target}")),
        }
    }
}

#[derive(Default)]
pub struct FakeStore {
    events: Mutex<BTreeMap<EventId, CalendarEvent>>,
    next_id: AtomicUsize,
    /// Errors to return, keyed by draft title (create) or event id (update, delete).
    script: Mutex<HashMap<String, VecDeque<Scripted>>>,
    always_fail: Mutex<HashMap<String, Scripted>>,
    crash_on: Mutex<HashSet<String>>,
    /// Id handed back by `ensure_calendar`, as when the provider creates the calendar.
    assigned_calendar: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        FakeStore {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn insert(&self, event: CalendarEvent) {
        self.events.lock().unwrap().insert(event.id.clone(), event);
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events.lock().unwrap().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<CalendarEvent> {
        self.events.lock().unwrap().get(&EventId(id.to_string())).cloned()
    }

    /// Fail the next calls for `target`, one scripted error per call.
    pub fn fail_next(&self, target: &str, failures: &[Scripted]) {
        self.script
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .extend(failures.iter().copied());
    }

    pub fn fail_always(&self, target: &str, failure: Scripted) {
        self.always_fail
            .lock()
            .unwrap()
            .insert(target.to_string(), failure);
    }

    /// Panic inside the call for `target`, killing the worker task.
    pub fn crash_on(&self, target: &str) {
        self.crash_on.lock().unwrap().insert(target.to_string());
    }

    pub fn assign_calendar(&self, calendar_id: &str) {
        *self.assigned_calendar.lock().unwrap() = Some(calendar_id.to_string());
    }

    /// Mutating calls in the order they reached the store.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: String, target: &str) -> SyncResult<()> {
        self.calls.lock().unwrap().push(call);

        let crash = self.crash_on.lock().unwrap().contains(target);
        if crash {
            panic!("store crashed on {target}");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(failure) = self.always_fail.lock().unwrap().get(target) {
            return Err(failure.error(target));
        }
        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(target)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(failure) => Err(failure.error(target)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalendarStore for FakeStore {
    async fn ensure_calendar(&self, calendar_id: &str, _calendar_name: &str, _time_zone: &str) -> SyncResult<String> {
        let assigned = self.assigned_calendar.lock().unwrap().clone();
        Ok(assigned.unwrap_or_else(|| calendar_id.to_string()))
    }

    async fn list_events(&self, _calendar_id: &str, range: &DateRange) -> SyncResult<Vec<CalendarEvent>> {
        Ok(self
            .events()
            .into_iter()
            .filter(|e| range.contains(e.start))
            .collect())
    }

    async fn create_event(&self, _calendar_id: &str, draft: &EventDraft) -> SyncResult<EventId> {
        self.enter(format!("create:{}", draft.title), &draft.title).await?;

        let id = EventId(format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.insert(event_from_draft(&id, draft));
        Ok(id)
    }

    async fn update_event(&self, _calendar_id: &str, event_id: &EventId, draft: &EventDraft) -> SyncResult<()> {
        self.enter(format!("update:{event_id}"), event_id.as_str()).await?;

        let mut events = self.events.lock().unwrap();
        if !events.contains_key(event_id) {
            return Err(SyncError::permanent(format!("404 {event_id}")));
        }
        events.insert(event_id.clone(), event_from_draft(event_id, draft));
        Ok(())
    }

    async fn delete_event(&self, _calendar_id: &str, event_id: &EventId) -> SyncResult<()> {
        self.enter(format!("delete:{event_id}"), event_id.as_str()).await?;

        self.events.lock().unwrap().remove(event_id);
        Ok(())
    }
}

pub fn event_from_draft(id: &EventId, draft: &EventDraft) -> CalendarEvent {
    CalendarEvent {
        id: id.clone(),
        title: draft.title.clone(),
        start: draft.start,
        end: draft.end,
        description: draft.description.clone(),
        location: draft.location.clone(),
        metadata: draft.metadata.clone(),
    }
}

/// A source that serves a fixed schedule, optionally failing first.
pub struct StaticSource {
    sessions: Mutex<Vec<Session>>,
    failures: Mutex<VecDeque<SyncError>>,
    pub fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(sessions: Vec<Session>) -> Self {
        StaticSource {
            sessions: Mutex::new(sessions),
            failures: Mutex::new(VecDeque::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, sessions: Vec<Session>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    pub fn fail_with(&self, errors: Vec<SyncError>) {
        self.failures.lock().unwrap().extend(errors);
    }
}

#[async_trait]
impl ScheduleSource for StaticSource {
    async fn fetch(&self, _query: &ScheduleQuery) -> SyncResult<Vec<Session>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.sessions.lock().unwrap().clone())
    }
}

pub fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

/// A 95 minute lecture on February `day`, 2024, starting at `time` Moscow time.
pub fn make_test_session(subject: &str, day: u32, time: &str) -> Session {
    let start = at(&format!("2024-02-{day:02}T{time}:00+03:00"));
    Session {
        group: "БИК2404".into(),
        subject: subject.into(),
        start,
        end: start + chrono::Duration::minutes(95),
        location: Location::Room {
            building: "Н".into(),
            room: "226".into(),
        },
        kind: SessionKind::Lecture,
        teacher: Some("Иванов И.И.".into()),
        subgroup: None,
    }
}

/// Config with a calendar id, no rate cap and fast deterministic retries.
pub fn make_test_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.calendar.calendar_id = Some("test-calendar".into());
    config.executor.requests_per_second = 0.0;
    config.executor.base_delay_ms = 1;
    config.executor.max_delay_ms = 5;
    config.executor.jitter = 0.0;
    config.executor.max_attempts = 3;
    config
}

pub fn make_test_query() -> ScheduleQuery {
    ScheduleQuery {
        group: "БИК2404".into(),
        building: "Н".into(),
        range: DateRange::from_args(Some("2024-02-12"), Some("2024-02-18"), 7).unwrap(),
    }
}

/// An event some other app put in the calendar.
pub fn foreign_event(id: &str, title: &str, day: u32) -> CalendarEvent {
    let start = at(&format!("2024-02-{day:02}T09:30:00+03:00")).with_timezone(&Utc);
    CalendarEvent {
        id: EventId(id.into()),
        title: title.into(),
        start,
        end: start + chrono::Duration::minutes(95),
        description: String::new(),
        location: "Н, ауд. 226".into(),
        metadata: BTreeMap::new(),
    }
}
