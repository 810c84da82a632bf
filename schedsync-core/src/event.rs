//! Calendar event types shared between the reconciler and calendar stores.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Private metadata property holding the identity key.
///
/// Google stores it under `extendedProperties.private`, which is invisible
/// to other calendar clients and survives edits made in the UI.
pub const IDENTITY_PROPERTY: &str = "schedsync_key";

/// Provider-assigned event id. Opaque to schedsync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        EventId(value.to_string())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event as it currently exists in the remote calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    /// Private key/value metadata. Never shown to the calendar user.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CalendarEvent {
    /// The raw identity property, if this event carries one.
    pub fn identity_property(&self) -> Option<&str> {
        self.metadata.get(IDENTITY_PROPERTY).map(String::as_str)
    }

    pub fn render_event_time(&self) -> String {
        render_time_span(self.start, self.end)
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// The event content schedsync wants a session to have in the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
    pub location: String,
    /// IANA zone the provider should display the event in.
    pub time_zone: String,
    pub metadata: BTreeMap<String, String>,
}

impl EventDraft {
    /// Exact comparison of the user-visible content against a stored event.
    ///
    /// Only title, start, end, location and description take part. Metadata
    /// already matched through the identity key.
    pub fn matches(&self, event: &CalendarEvent) -> bool {
        self.title == event.title
            && self.start == event.start
            && self.end == event.end
            && self.location == event.location
            && self.description == event.description
    }

    /// Names of the fields that differ from the stored event.
    pub fn changed_fields(&self, event: &CalendarEvent) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title != event.title {
            fields.push("title");
        }
        if self.start != event.start {
            fields.push("start");
        }
        if self.end != event.end {
            fields.push("end");
        }
        if self.location != event.location {
            fields.push("location");
        }
        if self.description != event.description {
            fields.push("description");
        }
        fields
    }

    pub fn render_event_time(&self) -> String {
        render_time_span(self.start, self.end)
    }
}

impl fmt::Display for EventDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

fn render_time_span(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    if start.date_naive() == end.date_naive() {
        format!("{} - {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M UTC"))
    } else {
        format!("{} - {}", start.format("%Y-%m-%d %H:%M"), end.format("%Y-%m-%d %H:%M UTC"))
    }
}
