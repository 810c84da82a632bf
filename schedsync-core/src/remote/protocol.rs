//! Defines the JSON protocol used for communication between schedsync
//! and provider binaries over stdin/stdout.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::{CalendarEvent, EventDraft, EventId};
use crate::session::Session;

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    EnsureCalendar,
    ListEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    FetchSchedule,
}

/// Request sent from schedsync to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// How a provider classifies a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network error or 5xx. Worth retrying.
    Transient,
    /// 429 or quota exceeded. Worth retrying after `retry_after_secs`.
    RateLimited,
    /// Anything else, including errors from providers that do not classify.
    #[default]
    Permanent,
}

/// Response sent from a provider to schedsync.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        #[serde(default)]
        kind: ErrorKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_secs: Option<u64>,
    },
}

/// Make sure the calendar exists, creating it when missing.
/// Returns the id to use from now on.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnsureCalendar {
    pub calendar_id: String,
    pub calendar_name: String,
    pub time_zone: String,
}

impl ProviderCommand for EnsureCalendar {
    type Response = String;
    fn command() -> Command {
        Command::EnsureCalendar
    }
}

/// List events within a time range.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    pub calendar_id: String,
    pub from: String,
    pub to: String,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<CalendarEvent>;
    fn command() -> Command {
        Command::ListEvents
    }
}

/// Create a new event.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    pub calendar_id: String,
    pub event: EventDraft,
}

impl ProviderCommand for CreateEvent {
    type Response = EventId;
    fn command() -> Command {
        Command::CreateEvent
    }
}

/// Replace the content of an existing event.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub calendar_id: String,
    pub event_id: EventId,
    pub event: EventDraft,
}

impl ProviderCommand for UpdateEvent {
    type Response = ();
    fn command() -> Command {
        Command::UpdateEvent
    }
}

/// Delete an event by ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub calendar_id: String,
    pub event_id: EventId,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}

/// Scrape one group's schedule.
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchSchedule {
    pub group: String,
    pub building: String,
    pub from: String,
    pub to: String,
}

impl ProviderCommand for FetchSchedule {
    type Response = Vec<Session>;
    fn command() -> Command {
        Command::FetchSchedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_defaults_to_permanent() {
        let response: Response<()> = serde_json::from_str(r#"{"status": "error", "error": "boom"}"#).unwrap();
        match response {
            Response::Error { kind, retry_after_secs, .. } => {
                assert_eq!(kind, ErrorKind::Permanent);
                assert_eq!(retry_after_secs, None);
            }
            Response::Success { .. } => panic!("expected error"),
        }
    }

    #[test]
    fn test_rate_limited_response() {
        let response: Response<()> = serde_json::from_str(
            r#"{"status": "error", "error": "quota", "kind": "rate_limited", "retry_after_secs": 12}"#,
        )
        .unwrap();
        assert!(matches!(
            response,
            Response::Error { kind: ErrorKind::RateLimited, retry_after_secs: Some(12), .. }
        ));
    }

    #[test]
    fn test_request_shape() {
        let request = Request {
            command: DeleteEvent::command(),
            params: serde_json::to_value(DeleteEvent {
                calendar_id: "primary".into(),
                event_id: "abc".into(),
            })
            .unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "command": "delete_event",
                "params": {"calendar_id": "primary", "event_id": "abc"}
            })
        );
    }
}
