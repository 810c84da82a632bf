use std::fmt;

use chrono::{DateTime, Utc};

use crate::diff::OperationKind;
use crate::event::{CalendarEvent, EventId};
use crate::mapper::MappedSession;

/// Why an owned event is scheduled for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    /// No scraped session carries this key any more.
    Stale,
    /// Another owned event already carries the same key.
    Duplicate,
}

/// One step of a reconciliation plan. Consumed once by the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create(MappedSession),
    Update {
        event: CalendarEvent,
        mapped: MappedSession,
    },
    Delete {
        event: CalendarEvent,
        reason: DeleteReason,
    },
    Noop {
        event: CalendarEvent,
        mapped: MappedSession,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create(_) => OperationKind::Create,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Noop { .. } => OperationKind::Noop,
        }
    }

    /// The existing calendar event this operation targets.
    pub fn target(&self) -> Option<&CalendarEvent> {
        match self {
            Operation::Create(_) => None,
            Operation::Update { event, .. }
            | Operation::Delete { event, .. }
            | Operation::Noop { event, .. } => Some(event),
        }
    }

    pub fn event_id(&self) -> Option<&EventId> {
        self.target().map(|event| &event.id)
    }

    /// Start time used for ordering. Prefers the desired state.
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Operation::Create(mapped)
            | Operation::Update { mapped, .. }
            | Operation::Noop { mapped, .. } => mapped.draft.start,
            Operation::Delete { event, .. } => event.start,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Operation::Create(mapped)
            | Operation::Update { mapped, .. }
            | Operation::Noop { mapped, .. } => &mapped.draft.title,
            Operation::Delete { event, .. } => &event.title,
        }
    }

    pub fn render_event_time(&self) -> String {
        match self {
            Operation::Create(mapped)
            | Operation::Update { mapped, .. }
            | Operation::Noop { mapped, .. } => mapped.draft.render_event_time(),
            Operation::Delete { event, .. } => event.render_event_time(),
        }
    }

    /// Fields an update would change. Empty for other kinds.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        match self {
            Operation::Update { event, mapped } => mapped.draft.changed_fields(event),
            _ => Vec::new(),
        }
    }

    /// Short label for logs and failure reports.
    pub fn label(&self) -> String {
        format!("{} {}", self.title(), self.start().format("%Y-%m-%d %H:%M"))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.label())
    }
}
