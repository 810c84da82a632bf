//! Maps scraped sessions to calendar event drafts.

use std::collections::BTreeMap;

use chrono::Utc;
use thiserror::Error;

use crate::event::{EventDraft, IDENTITY_PROPERTY};
use crate::identity::IdentityKey;
use crate::session::Session;

/// A session that cannot be turned into an event.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{label}: {reason}")]
pub struct InvalidSession {
    pub label: String,
    pub reason: InvalidReason,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidReason {
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("end time must be after start time")]
    NonPositiveDuration,
}

/// A session together with its event draft and identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedSession {
    pub session: Session,
    pub draft: EventDraft,
    pub key: IdentityKey,
}

/// Translates sessions into the calendar's event representation.
#[derive(Debug, Clone)]
pub struct EventMapper {
    time_zone: String,
}

impl EventMapper {
    pub fn new(time_zone: impl Into<String>) -> Self {
        EventMapper {
            time_zone: time_zone.into(),
        }
    }

    pub fn map(&self, session: &Session) -> Result<MappedSession, InvalidSession> {
        validate(session)?;

        let key = IdentityKey::derive(session);
        let metadata = BTreeMap::from([(IDENTITY_PROPERTY.to_string(), key.to_string())]);

        let draft = EventDraft {
            title: format!("{} ({})", collapse(&session.subject), session.kind.label()),
            start: session.start.with_timezone(&Utc),
            end: session.end.with_timezone(&Utc),
            description: describe(session),
            location: session.location.to_string(),
            time_zone: self.time_zone.clone(),
            metadata,
        };

        Ok(MappedSession {
            session: session.clone(),
            draft,
            key,
        })
    }
}

fn validate(session: &Session) -> Result<(), InvalidSession> {
    let invalid = |reason| InvalidSession {
        label: session.label(),
        reason,
    };

    if session.group.trim().is_empty() {
        return Err(invalid(InvalidReason::EmptyField("group")));
    }
    if session.subject.trim().is_empty() {
        return Err(invalid(InvalidReason::EmptyField("subject")));
    }
    if session.location.is_empty() {
        return Err(invalid(InvalidReason::EmptyField("location")));
    }
    if session.start >= session.end {
        return Err(invalid(InvalidReason::NonPositiveDuration));
    }

    Ok(())
}

fn describe(session: &Session) -> String {
    let mut lines = vec![format!("Тип: {}", session.kind.label())];

    if let Some(teacher) = session.teacher.as_deref().map(collapse).filter(|t| !t.is_empty()) {
        lines.push(format!("Преподаватель: {teacher}"));
    }
    lines.push(format!("Группа: {}", collapse(&session.group)));
    if let Some(subgroup) = session.subgroup {
        lines.push(format!("Подгруппа: {subgroup}"));
    }

    lines.join("\n")
}

fn collapse(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
