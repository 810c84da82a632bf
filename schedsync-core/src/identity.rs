//! Identity keys join scraped sessions to the calendar events created for them.
//!
//! A key is derived only from the fields that identify an occurrence:
//! group, subject, start, end and location. Teacher, kind and subgroup may
//! change without the session becoming a different one. The inputs are
//! normalized first so that whitespace, casing and UTC offset differences
//! coming from the portal do not produce churn.

use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use sha2::{Digest, Sha256};

use crate::event::CalendarEvent;
use crate::session::{Location, Session};

const KEY_VERSION: &str = "v1";
const FIELD_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn derive(session: &Session) -> Self {
        let canonical = [
            normalize_text(&session.group),
            normalize_text(&session.subject),
            normalize_instant(&session.start),
            normalize_instant(&session.end),
            normalize_location(&session.location),
        ]
        .join(&FIELD_SEPARATOR.to_string());

        let digest = Sha256::digest(canonical.as_bytes());
        IdentityKey(format!("{KEY_VERSION}:{}", hex::encode(digest)))
    }

    /// Parse a stored key. Anything not shaped like a key this crate wrote
    /// is rejected, so foreign metadata never counts as ownership.
    pub fn parse(raw: &str) -> Option<Self> {
        let digest = raw.strip_prefix(KEY_VERSION)?.strip_prefix(':')?;
        let well_formed = digest.len() == 64
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| IdentityKey(raw.to_string()))
    }

    /// The key stored on an event, if the event was written by schedsync.
    pub fn from_event(event: &CalendarEvent) -> Option<Self> {
        event.identity_property().and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trim, collapse inner whitespace and case-fold.
pub fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_instant<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn normalize_location(location: &Location) -> String {
    match location {
        Location::Room { building, room } => {
            format!("room:{}/{}", normalize_text(building), normalize_text(room))
        }
        Location::Text(text) => format!("text:{}", normalize_text(text)),
    }
}
