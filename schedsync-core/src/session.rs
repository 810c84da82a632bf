//! Class sessions as reported by the schedule source.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One scheduled class occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub group: String,
    pub subject: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub location: Location,
    pub kind: SessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<u8>,
}

impl Session {
    /// Short human label used in logs and failure reports.
    pub fn label(&self) -> String {
        format!("{} @ {}", self.subject.trim(), self.start.format("%Y-%m-%d %H:%M"))
    }
}

/// Where a session takes place.
///
/// The portal reports rooms as `<building>-<room>` most of the time, but
/// online classes and sports halls come through as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Room { building: String, room: String },
    Text(String),
}

const ROOM_PREFIX: &str = "Аудитория:";

impl Location {
    /// Turn a free-text location into a structured room where the text
    /// follows one of the portal's known shapes.
    pub fn resolve(self, default_building: &str) -> Location {
        let Location::Text(text) = self else {
            return self;
        };

        let text = text.replace(ROOM_PREFIX, "");
        let text = text.trim();
        let lower = text.to_lowercase();

        if text.is_empty() {
            return Location::Text(String::new());
        }
        if lower == "онлайн" || lower == "online" {
            return Location::Text("Online".to_string());
        }
        if lower.contains("зал") {
            return Location::Room {
                building: default_building.to_string(),
                room: text.to_string(),
            };
        }
        if let Some((building, room)) = text.split_once('-') {
            return Location::Room {
                building: building.trim().to_string(),
                room: room.trim().to_string(),
            };
        }

        Location::Room {
            building: default_building.to_string(),
            room: text.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Location::Room { building, room } => building.trim().is_empty() || room.trim().is_empty(),
            Location::Text(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Room { building, room } => {
                write!(f, "{}, ауд. {}", building.trim(), room.trim())
            }
            Location::Text(text) => write!(f, "{}", text.trim()),
        }
    }
}

/// Kind of class. Accepts both the English names and the portal's labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionKind {
    Lecture,
    Seminar,
    Lab,
    Exam,
    Other,
}

impl SessionKind {
    /// Label shown in calendar event titles.
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Lecture => "Лекция",
            SessionKind::Seminar => "Практическое занятие",
            SessionKind::Lab => "Лабораторная работа",
            SessionKind::Exam => "Экзамен",
            SessionKind::Other => "Занятие",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Lecture => "lecture",
            SessionKind::Seminar => "seminar",
            SessionKind::Lab => "lab",
            SessionKind::Exam => "exam",
            SessionKind::Other => "other",
        }
    }
}

impl From<String> for SessionKind {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "lecture" | "лекция" => SessionKind::Lecture,
            "seminar" | "practice" | "практическое занятие" => SessionKind::Seminar,
            "lab" | "лабораторная работа" => SessionKind::Lab,
            "exam" | "экзамен" => SessionKind::Exam,
            _ => SessionKind::Other,
        }
    }
}

impl From<SessionKind> for String {
    fn from(kind: SessionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_building_room_pair() {
        let location = Location::Text("Аудитория: Н-226".into()).resolve("Н");
        assert_eq!(
            location,
            Location::Room {
                building: "Н".into(),
                room: "226".into()
            }
        );
        assert_eq!(location.to_string(), "Н, ауд. 226");
    }

    #[test]
    fn test_resolve_online_and_hall() {
        assert_eq!(
            Location::Text("онлайн".into()).resolve("Н"),
            Location::Text("Online".into())
        );
        assert_eq!(
            Location::Text("Спортивный зал".into()).resolve("А"),
            Location::Room {
                building: "А".into(),
                room: "Спортивный зал".into()
            }
        );
    }

    #[test]
    fn test_resolve_keeps_structured_location() {
        let room = Location::Room {
            building: "Л".into(),
            room: "101".into(),
        };
        assert_eq!(room.clone().resolve("Н"), room);
    }

    #[test]
    fn test_kind_accepts_portal_labels() {
        let kinds: Vec<SessionKind> =
            serde_json::from_str(r#"["Лекция", "practice", "Лабораторная работа", "exam", "консультация"]"#)
                .unwrap();
        assert_eq!(
            kinds,
            vec![
                SessionKind::Lecture,
                SessionKind::Seminar,
                SessionKind::Lab,
                SessionKind::Exam,
                SessionKind::Other
            ]
        );
    }

    #[test]
    fn test_session_deserializes_both_location_shapes() {
        let json = r#"[
            {"group": "БИК2404", "subject": "Физика", "start": "2024-02-12T09:30:00+03:00",
             "end": "2024-02-12T11:05:00+03:00", "location": {"building": "Н", "room": "310"},
             "kind": "lecture", "teacher": "Иванов И.И."},
            {"group": "БИК2404", "subject": "Физика", "start": "2024-02-13T09:30:00+03:00",
             "end": "2024-02-13T11:05:00+03:00", "location": "Online", "kind": "lab"}
        ]"#;
        let sessions: Vec<Session> = serde_json::from_str(json).unwrap();
        assert!(matches!(sessions[0].location, Location::Room { .. }));
        assert_eq!(sessions[1].location, Location::Text("Online".into()));
        assert_eq!(sessions[1].teacher, None);
    }
}
