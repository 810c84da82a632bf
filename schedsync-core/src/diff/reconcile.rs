//! Diffing scraped sessions against the events already in the calendar.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::diff::{DeleteReason, DuplicateSessionWarning, Operation, Plan};
use crate::event::CalendarEvent;
use crate::identity::IdentityKey;
use crate::mapper::{EventMapper, MappedSession};
use crate::session::Session;

/// Compute the plan that makes `existing` mirror `sessions`.
///
/// Only events carrying a schedsync identity key take part. Everything else
/// in the calendar is counted and otherwise ignored.
pub fn reconcile(mapper: &EventMapper, sessions: &[Session], existing: &[CalendarEvent]) -> Plan {
    let mut plan = Plan::default();

    // Desired state, first occurrence wins
    let mut desired: Vec<MappedSession> = Vec::new();
    let mut desired_index: HashMap<IdentityKey, usize> = HashMap::new();

    for session in sessions {
        let mapped = match mapper.map(session) {
            Ok(mapped) => mapped,
            Err(invalid) => {
                plan.invalid.push(invalid);
                continue;
            }
        };

        match desired_index.entry(mapped.key.clone()) {
            Entry::Occupied(slot) => plan.duplicates.push(DuplicateSessionWarning {
                key: mapped.key,
                kept: desired[*slot.get()].session.label(),
                dropped: session.label(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(desired.len());
                desired.push(mapped);
            }
        }
    }

    // Observed state, restricted to events we own
    let mut owned: HashMap<IdentityKey, &CalendarEvent> = HashMap::new();

    for event in existing {
        let Some(key) = IdentityKey::from_event(event) else {
            plan.foreign_events += 1;
            continue;
        };

        match owned.entry(key) {
            Entry::Occupied(_) => plan.operations.push(Operation::Delete {
                event: event.clone(),
                reason: DeleteReason::Duplicate,
            }),
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
        }
    }

    for mapped in desired {
        let op = match owned.remove(&mapped.key) {
            None => Operation::Create(mapped),
            Some(event) if mapped.draft.matches(event) => Operation::Noop {
                event: event.clone(),
                mapped,
            },
            Some(event) => Operation::Update {
                event: event.clone(),
                mapped,
            },
        };
        plan.operations.push(op);
    }

    // Whatever is left has no session any more
    plan.operations
        .extend(owned.into_values().map(|event| Operation::Delete {
            event: event.clone(),
            reason: DeleteReason::Stale,
        }));

    plan.operations.sort_by(|a, b| {
        a.kind()
            .rank()
            .cmp(&b.kind().rank())
            .then_with(|| a.start().cmp(&b.start()))
            .then_with(|| a.title().cmp(b.title()))
    });

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::OperationKind;
    use crate::event::{EventId, IDENTITY_PROPERTY};
    use crate::session::{Location, SessionKind};
    use chrono::{DateTime, Duration};
    use std::collections::BTreeMap;

    fn mapper() -> EventMapper {
        EventMapper::new("Europe/Moscow")
    }

    fn make_test_session(subject: &str, day: u32) -> Session {
        let start = DateTime::parse_from_rfc3339(&format!("2024-02-{day:02}T09:30:00+03:00")).unwrap();
        Session {
            group: "БИК2404".into(),
            subject: subject.into(),
            start,
            end: start + Duration::minutes(95),
            location: Location::Room {
                building: "Н".into(),
                room: "226".into(),
            },
            kind: SessionKind::Lecture,
            teacher: Some("Иванов И.И.".into()),
            subgroup: None,
        }
    }

    /// The event the store would hold after creating `session`.
    fn stored(session: &Session, id: &str) -> CalendarEvent {
        let mapped = mapper().map(session).unwrap();
        CalendarEvent {
            id: EventId(id.into()),
            title: mapped.draft.title,
            start: mapped.draft.start,
            end: mapped.draft.end,
            description: mapped.draft.description,
            location: mapped.draft.location,
            metadata: mapped.draft.metadata,
        }
    }

    fn foreign(title: &str) -> CalendarEvent {
        let session = make_test_session(title, 12);
        let mut event = stored(&session, "foreign");
        event.metadata = BTreeMap::from([("other_app".to_string(), "1".to_string())]);
        event
    }

    fn kinds(plan: &Plan) -> Vec<OperationKind> {
        plan.operations.iter().map(Operation::kind).collect()
    }

    #[test]
    fn test_new_sessions_are_created() {
        let sessions = vec![make_test_session("Физика", 12), make_test_session("Химия", 13)];
        let plan = reconcile(&mapper(), &sessions, &[]);
        assert_eq!(kinds(&plan), vec![OperationKind::Create, OperationKind::Create]);
    }

    #[test]
    fn test_unchanged_events_are_noops() {
        let sessions = vec![make_test_session("Физика", 12)];
        let existing = vec![stored(&sessions[0], "e1")];
        let plan = reconcile(&mapper(), &sessions, &existing);
        assert_eq!(kinds(&plan), vec![OperationKind::Noop]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_teacher_change_is_update() {
        let before = make_test_session("Физика", 12);
        let existing = vec![stored(&before, "e1")];

        let mut after = before.clone();
        after.teacher = Some("Петров П.П.".into());
        let plan = reconcile(&mapper(), &[after], &existing);

        assert_eq!(kinds(&plan), vec![OperationKind::Update]);
        assert_eq!(plan.operations[0].event_id(), Some(&EventId("e1".into())));
        assert_eq!(plan.operations[0].changed_fields(), vec!["description"]);
    }

    #[test]
    fn test_start_change_is_delete_and_create() {
        let before = make_test_session("Физика", 12);
        let existing = vec![stored(&before, "e1")];

        let mut after = before.clone();
        after.start = after.start + Duration::minutes(10);
        let plan = reconcile(&mapper(), &[after], &existing);

        assert_eq!(kinds(&plan), vec![OperationKind::Delete, OperationKind::Create]);
        assert_eq!(plan.operations[0].event_id(), Some(&EventId("e1".into())));
    }

    #[test]
    fn test_foreign_events_are_never_touched() {
        let sessions = vec![make_test_session("Физика", 12)];
        let existing = vec![foreign("Физика"), foreign("Стоматолог")];
        let plan = reconcile(&mapper(), &sessions, &existing);

        assert_eq!(kinds(&plan), vec![OperationKind::Create]);
        assert_eq!(plan.foreign_events, 2);
        assert!(plan.operations.iter().all(|op| op.target().is_none()));
    }

    #[test]
    fn test_malformed_key_counts_as_foreign() {
        let session = make_test_session("Физика", 12);
        let mut event = stored(&session, "e1");
        event
            .metadata
            .insert(IDENTITY_PROPERTY.to_string(), "handwritten".to_string());
        let plan = reconcile(&mapper(), &[], &[event]);
        assert!(plan.operations.is_empty());
        assert_eq!(plan.foreign_events, 1);
    }

    #[test]
    fn test_empty_schedule_deletes_every_owned_event() {
        let existing: Vec<_> = (12..15)
            .map(|day| stored(&make_test_session("Физика", day), &format!("e{day}")))
            .chain(std::iter::once(foreign("Стоматолог")))
            .collect();
        let plan = reconcile(&mapper(), &[], &existing);

        let counts = plan.counts();
        assert_eq!(counts.delete, 3);
        assert_eq!(counts.create + counts.update, 0);
        assert!(plan.deletes_everything());
    }

    #[test]
    fn test_duplicate_sessions_create_once_and_warn() {
        let session = make_test_session("Физика", 12);
        let mut twin = session.clone();
        twin.teacher = Some("Другой".into());
        let plan = reconcile(&mapper(), &[session, twin], &[]);

        assert_eq!(kinds(&plan), vec![OperationKind::Create]);
        assert_eq!(plan.duplicates.len(), 1);
        match &plan.operations[0] {
            Operation::Create(mapped) => {
                assert_eq!(mapped.session.teacher.as_deref(), Some("Иванов И.И."), "first occurrence wins")
            }
            other => panic!("expected create, got {other}"),
        }
    }

    #[test]
    fn test_duplicate_owned_events_keep_first() {
        let session = make_test_session("Физика", 12);
        let existing = vec![stored(&session, "e1"), stored(&session, "e2")];
        let plan = reconcile(&mapper(), &[session], &existing);

        assert_eq!(kinds(&plan), vec![OperationKind::Delete, OperationKind::Noop]);
        assert!(matches!(
            &plan.operations[0],
            Operation::Delete { event, reason: DeleteReason::Duplicate } if event.id.as_str() == "e2"
        ));
    }

    #[test]
    fn test_invalid_sessions_are_reported_not_planned() {
        let mut broken = make_test_session("Физика", 12);
        broken.end = broken.start - Duration::minutes(1);
        let plan = reconcile(&mapper(), &[broken, make_test_session("Химия", 13)], &[]);

        assert_eq!(plan.invalid.len(), 1);
        assert_eq!(kinds(&plan), vec![OperationKind::Create]);
    }

    #[test]
    fn test_updates_are_ordered_by_start() {
        let sessions: Vec<_> = [15, 12, 14, 13]
            .into_iter()
            .map(|day| make_test_session("Физика", day))
            .collect();
        let existing: Vec<_> = sessions
            .iter()
            .map(|s| {
                let mut event = stored(s, &format!("e{}", s.start));
                event.description = "stale".into();
                event
            })
            .collect();
        let plan = reconcile(&mapper(), &sessions, &existing);

        let starts: Vec<_> = plan.operations.iter().map(Operation::start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(plan.counts().update, 4);
    }

    #[test]
    fn test_second_reconcile_after_apply_is_all_noop() {
        let sessions = vec![make_test_session("Физика", 12), make_test_session("Химия", 13)];
        let first = reconcile(&mapper(), &sessions, &[]);

        let after_apply: Vec<_> = first
            .operations
            .iter()
            .enumerate()
            .filter_map(|(i, op)| match op {
                Operation::Create(mapped) => Some(stored(&mapped.session, &format!("e{i}"))),
                _ => None,
            })
            .collect();

        let second = reconcile(&mapper(), &sessions, &after_apply);
        assert!(second.operations.iter().all(|op| op.kind() == OperationKind::Noop));
        assert_eq!(second.operations.len(), 2);
    }
}
