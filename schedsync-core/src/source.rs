//! Where class sessions come from.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::error::{SyncError, SyncResult};
use crate::identity::normalize_text;
use crate::session::Session;

/// What to fetch: one group's sessions in one building over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleQuery {
    pub group: String,
    pub building: String,
    pub range: DateRange,
}

/// Produces a complete snapshot of sessions for a query.
///
/// A failed fetch must be reported as an error, never as a shorter list:
/// the reconciler treats whatever comes back as the whole truth and would
/// delete everything missing from it.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch(&self, query: &ScheduleQuery) -> SyncResult<Vec<Session>>;
}

/// Reads sessions from a JSON snapshot on disk.
///
/// The snapshot may hold several groups and weeks. Only sessions of the
/// queried group that start inside the window are returned.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

#[async_trait]
impl ScheduleSource for FileSource {
    async fn fetch(&self, query: &ScheduleQuery) -> SyncResult<Vec<Session>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SyncError::SourceUnavailable(format!("Could not read {}: {e}", self.path.display()))
        })?;

        let sessions: Vec<Session> = serde_json::from_str(&content).map_err(|e| {
            SyncError::SourceUnavailable(format!("Could not parse {}: {e}", self.path.display()))
        })?;

        let selected = select(sessions, query);
        tracing::debug!(path = %self.path.display(), sessions = selected.len(), "Loaded schedule snapshot");
        Ok(selected)
    }
}

/// Keep the query's group and window, and resolve free-text rooms.
pub(crate) fn select(sessions: Vec<Session>, query: &ScheduleQuery) -> Vec<Session> {
    let group = normalize_text(&query.group);

    sessions
        .into_iter()
        .filter(|s| normalize_text(&s.group) == group)
        .filter(|s| query.range.contains(s.start.with_timezone(&Utc)))
        .map(|mut s| {
            s.location = s.location.resolve(&query.building);
            s
        })
        .collect()
}
