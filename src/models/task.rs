use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work the user tracks time against.
///
/// `time_spent_ms` only grows: the stopwatch commits elapsed time through the
/// flush rule in `timer::state`, and nothing ever decrements it short of
/// deleting the whole record. At most one task is `is_active` system-wide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub time_spent_ms: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh task. Titles are trimmed; an empty title is rejected.
    pub fn new(title: &str, created_at: DateTime<Utc>) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            completed: false,
            time_spent_ms: 0,
            is_active: false,
            created_at,
        })
    }
}
