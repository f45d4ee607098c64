//! Provider-normalized schedule and play-by-play types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lifecycle::LifecycleState;

/// Opaque incremental-fetch marker.
///
/// Adapters normalize their provider's progress marker so that lexicographic
/// order matches the order in which data was produced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleQuery {
    /// Provider's current day when `None`
    pub date: Option<NaiveDate>,
}

impl ScheduleQuery {
    pub fn today() -> Self {
        Self::default()
    }

    pub fn on(date: NaiveDate) -> Self {
        Self { date: Some(date) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub event_id: String,
    pub start_time: DateTime<Utc>,
    pub status_code: i64,
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub sport: String,
    /// Day the provider resolved the query to
    pub date: NaiveDate,
    pub events: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayByPlayQuery {
    pub event_id: String,
    /// Schedule day the event was listed under, provider's current day when `None`
    pub date: Option<NaiveDate>,
    pub cursor: Cursor,
    /// 0 requests the whole event
    pub current_period: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollMetadata {
    pub lifecycle: LifecycleState,
    pub cursor: Cursor,
    pub current_period: Option<u32>,
}

/// Incremental update since the query's cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayByPlay {
    pub payload: Value,
    pub metadata: PollMetadata,
}
