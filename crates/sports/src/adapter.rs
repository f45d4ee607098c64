use async_trait::async_trait;

use crate::error::AdapterError;
use crate::lifecycle::LifecycleState;
use crate::types::{Cursor, PlayByPlay, PlayByPlayQuery, ScheduleQuery, ScheduleSnapshot};

/// Provider-specific schedule and play-by-play source for one sport.
///
/// Everything sport-specific lives behind this trait; the scheduler, registry
/// and HTTP layer only ever see the normalized types.
#[async_trait]
pub trait SportAdapter: Send + Sync {
    /// Lowercase sport name, used as the topic prefix and in URLs
    fn name(&self) -> &str;

    async fn schedule(&self, query: &ScheduleQuery) -> Result<ScheduleSnapshot, AdapterError>;

    /// `Ok(None)` means the provider had nothing usable yet.
    async fn play_by_play(
        &self,
        query: &PlayByPlayQuery,
    ) -> Result<Option<PlayByPlay>, AdapterError>;

    /// Map a schedule status code to a lifecycle state.
    fn classify_status(&self, status_code: i64) -> LifecycleState;

    /// Cursor that selects everything from the start of an event.
    fn default_cursor(&self) -> Cursor;
}
