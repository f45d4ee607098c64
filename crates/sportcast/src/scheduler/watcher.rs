//! Per-event watcher: waits for the start time, then polls play-by-play and
//! publishes each successful poll to the event's topic until it completes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use sportcast_broker::{Envelope, TopicId, TopicRegistry};
use sportcast_sports::{
    apply_event, Cursor, LifecycleEvent, LifecycleState, PlayByPlayQuery, ScheduleEntry,
    SportAdapter,
};

use crate::archive::{ArchivedSnapshot, SnapshotArchive};
use crate::metrics;

/// Message type of scheduled updates.
pub const UPDATE_KIND: &str = "update";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWatchState {
    pub lifecycle: LifecycleState,
    pub cursor: Cursor,
    pub current_period: u32,
}

impl EventWatchState {
    pub fn new(cursor: Cursor) -> Self {
        Self {
            lifecycle: LifecycleState::Preview,
            cursor,
            current_period: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The event finished and its topic was destroyed
    Completed,
    /// Stopped by the scheduler
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Skipped,
    Published(LifecycleState),
}

pub struct Watcher {
    topic: TopicId,
    event: ScheduleEntry,
    schedule_date: NaiveDate,
    adapter: Arc<dyn SportAdapter>,
    registry: TopicRegistry,
    archive: Arc<dyn SnapshotArchive>,
    poll_interval: Duration,
    state: EventWatchState,
    sequence: i64,
}

impl Watcher {
    pub fn new(
        topic: TopicId,
        event: ScheduleEntry,
        schedule_date: NaiveDate,
        adapter: Arc<dyn SportAdapter>,
        registry: TopicRegistry,
        archive: Arc<dyn SnapshotArchive>,
        poll_interval: Duration,
    ) -> Self {
        let state = EventWatchState::new(adapter.default_cursor());
        Self {
            topic,
            event,
            schedule_date,
            adapter,
            registry,
            archive,
            poll_interval,
            state,
            sequence: 0,
        }
    }

    pub fn state(&self) -> &EventWatchState {
        &self.state
    }

    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> WatchOutcome {
        metrics::watcher_started();
        let outcome = self.watch(&mut stop).await;
        metrics::watcher_finished();
        info!(
            topic = %self.topic,
            outcome = ?outcome,
            lifecycle = %self.state.lifecycle,
            "watcher finished"
        );
        outcome
    }

    async fn watch(&mut self, stop: &mut watch::Receiver<bool>) -> WatchOutcome {
        let delay = (self.event.start_time - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if !delay.is_zero() {
            info!(topic = %self.topic, wait_secs = delay.as_secs(), "waiting for event start");
            tokio::select! {
                biased;
                _ = stopped(stop) => return WatchOutcome::Stopped,
                _ = sleep(delay) => {}
            }
        }

        match apply_event(self.state.lifecycle, &LifecycleEvent::StartTimeReached) {
            Ok(next) => self.transition(next),
            Err(e) => warn!(topic = %self.topic, error = %e, "start transition rejected"),
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = stopped(stop) => return WatchOutcome::Stopped,
                _ = ticker.tick() => {}
            }

            if self.poll_step().await == PollOutcome::Published(LifecycleState::Complete) {
                // Let the final update reach subscribers before the topic goes away.
                self.registry.flush(self.topic.clone()).await;
                self.registry.destroy_topic(self.topic.clone());
                return WatchOutcome::Completed;
            }
        }
    }

    async fn poll_step(&mut self) -> PollOutcome {
        let sport = self.adapter.name().to_string();
        let query = PlayByPlayQuery {
            event_id: self.event.event_id.clone(),
            date: Some(self.schedule_date),
            cursor: self.state.cursor.clone(),
            current_period: self.state.current_period,
        };

        let result = match self.adapter.play_by_play(&query).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                debug!(topic = %self.topic, "no play-by-play available yet");
                metrics::poll(&sport, "skipped");
                return PollOutcome::Skipped;
            }
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "play-by-play poll failed");
                metrics::poll(&sport, "skipped");
                return PollOutcome::Skipped;
            }
        };

        let observed = LifecycleEvent::Observed(result.metadata.lifecycle);
        let next = match apply_event(self.state.lifecycle, &observed) {
            Ok(next) => next,
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "ignoring poll result");
                metrics::poll(&sport, "skipped");
                return PollOutcome::Skipped;
            }
        };

        self.state.cursor = result.metadata.cursor;
        if let Some(period) = result.metadata.current_period {
            self.state.current_period = period;
        }
        self.transition(next);

        self.sequence += 1;
        let contents = if next == LifecycleState::Intermission {
            json!({"contents": "intermission"})
        } else {
            result.payload.clone()
        };
        self.registry.publish(
            self.topic.clone(),
            Envelope::new(UPDATE_KIND, contents).with_id(self.sequence),
        );

        let snapshot = ArchivedSnapshot {
            ts: Utc::now(),
            topic: self.topic.clone(),
            lifecycle: next,
            sequence: self.sequence,
            payload: result.payload,
        };
        if let Err(e) = self.archive.store(&snapshot).await {
            warn!(topic = %self.topic, error = %e, "failed to archive snapshot");
        }

        metrics::poll(&sport, "published");
        PollOutcome::Published(next)
    }

    fn transition(&mut self, next: LifecycleState) {
        if next != self.state.lifecycle {
            info!(
                topic = %self.topic,
                from = %self.state.lifecycle,
                to = %next,
                "lifecycle transition"
            );
            metrics::lifecycle_transition(self.adapter.name(), next);
        }
        self.state.lifecycle = next;
    }
}

/// Resolves once a stop is signalled or the scheduler is gone.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    // An error means the sender was dropped, which also means stop.
    let _ = stop.wait_for(|stop| *stop).await;
}
