//! Event watch scheduler.
//!
//! Periodically asks every adapter for today's schedule, starts a watcher
//! (and creates a topic) for each newly listed event that has not finished,
//! and retires watchers whose event has dropped off its sport's schedule.

mod watcher;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use sportcast_broker::{TopicId, TopicRegistry};
use sportcast_sports::{ScheduleQuery, ScheduleSnapshot, SportAdapter, SportCatalog};

use crate::archive::SnapshotArchive;

pub use watcher::{EventWatchState, WatchOutcome, Watcher, UPDATE_KIND};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub discovery_interval: Duration,
    pub poll_interval: Duration,
}

struct WatcherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<WatchOutcome>,
}

/// A watcher stopped because its event left the schedule.
pub struct RetiredWatcher {
    pub topic: TopicId,
    pub task: JoinHandle<WatchOutcome>,
}

/// What one discovery run changed.
#[derive(Default)]
pub struct DiscoveryReport {
    pub started: Vec<TopicId>,
    pub retired: Vec<RetiredWatcher>,
    /// Sports whose schedule could not be fetched; their watchers were left alone
    pub failed_sports: Vec<String>,
}

pub struct EventWatchScheduler {
    registry: TopicRegistry,
    catalog: SportCatalog,
    archive: Arc<dyn SnapshotArchive>,
    settings: WatchSettings,
    watchers: HashMap<TopicId, WatcherHandle>,
}

impl EventWatchScheduler {
    pub fn new(
        registry: TopicRegistry,
        catalog: SportCatalog,
        archive: Arc<dyn SnapshotArchive>,
        settings: WatchSettings,
    ) -> Self {
        Self {
            registry,
            catalog,
            archive,
            settings,
            watchers: HashMap::new(),
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Discover immediately, then once per discovery interval until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.settings.discovery_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = watcher::stopped(&mut shutdown) => break,
                _ = ticker.tick() => {
                    let report = self.discover().await;
                    info!(
                        started = report.started.len(),
                        retired = report.retired.len(),
                        failed_sports = ?report.failed_sports,
                        tracked = self.watchers.len(),
                        "discovery complete"
                    );
                }
            }
        }

        self.stop_all().await;
    }

    /// Topics with a watcher, including finished watchers still on the schedule.
    pub fn tracked(&self) -> Vec<TopicId> {
        let mut topics: Vec<TopicId> = self.watchers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_tracking(&self, topic: &TopicId) -> bool {
        self.watchers.contains_key(topic)
    }

    pub async fn discover(&mut self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let adapters: Vec<Arc<dyn SportAdapter>> = self.catalog.iter().cloned().collect();

        for adapter in adapters {
            match adapter.schedule(&ScheduleQuery::today()).await {
                Ok(snapshot) => self.reconcile(&adapter, snapshot, &mut report),
                Err(e) => {
                    warn!(sport = adapter.name(), error = %e, "schedule fetch failed, keeping current watchers");
                    report.failed_sports.push(adapter.name().to_string());
                }
            }
        }

        report
    }

    fn reconcile(
        &mut self,
        adapter: &Arc<dyn SportAdapter>,
        snapshot: ScheduleSnapshot,
        report: &mut DiscoveryReport,
    ) {
        let sport = adapter.name().to_lowercase();
        let date = snapshot.date;
        let mut listed = HashSet::new();

        for event in snapshot.events {
            let topic = TopicId::new(&sport, &event.event_id);
            listed.insert(topic.clone());
            if self.watchers.contains_key(&topic) {
                continue;
            }

            let lifecycle = adapter.classify_status(event.status_code);
            if !lifecycle.is_trackable() {
                debug!(topic = %topic, lifecycle = %lifecycle, "not tracking event");
                continue;
            }

            self.registry.create_topic(topic.clone());
            let watcher = Watcher::new(
                topic.clone(),
                event,
                date,
                Arc::clone(adapter),
                self.registry.clone(),
                Arc::clone(&self.archive),
                self.settings.poll_interval,
            );
            let (stop, stop_rx) = watch::channel(false);
            let task = tokio::spawn(watcher.run(stop_rx));
            info!(topic = %topic, "watching event");
            self.watchers.insert(topic.clone(), WatcherHandle { stop, task });
            report.started.push(topic);
        }

        let unlisted: Vec<TopicId> = self
            .watchers
            .keys()
            .filter(|topic| topic.sport() == sport && !listed.contains(*topic))
            .cloned()
            .collect();
        for topic in unlisted {
            if let Some(handle) = self.watchers.remove(&topic) {
                info!(topic = %topic, "event left the schedule, retiring watcher");
                self.registry.destroy_topic(topic.clone());
                let _ = handle.stop.send(true);
                report.retired.push(RetiredWatcher {
                    topic,
                    task: handle.task,
                });
            }
        }
    }

    async fn stop_all(&mut self) {
        for (topic, handle) in self.watchers.drain() {
            self.registry.destroy_topic(topic.clone());
            let _ = handle.stop.send(true);
            if let Err(e) = handle.task.await {
                warn!(topic = %topic, error = %e, "watcher task failed");
            }
        }
        info!("scheduler stopped");
    }
}
