//! Shared fakes for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use sportcast_broker::{ClientId, ClientSink, Envelope, TopicId, TopicRegistry};
use sportcast_sports::{
    AdapterError, Cursor, LifecycleState, PlayByPlay, PlayByPlayQuery, PollMetadata,
    ScheduleEntry, ScheduleQuery, ScheduleSnapshot, SportAdapter,
};

use crate::error::GatewayError;
use crate::gateway::Outbound;

#[derive(Debug)]
pub enum OutboundEvent {
    Text(String),
    Ping,
    /// Carries the probed topic's subscribers at the moment of closing
    Closed(Option<Vec<ClientId>>),
}

enum Mode {
    Healthy,
    Failing,
    Stalled,
}

pub struct ChannelOutbound {
    events: mpsc::UnboundedSender<OutboundEvent>,
    mode: Mode,
    probe: Option<(TopicRegistry, TopicId)>,
}

impl ChannelOutbound {
    fn with_mode(mode: Mode) -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbound = Self {
            events: tx,
            mode,
            probe: None,
        };
        (outbound, rx)
    }

    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        Self::with_mode(Mode::Healthy)
    }

    pub fn failing() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        Self::with_mode(Mode::Failing)
    }

    pub fn stalled() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        Self::with_mode(Mode::Stalled)
    }

    pub fn probing(
        registry: TopicRegistry,
        topic: TopicId,
    ) -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (mut outbound, rx) = Self::new();
        outbound.probe = Some((registry, topic));
        (outbound, rx)
    }
}

#[async_trait]
impl Outbound for ChannelOutbound {
    async fn send_text(&mut self, text: String) -> Result<(), GatewayError> {
        match self.mode {
            Mode::Healthy => {
                let _ = self.events.send(OutboundEvent::Text(text));
                Ok(())
            }
            Mode::Failing => Err(GatewayError::Transport("connection reset".to_string())),
            Mode::Stalled => std::future::pending().await,
        }
    }

    async fn ping(&mut self) -> Result<(), GatewayError> {
        let _ = self.events.send(OutboundEvent::Ping);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        let seen = match &self.probe {
            Some((registry, topic)) => registry.subscribers(topic.clone()).await,
            None => None,
        };
        let _ = self.events.send(OutboundEvent::Closed(seen));
        Ok(())
    }
}

/// Client sink that records every delivery.
pub struct RecordingSink {
    delivered: mpsc::UnboundedSender<(ClientId, Envelope)>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(ClientId, Envelope)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { delivered: tx }), rx)
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn write(&self, client: ClientId, message: &Envelope) -> bool {
        let _ = self.delivered.send((client, message.clone()));
        true
    }

    fn is_connected(&self, _client: ClientId) -> bool {
        true
    }
}

pub fn recording_registry() -> (TopicRegistry, mpsc::UnboundedReceiver<(ClientId, Envelope)>) {
    let (registry, control) = TopicRegistry::new();
    let (sink, rx) = RecordingSink::new();
    control.spawn(sink);
    (registry, rx)
}

/// Adapter that replays queued responses.
///
/// Schedule responses are consumed in order with the last one repeating;
/// play-by-play responses are consumed in order and answer `Ok(None)` once
/// exhausted.
pub struct ScriptedAdapter {
    name: String,
    schedules: Mutex<VecDeque<Result<Vec<ScheduleEntry>, AdapterError>>>,
    plays: Mutex<VecDeque<Result<Option<PlayByPlay>, AdapterError>>>,
    queries: Mutex<Vec<PlayByPlayQuery>>,
    polls: AtomicUsize,
    schedule_delay: Mutex<Option<Duration>>,
}

impl ScriptedAdapter {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            schedules: Mutex::new(VecDeque::new()),
            plays: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            schedule_delay: Mutex::new(None),
        })
    }

    pub fn push_schedule(&self, events: Vec<ScheduleEntry>) {
        self.schedules.lock().unwrap().push_back(Ok(events));
    }

    pub fn push_schedule_error(&self) {
        self.schedules
            .lock()
            .unwrap()
            .push_back(Err(AdapterError::Connection("provider down".to_string())));
    }

    /// Hold every schedule response for `delay` before answering.
    pub fn delay_schedule(&self, delay: Duration) {
        *self.schedule_delay.lock().unwrap() = Some(delay);
    }

    pub fn push_play(&self, play: Result<Option<PlayByPlay>, AdapterError>) {
        self.plays.lock().unwrap().push_back(play);
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<PlayByPlayQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SportAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn schedule(&self, _query: &ScheduleQuery) -> Result<ScheduleSnapshot, AdapterError> {
        let delay = *self.schedule_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut schedules = self.schedules.lock().unwrap();
        let next = if schedules.len() > 1 {
            schedules.pop_front()
        } else {
            schedules.front().map(|s| match s {
                Ok(events) => Ok(events.clone()),
                Err(_) => Err(AdapterError::Connection("provider down".to_string())),
            })
        };
        let events = next.unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(ScheduleSnapshot {
            sport: self.name.clone(),
            date: schedule_date(),
            events,
        })
    }

    async fn play_by_play(
        &self,
        query: &PlayByPlayQuery,
    ) -> Result<Option<PlayByPlay>, AdapterError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        self.plays.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    fn classify_status(&self, status_code: i64) -> LifecycleState {
        match status_code {
            3 => LifecycleState::Live,
            7 => LifecycleState::Complete,
            _ => LifecycleState::Preview,
        }
    }

    fn default_cursor(&self) -> Cursor {
        Cursor::new("000000")
    }
}

pub fn schedule_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
}

pub fn entry(event_id: &str, start_time: DateTime<Utc>, status_code: i64) -> ScheduleEntry {
    ScheduleEntry {
        event_id: event_id.to_string(),
        start_time,
        status_code,
        details: Value::Null,
    }
}

pub fn play(lifecycle: LifecycleState, cursor: &str, period: u32, payload: Value) -> PlayByPlay {
    PlayByPlay {
        payload,
        metadata: PollMetadata {
            lifecycle,
            cursor: Cursor::new(cursor),
            current_period: Some(period),
        },
    }
}

pub fn goal(seq: u32) -> Value {
    json!({"plays": [{"event": "goal", "seq": seq}]})
}
