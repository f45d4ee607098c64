//! Topic registry.
//!
//! A single control task owns every topic and its subscriber set. Callers
//! hold a cloneable [`TopicRegistry`] handle and enqueue commands; only
//! `subscribe` (and the introspection/flush helpers) wait for a reply.
//!
//! Each topic runs its own fan-out task. The control task republishes the
//! topic's subscriber set on a watch channel after every membership change,
//! and the fan-out reads the current set as it dequeues each message. A
//! client removed while messages are still queued receives none of them.
//! Failed writes come back to the control task as prune reports.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{ClientId, ClientSink};
use crate::error::BrokerError;
use crate::message::Envelope;
use crate::metrics;
use crate::topic::TopicId;

enum Command {
    Create(TopicId),
    Destroy(TopicId),
    Subscribe {
        client: ClientId,
        topic: TopicId,
        reply: oneshot::Sender<bool>,
    },
    Unsubscribe {
        client: ClientId,
        topic: TopicId,
    },
    Detach {
        client: ClientId,
        done: oneshot::Sender<()>,
    },
    Publish {
        topic: TopicId,
        message: Envelope,
    },
    Flush {
        topic: TopicId,
        done: oneshot::Sender<()>,
    },
    Prune {
        topic: TopicId,
        instance: u64,
        clients: Vec<ClientId>,
    },
    Subscribers {
        topic: TopicId,
        reply: oneshot::Sender<Option<Vec<ClientId>>>,
    },
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
    Shutdown,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Create(_) => "create",
            Command::Destroy(_) => "destroy",
            Command::Subscribe { .. } => "subscribe",
            Command::Unsubscribe { .. } => "unsubscribe",
            Command::Detach { .. } => "detach",
            Command::Publish { .. } => "publish",
            Command::Flush { .. } => "flush",
            Command::Prune { .. } => "prune",
            Command::Subscribers { .. } => "subscribers",
            Command::Snapshot { .. } => "snapshot",
            Command::Shutdown => "shutdown",
        }
    }
}

/// Point-in-time view of the registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrySnapshot {
    pub topics: Vec<TopicSummary>,
    pub dropped_publishes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub topic: TopicId,
    pub subscribers: usize,
}

/// Handle to the registry control task.
#[derive(Clone)]
pub struct TopicRegistry {
    commands: mpsc::UnboundedSender<Command>,
}

/// The receiving half, turned into the control task by [`RegistryControl::spawn`].
pub struct RegistryControl {
    commands: mpsc::UnboundedReceiver<Command>,
    reports: mpsc::WeakUnboundedSender<Command>,
}

impl TopicRegistry {
    /// Create a handle and its not-yet-running control task.
    ///
    /// Split in two so the connection layer can be built around the handle
    /// before it is handed to the control task as the client sink.
    pub fn new() -> (Self, RegistryControl) {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = RegistryControl {
            commands: rx,
            reports: tx.downgrade(),
        };
        (Self { commands: tx }, control)
    }

    fn send(&self, command: Command) -> Result<(), BrokerError> {
        self.commands
            .send(command)
            .map_err(|_| BrokerError::RegistryClosed)
    }

    fn enqueue(&self, command: Command) {
        let op = command.name();
        if self.send(command).is_err() {
            warn!(op, "registry control task gone, command ignored");
        }
    }

    pub fn create_topic(&self, topic: TopicId) {
        self.enqueue(Command::Create(topic));
    }

    pub fn destroy_topic(&self, topic: TopicId) {
        self.enqueue(Command::Destroy(topic));
    }

    /// Returns `false` if the topic does not exist or the client is no longer connected.
    pub async fn subscribe(&self, client: ClientId, topic: TopicId) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .send(Command::Subscribe {
                client,
                topic,
                reply,
            })
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub fn unsubscribe(&self, client: ClientId, topic: TopicId) {
        self.enqueue(Command::Unsubscribe { client, topic });
    }

    /// Remove `client` from every topic. Resolves once the removal is applied.
    pub async fn detach(&self, client: ClientId) {
        let (done, rx) = oneshot::channel();
        if self.send(Command::Detach { client, done }).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn publish(&self, topic: TopicId, message: Envelope) {
        self.enqueue(Command::Publish { topic, message });
    }

    /// Resolves once every message published to `topic` before this call has
    /// been written (or the topic was destroyed first).
    pub async fn flush(&self, topic: TopicId) {
        let (done, rx) = oneshot::channel();
        if self.send(Command::Flush { topic, done }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Current subscribers of `topic` in subscription order, `None` if absent.
    pub async fn subscribers(&self, topic: TopicId) -> Option<Vec<ClientId>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribers { topic, reply }).ok()?;
        rx.await.ok().flatten()
    }

    pub async fn snapshot(&self) -> Result<RegistrySnapshot, BrokerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| BrokerError::RegistryClosed)
    }

    /// Destroy every topic and stop the control task.
    pub fn shutdown(&self) {
        self.enqueue(Command::Shutdown);
    }
}

impl RegistryControl {
    pub fn spawn(self, sink: Arc<dyn ClientSink>) -> JoinHandle<()> {
        tokio::spawn(self.run(sink))
    }

    pub async fn run(mut self, sink: Arc<dyn ClientSink>) {
        let mut actor = RegistryActor {
            sink,
            topics: HashMap::new(),
            next_instance: 0,
            dropped_publishes: 0,
            reports: self.reports,
        };

        info!("registry control task started");
        while let Some(command) = self.commands.recv().await {
            if !actor.handle(command) {
                break;
            }
        }
        actor.destroy_all();
        info!("registry control task stopped");
    }
}

/// Messages queued for one topic's fan-out task.
enum Mail {
    Deliver(Envelope),
    Flush(oneshot::Sender<()>),
}

struct TopicEntry {
    instance: u64,
    subscribers: Vec<ClientId>,
    members: watch::Sender<Arc<[ClientId]>>,
    mailbox: mpsc::UnboundedSender<Mail>,
    stop: oneshot::Sender<()>,
}

impl TopicEntry {
    /// Make the current subscriber set visible to the fan-out task.
    fn sync_members(&self) {
        self.members.send_replace(Arc::from(self.subscribers.as_slice()));
    }
}

struct RegistryActor {
    sink: Arc<dyn ClientSink>,
    topics: HashMap<TopicId, TopicEntry>,
    next_instance: u64,
    dropped_publishes: u64,
    reports: mpsc::WeakUnboundedSender<Command>,
}

impl RegistryActor {
    /// Apply one command. Returns `false` on shutdown.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Create(topic) => self.create(topic),
            Command::Destroy(topic) => self.destroy(&topic),
            Command::Subscribe {
                client,
                topic,
                reply,
            } => {
                let _ = reply.send(self.subscribe(client, &topic));
            }
            Command::Unsubscribe { client, topic } => self.unsubscribe(client, &topic),
            Command::Detach { client, done } => {
                self.detach(client);
                let _ = done.send(());
            }
            Command::Publish { topic, message } => self.publish(&topic, message),
            Command::Flush { topic, done } => self.flush(&topic, done),
            Command::Prune {
                topic,
                instance,
                clients,
            } => self.prune(&topic, instance, &clients),
            Command::Subscribers { topic, reply } => {
                let subscribers = self.topics.get(&topic).map(|e| e.subscribers.clone());
                let _ = reply.send(subscribers);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn create(&mut self, topic: TopicId) {
        if self.topics.contains_key(&topic) {
            debug!(topic = %topic, "topic already active");
            return;
        }

        self.next_instance += 1;
        let instance = self.next_instance;
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let (stop, stop_rx) = oneshot::channel();
        let (members, members_rx) = watch::channel(Arc::from(Vec::<ClientId>::new()));

        let fan_out = FanOut {
            topic: topic.clone(),
            instance,
            members: members_rx,
            sink: Arc::clone(&self.sink),
            reports: self.reports.clone(),
        };
        tokio::spawn(fan_out.run(inbox, stop_rx));

        self.topics.insert(
            topic.clone(),
            TopicEntry {
                instance,
                subscribers: Vec::new(),
                members,
                mailbox,
                stop,
            },
        );
        metrics::topic_created();
        info!(topic = %topic, instance, "topic created");
    }

    /// Stops the fan-out task and removes the entry in one step, so a
    /// destroyed topic is never visible to later commands.
    fn destroy(&mut self, topic: &TopicId) {
        let Some(entry) = self.topics.remove(topic) else {
            debug!(topic = %topic, "destroy of unknown topic ignored");
            return;
        };
        let _ = entry.stop.send(());
        metrics::topic_destroyed();
        info!(
            topic = %topic,
            instance = entry.instance,
            subscribers = entry.subscribers.len(),
            "topic destroyed"
        );
    }

    fn destroy_all(&mut self) {
        let topics: Vec<TopicId> = self.topics.keys().cloned().collect();
        for topic in topics {
            self.destroy(&topic);
        }
    }

    fn subscribe(&mut self, client: ClientId, topic: &TopicId) -> bool {
        let Some(entry) = self.topics.get_mut(topic) else {
            debug!(client = %client, topic = %topic, "subscribe to unknown topic");
            return false;
        };
        if !self.sink.is_connected(client) {
            debug!(client = %client, topic = %topic, "subscribe from disconnected client");
            return false;
        }
        if !entry.subscribers.contains(&client) {
            entry.subscribers.push(client);
            entry.sync_members();
            debug!(client = %client, topic = %topic, "client subscribed");
        }
        true
    }

    fn unsubscribe(&mut self, client: ClientId, topic: &TopicId) {
        let Some(entry) = self.topics.get_mut(topic) else {
            return;
        };
        let before = entry.subscribers.len();
        entry.subscribers.retain(|c| *c != client);
        if entry.subscribers.len() != before {
            entry.sync_members();
            debug!(client = %client, topic = %topic, "client unsubscribed");
        }
    }

    fn detach(&mut self, client: ClientId) {
        let mut removed = 0;
        for entry in self.topics.values_mut() {
            let before = entry.subscribers.len();
            entry.subscribers.retain(|c| *c != client);
            if entry.subscribers.len() != before {
                entry.sync_members();
                removed += 1;
            }
        }
        debug!(client = %client, topics = removed, "client detached");
    }

    fn publish(&mut self, topic: &TopicId, message: Envelope) {
        let Some(entry) = self.topics.get(topic) else {
            self.dropped_publishes += 1;
            metrics::publish_dropped();
            warn!(topic = %topic, kind = message.kind(), "publish to unknown topic dropped");
            return;
        };

        if entry.mailbox.send(Mail::Deliver(message)).is_err() {
            warn!(topic = %topic, "fan-out task gone, publish dropped");
            return;
        }
        metrics::publish_queued();
    }

    fn flush(&mut self, topic: &TopicId, done: oneshot::Sender<()>) {
        match self.topics.get(topic) {
            Some(entry) => {
                if let Err(mpsc::error::SendError(Mail::Flush(done))) =
                    entry.mailbox.send(Mail::Flush(done))
                {
                    let _ = done.send(());
                }
            }
            None => {
                let _ = done.send(());
            }
        }
    }

    fn prune(&mut self, topic: &TopicId, instance: u64, clients: &[ClientId]) {
        let Some(entry) = self.topics.get_mut(topic) else {
            return;
        };
        if entry.instance != instance {
            debug!(topic = %topic, instance, "stale prune report ignored");
            return;
        }
        let before = entry.subscribers.len();
        entry.subscribers.retain(|c| !clients.contains(c));
        let pruned = before - entry.subscribers.len();
        if pruned > 0 {
            entry.sync_members();
            metrics::subscribers_pruned(pruned);
            info!(topic = %topic, pruned, "dead subscribers pruned");
        }
    }

    fn snapshot(&self) -> RegistrySnapshot {
        let mut topics: Vec<TopicSummary> = self
            .topics
            .iter()
            .map(|(topic, entry)| TopicSummary {
                topic: topic.clone(),
                subscribers: entry.subscribers.len(),
            })
            .collect();
        topics.sort_by(|a, b| a.topic.cmp(&b.topic));
        RegistrySnapshot {
            topics,
            dropped_publishes: self.dropped_publishes,
        }
    }
}

/// Per-topic writer. Drains its mailbox in publish order until stopped.
struct FanOut {
    topic: TopicId,
    instance: u64,
    members: watch::Receiver<Arc<[ClientId]>>,
    sink: Arc<dyn ClientSink>,
    reports: mpsc::WeakUnboundedSender<Command>,
}

impl FanOut {
    async fn run(self, mut inbox: mpsc::UnboundedReceiver<Mail>, mut stop: oneshot::Receiver<()>) {
        debug!(topic = %self.topic, instance = self.instance, "fan-out started");

        loop {
            // Stop wins over pending mail; a pass already in progress completes.
            let mail = tokio::select! {
                biased;
                _ = &mut stop => break,
                mail = inbox.recv() => match mail {
                    Some(mail) => mail,
                    None => break,
                },
            };

            match mail {
                Mail::Deliver(message) => self.deliver(&message).await,
                Mail::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        inbox.close();
        let mut discarded = 0usize;
        while let Ok(mail) = inbox.try_recv() {
            if let Mail::Deliver(_) = mail {
                discarded += 1;
            }
        }
        debug!(
            topic = %self.topic,
            instance = self.instance,
            discarded,
            "fan-out stopped"
        );
    }

    async fn deliver(&self, message: &Envelope) {
        let recipients = Arc::clone(&*self.members.borrow());
        let mut dead = Vec::new();
        for &client in recipients.iter() {
            let ok = self.sink.write(client, message).await;
            metrics::delivery(ok);
            if !ok {
                dead.push(client);
            }
        }

        if dead.is_empty() {
            return;
        }
        if let Some(reports) = self.reports.upgrade() {
            let _ = reports.send(Command::Prune {
                topic: self.topic.clone(),
                instance: self.instance,
                clients: dead,
            });
        }
    }
}
