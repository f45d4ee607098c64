//! Connection gateway.
//!
//! Owns every connected client: assigns ids, serializes writes to each
//! client's transport, runs the per-client read loop and tears clients down
//! exactly once. The registry reaches clients through the [`ClientSink`]
//! implementation on [`Gateway`].

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use sportcast_broker::{
    ClientId, ClientSink, ClientStatus, Dispatcher, Envelope, TopicRegistry, WireMessage,
};

use crate::error::GatewayError;
use crate::metrics;

/// Write half of a client transport.
#[async_trait]
pub trait Outbound: Send {
    async fn send_text(&mut self, text: String) -> Result<(), GatewayError>;
    async fn ping(&mut self) -> Result<(), GatewayError>;
    async fn close(&mut self) -> Result<(), GatewayError>;
}

#[async_trait]
impl Outbound for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: String) -> Result<(), GatewayError> {
        self.send(Message::Text(text))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn ping(&mut self) -> Result<(), GatewayError> {
        self.send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        SinkExt::close(self)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

struct Connection {
    status: AtomicU8,
    outbound: Mutex<Box<dyn Outbound>>,
}

impl Connection {
    fn status(&self) -> ClientStatus {
        ClientStatus::from_u8(self.status.load(Ordering::Acquire))
    }
}

struct GatewayInner {
    registry: TopicRegistry,
    dispatcher: Dispatcher,
    connections: DashMap<ClientId, Arc<Connection>>,
    next_id: AtomicU64,
    io_timeout: Duration,
}

#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

impl Gateway {
    pub fn new(registry: TopicRegistry, dispatcher: Dispatcher, io_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                registry,
                dispatcher,
                connections: DashMap::new(),
                next_id: AtomicU64::new(1),
                io_timeout,
            }),
        }
    }

    /// Register an upgraded socket, returning its id and read half.
    pub fn accept(&self, socket: WebSocket) -> (ClientId, SplitStream<WebSocket>) {
        let (sink, stream) = socket.split();
        (self.register(Box::new(sink)), stream)
    }

    pub fn register(&self, outbound: Box<dyn Outbound>) -> ClientId {
        let client = ClientId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = Connection {
            status: AtomicU8::new(ClientStatus::Connected as u8),
            outbound: Mutex::new(outbound),
        };
        self.inner.connections.insert(client, Arc::new(connection));
        metrics::client_connected();
        debug!(client = %client, "client registered");
        client
    }

    /// Number of clients currently registered.
    pub fn connected(&self) -> usize {
        self.inner.connections.len()
    }

    /// Unknown clients report as closed.
    pub fn status(&self, client: ClientId) -> ClientStatus {
        self.connection(client)
            .map(|c| c.status())
            .unwrap_or(ClientStatus::Closed)
    }

    fn connection(&self, client: ClientId) -> Option<Arc<Connection>> {
        self.inner
            .connections
            .get(&client)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Send one message to a client. A failed or stalled write schedules
    /// teardown and returns false.
    pub async fn write(&self, client: ClientId, message: &Envelope) -> bool {
        let Some(connection) = self.connection(client) else {
            return false;
        };
        if connection.status() != ClientStatus::Connected {
            return false;
        }

        let text = match message.to_wire().encode() {
            Ok(text) => text,
            Err(e) => {
                // Nothing wrong with the client; only this message is lost.
                error!(client = %client, error = %e, "failed to encode outbound message");
                return true;
            }
        };

        let result = {
            let mut outbound = connection.outbound.lock().await;
            timeout(self.inner.io_timeout, outbound.send_text(text)).await
        };

        let failure = match result {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => e,
            Err(_) => GatewayError::Timeout {
                timeout_ms: self.inner.io_timeout.as_millis() as u64,
            },
        };
        debug!(client = %client, error = %failure, "write failed, tearing client down");
        self.spawn_teardown(client);
        false
    }

    async fn ping(&self, client: ClientId) -> bool {
        let Some(connection) = self.connection(client) else {
            return false;
        };
        let mut outbound = connection.outbound.lock().await;
        matches!(
            timeout(self.inner.io_timeout, outbound.ping()).await,
            Ok(Ok(()))
        )
    }

    fn spawn_teardown(&self, client: ClientId) {
        let gateway = self.clone();
        tokio::spawn(async move { gateway.teardown(client).await });
    }

    /// Idempotent: only the first caller for a client does any work.
    ///
    /// The client is removed from every topic before its transport closes.
    pub async fn teardown(&self, client: ClientId) {
        let Some(connection) = self.connection(client) else {
            return;
        };
        if connection
            .status
            .compare_exchange(
                ClientStatus::Connected as u8,
                ClientStatus::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        self.inner.registry.detach(client).await;

        {
            let mut outbound = connection.outbound.lock().await;
            match timeout(self.inner.io_timeout, outbound.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(client = %client, error = %e, "close failed"),
                Err(_) => debug!(client = %client, "close timed out"),
            }
        }

        connection
            .status
            .store(ClientStatus::Closed as u8, Ordering::Release);
        self.inner.connections.remove(&client);
        metrics::client_disconnected();
        info!(client = %client, "client disconnected");
    }

    /// Read frames until the client leaves, then tear it down.
    ///
    /// Silence for one io timeout triggers a ping; a second silent period
    /// ends the session.
    pub async fn read_loop<S>(&self, client: ClientId, mut inbound: S)
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
    {
        let mut awaiting_pong = false;
        loop {
            let frame = match timeout(self.inner.io_timeout, inbound.next()).await {
                Err(_) if awaiting_pong => {
                    info!(client = %client, "client silent after keepalive ping");
                    break;
                }
                Err(_) => {
                    if !self.ping(client).await {
                        break;
                    }
                    awaiting_pong = true;
                    continue;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    debug!(client = %client, error = %e, "read failed");
                    break;
                }
                Ok(Some(Ok(frame))) => frame,
            };
            awaiting_pong = false;

            let bytes = match frame {
                Message::Text(text) => text.into_bytes(),
                Message::Binary(data) => data,
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => break,
            };

            match WireMessage::decode(&bytes) {
                Err(e) => {
                    metrics::inbound_frame("decode_error");
                    warn!(client = %client, error = %e, "discarding undecodable frame");
                }
                Ok(frame) if frame.is_exit() => {
                    metrics::inbound_frame("exit");
                    info!(client = %client, "client requested disconnect");
                    break;
                }
                Ok(frame) => {
                    metrics::inbound_frame("message");
                    let message = Envelope::from_client(client, frame);
                    if let Err(e) = self.inner.dispatcher.dispatch(message) {
                        debug!(client = %client, error = %e, "inbound message not routed");
                    }
                }
            }
        }

        self.teardown(client).await;
    }
}

#[async_trait]
impl ClientSink for Gateway {
    async fn write(&self, client: ClientId, message: &Envelope) -> bool {
        Gateway::write(self, client, message).await
    }

    fn is_connected(&self, client: ClientId) -> bool {
        self.status(client) == ClientStatus::Connected
    }
}
