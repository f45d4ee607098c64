//! Routing of client-originated messages to registered receivers.
//!
//! Routes are keyed by the `endpoint` field of a message's contents and are
//! fixed once the dispatcher is shared.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::error::BrokerError;
use crate::message::Envelope;

#[derive(Debug, Default)]
pub struct Dispatcher {
    routes: HashMap<String, mpsc::UnboundedSender<Envelope>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver for `endpoint`, replacing any earlier one.
    pub fn register(&mut self, endpoint: impl Into<String>) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.insert(endpoint.into(), tx);
        rx
    }

    pub fn dispatch(&self, message: Envelope) -> Result<(), BrokerError> {
        let endpoint = message.endpoint().unwrap_or_default().to_string();
        let route = self
            .routes
            .get(&endpoint)
            .ok_or_else(|| BrokerError::NoReceiver(endpoint.clone()))?;
        route
            .send(message)
            .map_err(|_| BrokerError::ReceiverClosed(endpoint))
    }
}
