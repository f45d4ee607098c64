//! sportcast: live sports event broadcast server.
//!
//! Wires the topic registry, the connection gateway, the event watch
//! scheduler and the HTTP/WebSocket API together.

pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod scheduler;
pub mod shutdown;
pub mod subscriptions;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use sportcast_broker::{Dispatcher, TopicRegistry};
use sportcast_sports::SportCatalog;

use crate::gateway::Gateway;

/// Shared application state
pub struct AppState {
    pub catalog: SportCatalog,
    pub registry: TopicRegistry,
    pub gateway: Gateway,
    /// Bound on a single HTTP request and on each websocket write.
    pub io_timeout: Duration,
}

/// Background tasks owned by a running broker.
pub struct BrokerTasks {
    pub registry: JoinHandle<()>,
    pub subscriptions: JoinHandle<()>,
}

impl AppState {
    /// Start the registry control task and the built-in subscription
    /// endpoint, and build the gateway that connects them to clients.
    pub fn start(catalog: SportCatalog, io_timeout: Duration) -> (Arc<Self>, BrokerTasks) {
        let (registry, control) = TopicRegistry::new();

        let mut dispatcher = Dispatcher::new();
        let subscription_requests = dispatcher.register(subscriptions::ENDPOINT);

        let gateway = Gateway::new(registry.clone(), dispatcher, io_timeout);
        let tasks = BrokerTasks {
            registry: control.spawn(Arc::new(gateway.clone())),
            subscriptions: tokio::spawn(subscriptions::run(
                subscription_requests,
                registry.clone(),
                gateway.clone(),
            )),
        };

        let state = Arc::new(Self {
            catalog,
            registry,
            gateway,
            io_timeout,
        });
        (state, tasks)
    }
}
