//! Built-in `subscriptions` endpoint: lets a connected client join or leave
//! topics other than the one it connected for.

use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use sportcast_broker::{Envelope, TopicId, TopicRegistry};

use crate::gateway::Gateway;

pub const ENDPOINT: &str = "subscriptions";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Deserialize)]
struct SubscriptionRequest {
    action: Action,
    topic: TopicId,
}

/// Serve requests routed to [`ENDPOINT`] until the dispatcher goes away.
pub async fn run(mut requests: UnboundedReceiver<Envelope>, registry: TopicRegistry, gateway: Gateway) {
    while let Some(message) = requests.recv().await {
        let Some(client) = message.origin() else {
            continue;
        };

        let reply = match serde_json::from_value::<SubscriptionRequest>(message.payload().clone()) {
            Ok(SubscriptionRequest {
                action: Action::Subscribe,
                topic,
            }) => {
                let ok = registry.subscribe(client, topic.clone()).await;
                debug!(client = %client, topic = %topic, ok, "subscribe request");
                Envelope::new("subscribed", json!({"topic": topic, "ok": ok}))
            }
            Ok(SubscriptionRequest {
                action: Action::Unsubscribe,
                topic,
            }) => {
                registry.unsubscribe(client, topic.clone());
                debug!(client = %client, topic = %topic, "unsubscribe request");
                Envelope::new("unsubscribed", json!({"topic": topic, "ok": true}))
            }
            Err(e) => {
                debug!(client = %client, error = %e, "malformed subscription request");
                Envelope::new("error", json!({"error": e.to_string()}))
            }
        };

        gateway.write(client, &reply.with_id(message.id())).await;
    }
    info!("subscription endpoint stopped");
}
