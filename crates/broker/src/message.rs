//! Message envelope and the JSON frame exchanged with clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ClientId;

/// Frame id a client sends to request that its connection be closed.
pub const EXIT_SENTINEL_ID: i64 = -1;

const DEFAULT_INBOUND_KIND: &str = "message";

/// A published message. Immutable once built; fan-out shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    kind: String,
    id: i64,
    origin: Option<ClientId>,
    payload: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            id: 0,
            origin: None,
            payload,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Wrap a frame decoded from `client`.
    pub fn from_client(client: ClientId, frame: WireMessage) -> Self {
        Self {
            kind: frame.kind,
            id: frame.id,
            origin: Some(client),
            payload: frame.contents,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn origin(&self) -> Option<ClientId> {
        self.origin
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Routing key for client-originated messages (`contents.endpoint`).
    pub fn endpoint(&self) -> Option<&str> {
        self.payload.get("endpoint").and_then(Value::as_str)
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            kind: self.kind.clone(),
            id: self.id,
            contents: self.payload.clone(),
        }
    }
}

/// Wire shape in both directions: `{"type": ..., "id": ..., "contents": {...}}`.
///
/// Decoding is lenient so that a bare `{"id": -1}` is a valid close request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default = "empty_contents")]
    pub contents: Value,
}

fn default_kind() -> String {
    DEFAULT_INBOUND_KIND.to_string()
}

fn empty_contents() -> Value {
    Value::Object(serde_json::Map::new())
}

impl WireMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_exit(&self) -> bool {
        self.id == EXIT_SENTINEL_ID
    }
}
