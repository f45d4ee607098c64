use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::message::Envelope;

/// Opaque identifier the registry uses to reference a connection it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClientId(u64);

impl ClientId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Connection lifecycle. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ClientStatus {
    Connected = 0,
    Closing = 1,
    Closed = 2,
}

impl ClientStatus {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ClientStatus::Connected,
            1 => ClientStatus::Closing,
            _ => ClientStatus::Closed,
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClientStatus::Connected => "connected",
            ClientStatus::Closing => "closing",
            ClientStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Outbound side of the connection layer, as seen by fan-out tasks.
///
/// `write` never fails loudly: a `false` return means the client is gone
/// (its teardown has already been triggered) and it should be pruned.
#[async_trait]
pub trait ClientSink: Send + Sync + 'static {
    async fn write(&self, client: ClientId, message: &Envelope) -> bool;

    /// Whether `client` is still `Connected`. Checked when a subscribe is applied.
    fn is_connected(&self, client: ClientId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_u8() {
        for status in [ClientStatus::Connected, ClientStatus::Closing, ClientStatus::Closed] {
            assert_eq!(ClientStatus::from_u8(status as u8), status);
        }
    }

    #[test]
    fn test_client_id_display() {
        assert_eq!(ClientId::new(12).to_string(), "client-12");
    }
}
