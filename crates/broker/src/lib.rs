//! sportcast-broker: in-process topic broker for live event updates.
//!
//! One control task owns every topic's subscriber set; each active topic
//! gets its own fan-out task that writes to clients through a [`ClientSink`].

pub mod client;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod metrics;
pub mod registry;
pub mod topic;

pub use client::{ClientId, ClientSink, ClientStatus};
pub use dispatch::Dispatcher;
pub use error::{BrokerError, TopicParseError};
pub use message::{Envelope, WireMessage, EXIT_SENTINEL_ID};
pub use registry::{RegistryControl, RegistrySnapshot, TopicRegistry, TopicSummary};
pub use topic::TopicId;
