use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Errors from lifecycle transitions
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from} via {event}: {reason}")]
    InvalidTransition {
        from: LifecycleState,
        event: String,
        reason: String,
    },
}

/// Errors from provider adapters. All of them are transient to the scheduler.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("provider timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("provider connection error: {0}")]
    Connection(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("invalid event id: {0}")]
    InvalidEventId(String),
}
