use thiserror::Error;

/// Errors from broker operations
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("registry control task is not running")]
    RegistryClosed,

    #[error("no receiver registered for endpoint: {0}")]
    NoReceiver(String),

    #[error("receiver for endpoint {0} has shut down")]
    ReceiverClosed(String),
}

/// Errors parsing a `{sport}:{event}` topic identifier
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TopicParseError {
    #[error("topic identifier missing ':' separator: {0}")]
    MissingSeparator(String),

    #[error("topic identifier has an empty {0} part")]
    EmptyPart(&'static str),
}
