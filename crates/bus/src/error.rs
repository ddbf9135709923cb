use thiserror::Error;

/// Errors that can occur on the notification bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("subscription closed")]
    Closed,

    #[error("no message received within {0:?}")]
    Timeout(std::time::Duration),
}
