use slotfifo_sync::WaitError;
use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RingError {
    #[error("invalid ring configuration: {field} must be positive")]
    InvalidConfiguration { field: &'static str },

    /// `source` is `None` when the total size does not fit in `usize`.
    #[error("failed to allocate {capacity} slots of {slot_width} bytes")]
    AllocationFailure {
        capacity: usize,
        slot_width: usize,
        #[source]
        source: Option<TryReserveError>,
    },

    #[error("interrupted while waiting for the ring")]
    Interrupted,

    #[error("timed out while waiting for the ring")]
    TimedOut,
}

impl From<WaitError> for RingError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::Interrupted => RingError::Interrupted,
            WaitError::TimedOut => RingError::TimedOut,
        }
    }
}

impl RingError {
    /// Waits that were cut short can be retried; construction errors cannot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RingError::Interrupted | RingError::TimedOut)
    }
}
