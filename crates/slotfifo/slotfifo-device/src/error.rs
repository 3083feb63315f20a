use crate::fifo::FifoModule;
use slotfifo_ring::RingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device name must not be empty")]
    InvalidName,

    #[error("device '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("no device registered as '{0}'")]
    NotRegistered(String),

    #[error("device '{name}' is busy: {open} file(s) still open")]
    Busy { name: String, open: usize },

    #[error("device '{0}' is still referenced by a driver handle")]
    StillReferenced(String),

    #[error(transparent)]
    Ring(#[from] RingError),
}

impl DeviceError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, DeviceError::Ring(RingError::Interrupted))
    }
}

/// A refused [`FifoModule::unload`]. The module is handed back still loaded.
#[derive(Error, Debug)]
#[error("failed to unload module")]
pub struct UnloadError {
    pub module: FifoModule,
    #[source]
    pub reason: DeviceError,
}
