mod buffer;
mod error;
mod ring;
mod session;
mod slot;

pub use buffer::{Occupancy, Received, RingBuffer, Transfer};
pub use error::RingError;
pub use ring::RingConfig;
pub use session::Session;
pub use slotfifo_sync::Interrupt;
