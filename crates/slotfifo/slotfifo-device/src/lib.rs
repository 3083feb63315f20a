//! Device layer over the slot FIFO.
//!
//! Plays the part of a miscellaneous-device subsystem: drivers are registered
//! under a name, clients open a name and get a file handle, and reads and
//! writes on the handle are routed to the driver.

mod driver;
mod error;
mod fifo;
mod greeting;
mod registry;

pub use driver::{Driver, FileHandle};
pub use error::{DeviceError, UnloadError};
pub use fifo::{FifoDriver, FifoFile, FifoModule};
pub use greeting::{GreetingDriver, GreetingFile};
pub use registry::Registry;
pub use slotfifo_ring::Interrupt;
