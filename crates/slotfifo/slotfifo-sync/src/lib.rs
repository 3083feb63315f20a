//! Blocking synchronization primitives for the slot FIFO.
//!
//! Every wait in this crate is interruptible through an [`Interrupt`] token
//! and may carry an optional deadline. A wait that ends in
//! [`WaitError::Interrupted`] or [`WaitError::TimedOut`] leaves the primitive
//! exactly as it found it.

mod interrupt;
mod lock;
mod semaphore;

pub use interrupt::Interrupt;
pub use lock::{Lock, LockGuard};
pub use semaphore::{Permit, Semaphore, WaitError};
