use crate::buffer::{Received, RingBuffer, Transfer};
use crate::error::RingError;
use slotfifo_sync::Interrupt;
use std::sync::Arc;

/// A client handle on a shared [`RingBuffer`].
///
/// Sessions carry no buffer state of their own; every session reads and
/// writes the same ring. Opening one bumps the ring's open count and dropping
/// (or [`close`](Self::close)-ing) it lowers the count again.
#[derive(Debug)]
pub struct Session {
    ring: Arc<RingBuffer>,
}

impl Session {
    pub(crate) fn new(ring: Arc<RingBuffer>) -> Self {
        Self { ring }
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    pub fn write(&self, data: &[u8], interrupt: &Interrupt) -> Result<Transfer, RingError> {
        self.ring.write(data, interrupt)
    }

    pub fn read(&self, requested_len: usize, interrupt: &Interrupt) -> Result<Received, RingError> {
        self.ring.read(requested_len, interrupt)
    }

    pub fn read_into(&self, buf: &mut [u8], interrupt: &Interrupt) -> Result<Transfer, RingError> {
        self.ring.read_into(buf, interrupt)
    }

    pub fn close(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ring.session_closed();
    }
}
