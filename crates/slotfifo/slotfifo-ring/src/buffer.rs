//! Bounded multi-producer, multi-consumer FIFO of fixed-width byte slots.
//!
//! # Design
//! - **Slots**: `capacity` byte buffers of `slot_width` bytes, allocated once.
//! - **Semaphores**: `filled` counts slots holding unread data, `free` counts
//!   slots ready to be written. `filled + free == capacity` whenever no
//!   operation is in flight.
//! - **Cursor locks**: `write_cursor` serializes writers among themselves,
//!   `read_cursor` serializes readers among themselves. Readers and writers
//!   never contend on the same lock.
//!
//! # Protocol
//!
//! ```text
//! write:  free.acquire ─► write_cursor.lock ─► fill slot ─► advance ─► unlock ─► filled.release
//! read:   filled.acquire ─► read_cursor.lock ─► drain slot ─► advance ─► unlock ─► free.release
//! ```
//!
//! A writer only touches a slot after taking a `free` permit, which some
//! reader produced after vacating that slot; a reader only touches a slot
//! after taking a `filled` permit, which some writer produced after filling
//! it. Each slot is therefore owned by exactly one side per generation and
//! its bytes need no synchronization of their own.
//!
//! # Cancellation
//! Every wait takes an [`Interrupt`] and an optional deadline. A wait that is
//! cut short returns every permit taken so far (the permits are RAII guards)
//! and leaves the slots and cursors untouched.

use crate::error::RingError;
use crate::ring::{RingConfig, advance};
use crate::session::Session;
use crate::slot::Slot;
use slotfifo_sync::{Interrupt, Lock, Semaphore};
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Outcome of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Bytes actually copied.
    pub len: usize,
    /// Write: the input was longer than a slot. Read: the slot held more than
    /// the caller accepted, and the rest was discarded.
    pub truncated: bool,
}

/// Bytes taken out of one slot by [`RingBuffer::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl Received {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Snapshot of the semaphore counts.
///
/// Each count is read under its own lock; while operations are in flight the
/// two may sum to less than `capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub filled: usize,
    pub free: usize,
    pub capacity: usize,
}

impl Occupancy {
    /// True when no operation holds a permit it has not yet handed over.
    pub fn is_quiescent(&self) -> bool {
        self.filled + self.free == self.capacity
    }
}

struct SlotCell(UnsafeCell<Slot>);

// SAFETY: a slot is only dereferenced by the holder of the matching cursor
// lock, after taking a `filled`/`free` permit for it. The permit handshake
// gives each generation of a slot to exactly one writer and then exactly one
// reader.
unsafe impl Sync for SlotCell {}

pub struct RingBuffer {
    config: RingConfig,
    slots: Box<[SlotCell]>,
    /// Slots holding unread data.
    filled: Semaphore,
    /// Slots ready to be written.
    free: Semaphore,
    /// Index of the next slot to read.
    read_cursor: Lock<usize>,
    /// Index of the next slot to write.
    write_cursor: Lock<usize>,
    /// Live sessions. Diagnostic only, never gates the data path.
    open_count: AtomicUsize,
}

impl RingBuffer {
    /// Allocates a ring of `capacity` zeroed slots of `slot_width` bytes.
    ///
    /// # Errors
    /// - [`RingError::InvalidConfiguration`] if either dimension is zero
    /// - [`RingError::AllocationFailure`] if `capacity * slot_width` overflows
    ///   or slot storage cannot be reserved; anything allocated so far is
    ///   released
    pub fn create(capacity: usize, slot_width: usize) -> Result<Self, RingError> {
        Self::with_config(RingConfig::new(capacity, slot_width)?)
    }

    pub fn with_config(config: RingConfig) -> Result<Self, RingError> {
        let RingConfig {
            capacity,
            slot_width,
        } = config;
        let alloc_failure = |source| RingError::AllocationFailure {
            capacity,
            slot_width,
            source,
        };
        if config.storage_bytes().is_none() {
            return Err(alloc_failure(None));
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|e| alloc_failure(Some(e)))?;
        for _ in 0..capacity {
            let slot = Slot::zeroed(slot_width).map_err(|e| alloc_failure(Some(e)))?;
            slots.push(SlotCell(UnsafeCell::new(slot)));
        }

        info!(capacity, slot_width, "ring buffer created");

        Ok(Self {
            config,
            slots: slots.into_boxed_slice(),
            filled: Semaphore::new(0),
            free: Semaphore::new(capacity),
            read_cursor: Lock::new(0),
            write_cursor: Lock::new(0),
            open_count: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub fn config(&self) -> RingConfig {
        self.config
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    #[inline]
    pub fn slot_width(&self) -> usize {
        self.config.slot_width
    }

    /// Writes one message into the next free slot, blocking while the ring is full.
    ///
    /// Copies `min(data.len(), slot_width)` bytes; the rest is dropped and
    /// reported through [`Transfer::truncated`].
    ///
    /// # Errors
    /// [`RingError::Interrupted`] if `interrupt` is raised while waiting. No
    /// permit is consumed and no slot is touched.
    pub fn write(&self, data: &[u8], interrupt: &Interrupt) -> Result<Transfer, RingError> {
        self.write_until(data, interrupt, None)
    }

    /// [`write`](Self::write) that gives up with [`RingError::TimedOut`] at `deadline`.
    pub fn write_until(
        &self,
        data: &[u8],
        interrupt: &Interrupt,
        deadline: Option<Instant>,
    ) -> Result<Transfer, RingError> {
        let transfer = self.produce(interrupt, deadline, |slot| {
            let len = slot.fill(data);
            Transfer {
                len,
                truncated: data.len() > len,
            }
        })?;
        trace!(len = transfer.len, truncated = transfer.truncated, "slot written");
        Ok(transfer)
    }

    /// Takes the oldest message, blocking while the ring is empty.
    ///
    /// Returns at most `requested_len` bytes. One call consumes one slot; bytes
    /// of that slot beyond `requested_len` are discarded.
    pub fn read(&self, requested_len: usize, interrupt: &Interrupt) -> Result<Received, RingError> {
        self.read_until(requested_len, interrupt, None)
    }

    pub fn read_until(
        &self,
        requested_len: usize,
        interrupt: &Interrupt,
        deadline: Option<Instant>,
    ) -> Result<Received, RingError> {
        self.consume(interrupt, deadline, |slot| {
            let stored = slot.contents();
            let n = requested_len.min(stored.len());
            Received {
                bytes: stored[..n].to_vec(),
                truncated: stored.len() > n,
            }
        })
    }

    /// [`read`](Self::read) into a caller-provided buffer; `requested_len` is `buf.len()`.
    pub fn read_into(&self, buf: &mut [u8], interrupt: &Interrupt) -> Result<Transfer, RingError> {
        self.read_into_until(buf, interrupt, None)
    }

    pub fn read_into_until(
        &self,
        buf: &mut [u8],
        interrupt: &Interrupt,
        deadline: Option<Instant>,
    ) -> Result<Transfer, RingError> {
        self.consume(interrupt, deadline, |slot| {
            let stored = slot.contents();
            let n = buf.len().min(stored.len());
            buf[..n].copy_from_slice(&stored[..n]);
            Transfer {
                len: n,
                truncated: stored.len() > n,
            }
        })
    }

    /// Current semaphore counts.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            filled: self.filled.available(),
            free: self.free.available(),
            capacity: self.config.capacity,
        }
    }

    /// Number of live sessions.
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Opens a session on a shared ring.
    pub fn open(self: &Arc<Self>) -> Session {
        let open = self.open_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(open, "session opened");
        Session::new(Arc::clone(self))
    }

    pub(crate) fn session_closed(&self) {
        let open = self.open_count.fetch_sub(1, Ordering::Relaxed) - 1;
        debug!(open, "session closed");
    }

    /// Releases the slot storage.
    ///
    /// Taking `self` by value guarantees no operation is in flight. Returns the
    /// number of unread messages that were discarded.
    pub fn destroy(self) -> usize {
        let unread = self.filled.available();
        info!(
            capacity = self.config.capacity,
            unread, "ring buffer destroyed"
        );
        unread
    }

    /// Runs `f` on the slot at the write cursor once a `free` permit and the
    /// write lock are held, then hands the slot to readers.
    fn produce<R>(
        &self,
        interrupt: &Interrupt,
        deadline: Option<Instant>,
        f: impl FnOnce(&mut Slot) -> R,
    ) -> Result<R, RingError> {
        let free = self
            .free
            .acquire_until(interrupt, deadline)
            .inspect_err(|e| warn!(?e, "writer gave up waiting for a free slot"))?;
        // On failure `free` drops here and its permit goes back.
        let mut cursor = self
            .write_cursor
            .lock_until(interrupt, deadline)
            .inspect_err(|e| warn!(?e, "writer gave up waiting for the write lock"))?;

        // SAFETY: the `free` permit guarantees the slot at the write cursor has
        // been vacated by its previous reader, and the write lock guarantees no
        // other writer targets it.
        let slot = unsafe { &mut *self.slots[*cursor].0.get() };
        let out = f(slot);
        *cursor = advance(*cursor, self.config.capacity);

        drop(cursor);
        free.forget();
        self.filled.release();
        Ok(out)
    }

    /// Mirror of [`produce`](Self::produce) for the read side.
    fn consume<R>(
        &self,
        interrupt: &Interrupt,
        deadline: Option<Instant>,
        f: impl FnOnce(&Slot) -> R,
    ) -> Result<R, RingError> {
        let filled = self
            .filled
            .acquire_until(interrupt, deadline)
            .inspect_err(|e| warn!(?e, "reader gave up waiting for a filled slot"))?;
        let mut cursor = self
            .read_cursor
            .lock_until(interrupt, deadline)
            .inspect_err(|e| warn!(?e, "reader gave up waiting for the read lock"))?;

        // SAFETY: the `filled` permit guarantees the slot at the read cursor has
        // been populated by a writer that already released the write lock, and
        // the read lock guarantees no other reader targets it.
        let slot = unsafe { &mut *self.slots[*cursor].0.get() };
        let out = f(&*slot);
        slot.clear();
        *cursor = advance(*cursor, self.config.capacity);

        drop(cursor);
        filled.forget();
        self.free.release();
        Ok(out)
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("config", &self.config)
            .field("occupancy", &self.occupancy())
            .field("open_count", &self.open_count())
            .finish_non_exhaustive()
    }
}
