//! Ring geometry and cursor arithmetic.
//!
//! - Configuration with positivity validation
//! - Cursor advance with wraparound for arbitrary (non power-of-two) capacities

use crate::error::RingError;

/// Geometry of a ring buffer: how many slots, and how many bytes each holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Number of slots in the ring.
    pub capacity: usize,
    /// Maximum number of bytes one slot can hold.
    pub slot_width: usize,
}

impl RingConfig {
    /// Validates a ring geometry.
    ///
    /// # Errors
    /// [`RingError::InvalidConfiguration`] if either dimension is zero.
    ///
    /// # Example
    /// ```
    /// use slotfifo_ring::RingConfig;
    /// let cfg = RingConfig::new(3, 8).unwrap();
    /// assert_eq!(cfg.storage_bytes(), Some(24));
    /// assert!(RingConfig::new(0, 8).is_err());
    /// ```
    pub fn new(capacity: usize, slot_width: usize) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::InvalidConfiguration { field: "capacity" });
        }
        if slot_width == 0 {
            return Err(RingError::InvalidConfiguration {
                field: "slot_width",
            });
        }
        Ok(Self {
            capacity,
            slot_width,
        })
    }

    /// Total bytes of slot storage, or `None` if it does not fit in `usize`.
    pub fn storage_bytes(&self) -> Option<usize> {
        self.capacity.checked_mul(self.slot_width)
    }
}

/// Advances a cursor by one slot, wrapping at `capacity`.
///
/// Equivalent to `(index + 1) % capacity` for `index < capacity`, without the
/// division.
///
/// ```text
/// capacity = 3
/// 0 → 1 → 2 → 0 → 1 ...
/// ```
#[inline(always)]
pub fn advance(index: usize, capacity: usize) -> usize {
    let next = index + 1;
    if next == capacity { 0 } else { next }
}
