use std::collections::TryReserveError;

/// One fixed-capacity byte buffer of the ring.
///
/// Storage is allocated once at `width` bytes and never resized. `len` records
/// how much of it the last write filled, so readers get back exactly what was
/// written rather than the whole width.
#[derive(Debug)]
pub(crate) struct Slot {
    bytes: Box<[u8]>,
    len: usize,
}

impl Slot {
    /// Allocates a zeroed slot, reporting allocation failure instead of aborting.
    pub(crate) fn zeroed(width: usize) -> Result<Self, TryReserveError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(width)?;
        bytes.resize(width, 0);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
            len: 0,
        })
    }

    /// Bytes stored by the last fill.
    #[inline]
    pub(crate) fn contents(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Replaces the contents with the first `min(data.len(), width)` bytes of `data`.
    ///
    /// Returns the number of bytes stored.
    pub(crate) fn fill(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.bytes.len());
        self.bytes[..n].copy_from_slice(&data[..n]);
        self.len = n;
        n
    }

    /// Marks the slot empty. Storage is kept for the next generation.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_truncates_to_width() {
        let mut slot = Slot::zeroed(4).unwrap();
        assert_eq!(slot.fill(b"HELLO"), 4);
        assert_eq!(slot.contents(), b"HELL");
        assert_eq!(slot.bytes.len(), 4);
    }

    #[test]
    fn short_fill_hides_stale_bytes() {
        let mut slot = Slot::zeroed(8).unwrap();
        slot.fill(b"ABCDEFGH");
        slot.clear();
        assert!(slot.contents().is_empty());

        slot.fill(b"xy");
        assert_eq!(slot.contents(), b"xy");
    }

    #[test]
    fn impossible_width_is_an_error() {
        assert!(Slot::zeroed(usize::MAX).is_err());
    }
}
