use crate::error::DeviceError;
use slotfifo_ring::Interrupt;

/// A device that can be registered in a [`Registry`](crate::Registry).
pub trait Driver: Send + Sync {
    /// Opens a new file on the device. Closing is dropping the handle.
    fn open(&self) -> Result<Box<dyn FileHandle>, DeviceError>;
}

/// One open file on a device.
///
/// `buf` plays the role of the caller's memory: `read` copies into it,
/// `write` copies out of it. Both return the number of bytes transferred.
pub trait FileHandle: Send {
    fn read(&mut self, buf: &mut [u8], interrupt: &Interrupt) -> Result<usize, DeviceError>;

    fn write(&mut self, buf: &[u8], interrupt: &Interrupt) -> Result<usize, DeviceError>;
}
