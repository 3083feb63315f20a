// Sample device that answers every read with a fixed greeting and swallows
// every write. Useful as a smoke test for the registry and as a second
// endpoint next to the FIFO.

use crate::driver::{Driver, FileHandle};
use crate::error::DeviceError;
use slotfifo_ring::Interrupt;
use std::sync::Arc;
use tracing::info;

pub struct GreetingDriver {
    message: Arc<[u8]>,
}

pub struct GreetingFile {
    message: Arc<[u8]>,
}

impl GreetingDriver {
    pub fn new(message: impl AsRef<[u8]>) -> Self {
        Self {
            message: Arc::from(message.as_ref()),
        }
    }
}

impl Driver for GreetingDriver {
    fn open(&self) -> Result<Box<dyn FileHandle>, DeviceError> {
        info!("greeting device opened");
        Ok(Box::new(GreetingFile {
            message: Arc::clone(&self.message),
        }))
    }
}

impl FileHandle for GreetingFile {
    /// Copies as much of the greeting as fits. Every read starts over; there
    /// is no end of file.
    fn read(&mut self, buf: &mut [u8], _interrupt: &Interrupt) -> Result<usize, DeviceError> {
        let n = buf.len().min(self.message.len());
        buf[..n].copy_from_slice(&self.message[..n]);
        Ok(n)
    }

    /// Accepts and discards everything.
    fn write(&mut self, buf: &[u8], _interrupt: &Interrupt) -> Result<usize, DeviceError> {
        info!(len = buf.len(), "greeting device swallowed bytes");
        Ok(buf.len())
    }
}

impl Drop for GreetingFile {
    fn drop(&mut self) {
        info!("greeting device closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_read_returns_the_greeting() {
        let driver = GreetingDriver::new("Hi");
        let mut file = driver.open().unwrap();
        let interrupt = Interrupt::new();

        for _ in 0..3 {
            let mut buf = [0u8; 16];
            let n = file.read(&mut buf, &interrupt).unwrap();
            assert_eq!(&buf[..n], b"Hi");
        }
    }

    #[test]
    fn greeting_is_cut_to_the_caller_buffer() {
        let driver = GreetingDriver::new("Hello there");
        let mut file = driver.open().unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf, &Interrupt::new()).unwrap(), 5);
        assert_eq!(&buf, b"Hello");
    }

    #[test]
    fn writes_report_full_length() {
        let driver = GreetingDriver::new("Hi");
        let mut file = driver.open().unwrap();
        assert_eq!(file.write(&[0u8; 1024], &Interrupt::new()).unwrap(), 1024);
    }
}
