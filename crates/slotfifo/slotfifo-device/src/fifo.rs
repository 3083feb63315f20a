//! FIFO device: a [`RingBuffer`] exposed through the registry.
//!
//! [`FifoModule`] owns the load/unload lifecycle:
//!
//! ```text
//! load:   validate config ─► allocate ring ─► register endpoint
//! unload: refuse if files open ─► deregister endpoint ─► destroy ring
//! ```
//!
//! The ring is allocated before the endpoint is registered, so a failed load
//! leaves nothing behind in the registry.

use crate::driver::{Driver, FileHandle};
use crate::error::{DeviceError, UnloadError};
use crate::registry::Registry;
use slotfifo_config::FifoConfig;
use slotfifo_ring::{Interrupt, RingBuffer, RingConfig, Session};
use std::sync::Arc;
use tracing::{info, trace, warn};

/// Driver whose files are sessions on a shared ring.
pub struct FifoDriver {
    ring: Arc<RingBuffer>,
}

/// An open file on the FIFO device.
#[derive(Debug)]
pub struct FifoFile {
    session: Session,
}

impl FifoDriver {
    pub fn new(ring: Arc<RingBuffer>) -> Self {
        Self { ring }
    }
}

impl Driver for FifoDriver {
    fn open(&self) -> Result<Box<dyn FileHandle>, DeviceError> {
        Ok(Box::new(FifoFile {
            session: self.ring.open(),
        }))
    }
}

impl FileHandle for FifoFile {
    /// Takes one message; at most `buf.len()` bytes of it are kept.
    fn read(&mut self, buf: &mut [u8], interrupt: &Interrupt) -> Result<usize, DeviceError> {
        let t = self.session.read_into(buf, interrupt)?;
        trace!(len = t.len, truncated = t.truncated, "fifo read");
        Ok(t.len)
    }

    /// Stores one message of at most `slot_width` bytes.
    fn write(&mut self, buf: &[u8], interrupt: &Interrupt) -> Result<usize, DeviceError> {
        let t = self.session.write(buf, interrupt)?;
        trace!(len = t.len, truncated = t.truncated, "fifo write");
        Ok(t.len)
    }
}

/// A loaded FIFO device: the ring plus its registration.
#[derive(Debug)]
pub struct FifoModule {
    endpoint: String,
    ring: Arc<RingBuffer>,
}

impl FifoModule {
    /// Allocates the ring described by `config` and registers it as `config.endpoint`.
    ///
    /// # Errors
    /// - [`DeviceError::Ring`] for a zero capacity/slot width or a failed allocation
    /// - [`DeviceError::InvalidName`] / [`DeviceError::AlreadyRegistered`] from
    ///   the registry; the freshly allocated ring is released again
    pub fn load(registry: &Registry, config: &FifoConfig) -> Result<Self, DeviceError> {
        let ring_config = RingConfig::new(config.capacity, config.slot_width)?;
        let ring = Arc::new(RingBuffer::with_config(ring_config)?);

        registry.register(&config.endpoint, Arc::new(FifoDriver::new(Arc::clone(&ring))))?;

        info!(
            endpoint = %config.endpoint,
            capacity = config.capacity,
            slot_width = config.slot_width,
            "fifo module loaded"
        );
        Ok(Self {
            endpoint: config.endpoint.clone(),
            ring,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    /// Deregisters the endpoint and destroys the ring.
    ///
    /// Returns the number of unread messages that were discarded.
    ///
    /// # Errors
    /// Both hand the module back inside [`UnloadError`]:
    /// - [`DeviceError::Busy`] while any file on the device is still open
    /// - [`DeviceError::StillReferenced`] if no file is open but a driver
    ///   handle for the ring is held outside the registry
    ///
    /// The endpoint is restored only if this call was the one that removed it.
    pub fn unload(self, registry: &Registry) -> Result<usize, UnloadError> {
        let open = self.ring.open_count();
        if open > 0 {
            let reason = DeviceError::Busy {
                name: self.endpoint.clone(),
                open,
            };
            return Err(self.refuse(reason));
        }

        let removed = match registry.deregister(&self.endpoint) {
            Ok(_) => true,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "endpoint was already gone");
                false
            }
        };

        let FifoModule { endpoint, ring } = self;
        match Arc::try_unwrap(ring) {
            Ok(ring) => {
                let unread = ring.destroy();
                info!(%endpoint, unread, "fifo module unloaded");
                Ok(unread)
            }
            Err(ring) => {
                let module = FifoModule { endpoint, ring };
                if removed {
                    let driver = Arc::new(FifoDriver::new(Arc::clone(&module.ring)));
                    if let Err(e) = registry.register(&module.endpoint, driver) {
                        warn!(endpoint = %module.endpoint, error = %e, "could not restore endpoint");
                    }
                }
                let reason = match module.ring.open_count() {
                    0 => DeviceError::StillReferenced(module.endpoint.clone()),
                    // A file opened between the check and the deregistration.
                    open => DeviceError::Busy {
                        name: module.endpoint.clone(),
                        open,
                    },
                };
                Err(module.refuse(reason))
            }
        }
    }

    fn refuse(self, reason: DeviceError) -> UnloadError {
        UnloadError {
            reason,
            module: self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str, capacity: usize, slot_width: usize) -> FifoConfig {
        FifoConfig {
            endpoint: endpoint.into(),
            capacity,
            slot_width,
            ..FifoConfig::default()
        }
    }

    #[test]
    fn file_round_trip_through_the_registry() {
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config("fifo", 2, 4)).unwrap();
        let interrupt = Interrupt::new();

        let mut writer = registry.open("fifo").unwrap();
        let mut reader = registry.open("fifo").unwrap();
        assert_eq!(module.ring().open_count(), 2);

        assert_eq!(writer.write(b"HELLO", &interrupt).unwrap(), 4);
        let mut buf = [0u8; 8];
        let n = reader.read(&mut buf, &interrupt).unwrap();
        assert_eq!(&buf[..n], b"HELL");

        drop((writer, reader));
        assert_eq!(module.unload(&registry).unwrap(), 0);
        assert!(!registry.contains("fifo"));
    }

    #[test]
    fn invalid_geometry_registers_nothing() {
        let registry = Registry::new();
        let err = FifoModule::load(&registry, &config("fifo", 0, 4)).unwrap_err();
        assert!(matches!(err, DeviceError::Ring(_)));
        assert!(registry.names().is_empty());
    }

    #[test]
    fn unload_with_open_file_is_refused() {
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config("fifo", 1, 4)).unwrap();
        let file = registry.open("fifo").unwrap();

        let err = module.unload(&registry).unwrap_err();
        assert!(matches!(
            err.reason,
            DeviceError::Busy { ref name, open: 1 } if name == "fifo"
        ));
        assert!(registry.contains("fifo"));

        drop(file);
        assert_eq!(err.module.unload(&registry).unwrap(), 0);
    }

    #[test]
    fn unload_does_not_restore_an_endpoint_it_did_not_remove() {
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config("fifo", 1, 4)).unwrap();
        let held = registry.deregister("fifo").unwrap();

        let err = module.unload(&registry).unwrap_err();
        assert!(matches!(
            err.reason,
            DeviceError::StillReferenced(ref name) if name == "fifo"
        ));
        assert!(!registry.contains("fifo"));

        drop(held);
        assert_eq!(err.module.unload(&registry).unwrap(), 0);
        assert!(!registry.contains("fifo"));
    }

    #[test]
    fn unload_restores_the_endpoint_it_removed() {
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config("fifo", 1, 4)).unwrap();
        // A second driver for the same ring, held outside the registry.
        let extra = FifoDriver::new(Arc::clone(&module.ring));

        let err = module.unload(&registry).unwrap_err();
        assert!(matches!(err.reason, DeviceError::StillReferenced(_)));
        assert!(registry.contains("fifo"));

        drop(extra);
        assert_eq!(err.module.unload(&registry).unwrap(), 0);
        assert!(!registry.contains("fifo"));
    }

    #[test]
    fn unload_reports_unread_messages() {
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config("fifo", 3, 4)).unwrap();
        {
            let mut file = registry.open("fifo").unwrap();
            file.write(b"a", &Interrupt::new()).unwrap();
            file.write(b"b", &Interrupt::new()).unwrap();
        }
        assert_eq!(module.unload(&registry).unwrap(), 2);
    }

    #[test]
    fn interrupted_device_read_is_reported() {
        let registry = Registry::new();
        let _module = FifoModule::load(&registry, &config("fifo", 1, 4)).unwrap();
        let mut file = registry.open("fifo").unwrap();
        let interrupt = Interrupt::new();

        std::thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut buf = [0u8; 4];
                file.read(&mut buf, &interrupt)
            });
            std::thread::sleep(std::time::Duration::from_millis(20));
            interrupt.raise();
            assert!(reader.join().unwrap().unwrap_err().is_interrupted());
        });
    }
}
