use crate::driver::{Driver, FileHandle};
use crate::error::DeviceError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Name → driver table.
///
/// Registration and lookup are the only shared state; once a file is open the
/// registry is out of the data path.
#[derive(Default)]
pub struct Registry {
    devices: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `driver` under `name`.
    ///
    /// # Errors
    /// - [`DeviceError::InvalidName`] for an empty name
    /// - [`DeviceError::AlreadyRegistered`] if the name is taken
    pub fn register(&self, name: &str, driver: Arc<dyn Driver>) -> Result<(), DeviceError> {
        if name.is_empty() {
            return Err(DeviceError::InvalidName);
        }

        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        if devices.contains_key(name) {
            return Err(DeviceError::AlreadyRegistered(name.to_owned()));
        }
        devices.insert(name.to_owned(), driver);
        info!(device = name, "device registered");
        Ok(())
    }

    /// Removes `name` and hands back its driver.
    ///
    /// Files already open on the device keep working; only new opens fail.
    pub fn deregister(&self, name: &str) -> Result<Arc<dyn Driver>, DeviceError> {
        let driver = self
            .devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .ok_or_else(|| DeviceError::NotRegistered(name.to_owned()))?;
        info!(device = name, "device unregistered");
        Ok(driver)
    }

    /// Opens a file on the device registered as `name`.
    pub fn open(&self, name: &str) -> Result<Box<dyn FileHandle>, DeviceError> {
        // Clone the driver out so `Driver::open` runs without the table lock.
        let driver = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| DeviceError::NotRegistered(name.to_owned()))?;
        debug!(device = name, "opening device");
        driver.open()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }
}
