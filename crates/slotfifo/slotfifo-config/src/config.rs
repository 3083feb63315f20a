use serde::Deserialize;
use std::path::Path;

/// Startup parameters of the FIFO device.
///
/// Every key is optional; a missing file section falls back to the defaults
/// below.
///
/// ```toml
/// endpoint = "fifo"
/// capacity = 16
/// slot_width = 64
/// log_level = "info"
///
/// [greeter]
/// endpoint = "kMod"
/// message = "Hi"
///
/// [exercise]
/// producers = 2
/// consumers = 2
/// messages_per_producer = 1000
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FifoConfig {
    /// Name the ring is registered under.
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,
    /// Number of slots.
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    /// Bytes per slot.
    #[serde(default = "defaults::slot_width")]
    pub slot_width: usize,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub greeter: GreeterConfig,
    #[serde(default)]
    pub exercise: ExerciseConfig,
}

/// The constant-greeting sample device.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GreeterConfig {
    #[serde(default = "defaults::greeter_endpoint")]
    pub endpoint: String,
    #[serde(default = "defaults::greeting")]
    pub message: String,
}

/// Producer/consumer run performed by the `fifod` harness.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExerciseConfig {
    #[serde(default = "defaults::producers")]
    pub producers: usize,
    #[serde(default = "defaults::consumers")]
    pub consumers: usize,
    #[serde(default = "defaults::messages_per_producer")]
    pub messages_per_producer: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn endpoint() -> String {
        "fifo".into()
    }

    pub fn capacity() -> usize {
        16
    }

    pub fn slot_width() -> usize {
        64
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn greeter_endpoint() -> String {
        "kMod".into()
    }

    pub fn greeting() -> String {
        "Hi".into()
    }

    pub fn producers() -> usize {
        2
    }

    pub fn consumers() -> usize {
        2
    }

    pub fn messages_per_producer() -> usize {
        1_000
    }
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            capacity: defaults::capacity(),
            slot_width: defaults::slot_width(),
            log_level: defaults::log_level(),
            greeter: GreeterConfig::default(),
            exercise: ExerciseConfig::default(),
        }
    }
}

impl Default for GreeterConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::greeter_endpoint(),
            message: defaults::greeting(),
        }
    }
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            producers: defaults::producers(),
            consumers: defaults::consumers(),
            messages_per_producer: defaults::messages_per_producer(),
        }
    }
}

impl FifoConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&toml_to_str)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let fifo_config: FifoConfig = toml::from_str(s)?;
        Ok(fifo_config)
    }
}
