mod config;

pub use config::{ConfigError, ExerciseConfig, FifoConfig, GreeterConfig};
