mod exercise;

use anyhow::{Context, Result};
use slotfifo_config::FifoConfig;
use slotfifo_device::{FifoModule, GreetingDriver, Interrupt, Registry};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => FifoConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => FifoConfig::default(),
    };

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log_level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    let registry = Registry::new();
    let module = FifoModule::load(&registry, &config).context("failed to load fifo module")?;
    registry
        .register(
            &config.greeter.endpoint,
            Arc::new(GreetingDriver::new(&config.greeter.message)),
        )
        .context("failed to register greeter")?;

    let report = exercise::run(&registry, module.endpoint(), &config)?;
    info!(
        messages = report.messages,
        elapsed = ?report.elapsed,
        msgs_per_sec = report.rate() as u64,
        "exercise complete"
    );

    let mut greeter = registry.open(&config.greeter.endpoint)?;
    let mut buf = [0u8; 64];
    let n = greeter.read(&mut buf, &Interrupt::new())?;
    info!(greeting = %String::from_utf8_lossy(&buf[..n]), "greeter says");
    drop(greeter);

    let unread = module.unload(&registry).context("failed to unload fifo module")?;
    registry.deregister(&config.greeter.endpoint)?;
    info!(unread, "shutdown complete");
    Ok(())
}
