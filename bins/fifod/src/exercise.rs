// Producer/consumer run over registry file handles.
//
// Every producer writes `messages_per_producer` tagged messages, the consumers
// split the total between them, and the run fails unless the multiset of
// messages read equals the multiset written.

use anyhow::{Context, Result, anyhow, bail, ensure};
use slotfifo_config::FifoConfig;
use slotfifo_device::{DeviceError, Interrupt, Registry};
use std::collections::HashMap;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Report {
    pub messages: usize,
    pub elapsed: Duration,
}

impl Report {
    pub fn rate(&self) -> f64 {
        self.messages as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }
}

fn message(producer: usize, seq: usize) -> String {
    format!("p{producer}-{seq}")
}

/// Joins a worker; a panic raises `interrupt` so the remaining workers unblock
/// before the scope joins them.
fn join<T>(
    handle: ScopedJoinHandle<'_, Result<T, DeviceError>>,
    interrupt: &Interrupt,
    who: &str,
) -> Result<Result<T, DeviceError>> {
    handle.join().map_err(|_| {
        interrupt.raise();
        anyhow!("{who} panicked")
    })
}

pub fn run(registry: &Registry, endpoint: &str, config: &FifoConfig) -> Result<Report> {
    let ex = &config.exercise;
    ensure!(
        ex.producers > 0 && ex.consumers > 0,
        "exercise needs at least one producer and one consumer"
    );
    let total = ex
        .producers
        .checked_mul(ex.messages_per_producer)
        .context("exercise message count does not fit in usize")?;
    let longest = message(ex.producers - 1, ex.messages_per_producer.saturating_sub(1));
    ensure!(
        longest.len() <= config.slot_width,
        "slot_width {} cannot hold message '{longest}'",
        config.slot_width
    );

    info!(
        endpoint,
        producers = ex.producers,
        consumers = ex.consumers,
        total,
        "starting exercise"
    );

    let interrupt = Interrupt::new();
    let start = Instant::now();

    let received: Vec<String> = thread::scope(|s| -> Result<Vec<String>> {
        let mut producers = Vec::with_capacity(ex.producers);
        for p in 0..ex.producers {
            let interrupt = &interrupt;
            let handle = thread::Builder::new()
                .name(format!("producer-{p}"))
                .spawn_scoped(s, move || -> Result<(), DeviceError> {
                    let produce = || -> Result<(), DeviceError> {
                        let mut file = registry.open(endpoint)?;
                        for k in 0..ex.messages_per_producer {
                            file.write(message(p, k).as_bytes(), interrupt)?;
                        }
                        debug!(producer = p, "producer done");
                        Ok(())
                    };
                    // Unblock the other side so the scope can finish.
                    produce().inspect_err(|_| interrupt.raise())
                })
                .inspect_err(|_| interrupt.raise())
                .context("failed to spawn producer")?;
            producers.push(handle);
        }

        let mut consumers = Vec::with_capacity(ex.consumers);
        for c in 0..ex.consumers {
            let share = total / ex.consumers + usize::from(c < total % ex.consumers);
            let interrupt = &interrupt;
            let slot_width = config.slot_width;
            let handle = thread::Builder::new()
                .name(format!("consumer-{c}"))
                .spawn_scoped(s, move || -> Result<Vec<String>, DeviceError> {
                    let consume = || -> Result<Vec<String>, DeviceError> {
                        let mut file = registry.open(endpoint)?;
                        let mut buf = vec![0u8; slot_width];
                        let mut got = Vec::with_capacity(share);
                        for _ in 0..share {
                            let n = file.read(&mut buf, interrupt)?;
                            got.push(String::from_utf8_lossy(&buf[..n]).into_owned());
                        }
                        debug!(consumer = c, read = got.len(), "consumer done");
                        Ok(got)
                    };
                    consume().inspect_err(|_| interrupt.raise())
                })
                .inspect_err(|_| interrupt.raise())
                .context("failed to spawn consumer")?;
            consumers.push(handle);
        }

        // Report the failure that started it, not the interrupts it caused.
        let mut failure: Option<DeviceError> = None;
        let mut keep = |e: DeviceError| {
            if failure.as_ref().is_none_or(DeviceError::is_interrupted) {
                failure = Some(e);
            }
        };

        for handle in producers {
            join(handle, &interrupt, "producer")?.unwrap_or_else(&mut keep);
        }
        let mut received = Vec::with_capacity(total);
        for handle in consumers {
            match join(handle, &interrupt, "consumer")? {
                Ok(got) => received.extend(got),
                Err(e) => keep(e),
            }
        }

        match failure {
            Some(e) => Err(e).context("exercise aborted"),
            None => Ok(received),
        }
    })?;

    let elapsed = start.elapsed();

    let mut counts: HashMap<String, usize> = HashMap::with_capacity(total);
    for msg in received {
        *counts.entry(msg).or_default() += 1;
    }
    for p in 0..ex.producers {
        for k in 0..ex.messages_per_producer {
            let msg = message(p, k);
            match counts.get(&msg) {
                Some(1) => {}
                Some(n) => bail!("message '{msg}' received {n} times"),
                None => bail!("message '{msg}' was lost"),
            }
        }
    }
    ensure!(counts.len() == total, "received messages nobody wrote");

    Ok(Report {
        messages: total,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotfifo_device::FifoModule;

    fn config(capacity: usize, producers: usize, consumers: usize, per: usize) -> FifoConfig {
        let mut config = FifoConfig {
            capacity,
            ..FifoConfig::default()
        };
        config.exercise.producers = producers;
        config.exercise.consumers = consumers;
        config.exercise.messages_per_producer = per;
        config
    }

    #[test]
    fn every_message_arrives_once() {
        let config = config(2, 3, 2, 50);
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config).unwrap();

        let report = run(&registry, module.endpoint(), &config).unwrap();
        assert_eq!(report.messages, 150);
        assert_eq!(module.unload(&registry).unwrap(), 0);
    }

    #[test]
    fn oversized_message_count_is_rejected() {
        let config = config(2, usize::MAX, 1, 2);
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config).unwrap();

        let err = run(&registry, module.endpoint(), &config).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
        assert_eq!(module.ring().open_count(), 0);
    }

    #[test]
    fn panicked_worker_releases_blocked_peers() {
        let config = config(1, 1, 1, 1);
        let registry = Registry::new();
        let module = FifoModule::load(&registry, &config).unwrap();
        let interrupt = Interrupt::new();

        let err = thread::scope(|s| {
            let blocked = s.spawn(|| -> Result<usize, DeviceError> {
                let mut file = registry.open(module.endpoint())?;
                file.read(&mut [0u8; 8], &interrupt)
            });
            let failed = s.spawn(|| -> Result<(), DeviceError> { panic!("worker failed") });

            let err = join(failed, &interrupt, "producer").unwrap_err();
            assert!(blocked.join().unwrap().unwrap_err().is_interrupted());
            err
        });

        assert_eq!(err.to_string(), "producer panicked");
        assert!(interrupt.is_raised());
    }
}
