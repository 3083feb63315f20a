use slotfifo_ring::{Interrupt, RingBuffer};
use std::sync::Barrier;
use std::time::Instant;

// ─── Statistics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub median: u64,
    pub stddev: f64,
    pub p50: u64,
    pub p75: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchResult {
    pub name: String,
    pub unit: String,
    pub stats: Stats,
}

pub fn compute_stats(samples: &mut [u64]) -> Stats {
    assert!(!samples.is_empty(), "cannot compute stats on empty samples");
    samples.sort_unstable();

    let count = samples.len();
    let sum: u64 = samples.iter().sum();
    let mean = sum as f64 / count as f64;

    let variance = samples
        .iter()
        .map(|&x| {
            let diff = x as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;

    Stats {
        min: samples[0],
        max: samples[count - 1],
        mean,
        median: percentile_sorted(samples, 50.0),
        stddev: variance.sqrt(),
        p50: percentile_sorted(samples, 50.0),
        p75: percentile_sorted(samples, 75.0),
        p90: percentile_sorted(samples, 90.0),
        p95: percentile_sorted(samples, 95.0),
        p99: percentile_sorted(samples, 99.0),
        p999: percentile_sorted(samples, 99.9),
        count,
    }
}

fn percentile_sorted(sorted: &[u64], pct: f64) -> u64 {
    let len = sorted.len();
    if len == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0 * len as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(len - 1);
    sorted[idx]
}

// ─── Measurement Harness ────────────────────────────────────────────────────

pub fn measure_batched<F: FnMut()>(
    name: &str,
    batches: usize,
    batch_size: usize,
    warmup: usize,
    mut f: F,
) -> BenchResult {
    for _ in 0..warmup * batch_size {
        f();
    }

    let mut samples = Vec::with_capacity(batches);
    for _ in 0..batches {
        let start = Instant::now();
        for _ in 0..batch_size {
            f();
        }
        let total = start.elapsed().as_nanos();
        let per_op = ((total + (batch_size as u128 / 2)) / batch_size as u128) as u64;
        samples.push(per_op.max(1));
    }

    BenchResult {
        name: name.to_string(),
        unit: "ns/op".to_string(),
        stats: compute_stats(&mut samples),
    }
}

/// Round-trip latency between two threads over a pair of rings.
///
/// The pinger writes into `there`, the ponger echoes every message into
/// `back`; each sample is one full round trip, so it includes two blocking
/// handoffs.
pub fn ping_pong(name: &str, capacity: usize, slot_width: usize, rounds: usize) -> BenchResult {
    let there = RingBuffer::create(capacity, slot_width).expect("ring geometry");
    let back = RingBuffer::create(capacity, slot_width).expect("ring geometry");
    let interrupt = Interrupt::new();
    let payload = vec![0xA5u8; slot_width];
    let ready = Barrier::new(2);

    let mut samples = Vec::with_capacity(rounds);
    std::thread::scope(|s| {
        s.spawn(|| {
            ready.wait();
            let mut buf = vec![0u8; slot_width];
            for _ in 0..rounds {
                let t = there.read_into(&mut buf, &interrupt).expect("ponger read");
                back.write(&buf[..t.len], &interrupt).expect("ponger write");
            }
        });

        ready.wait();
        let mut buf = vec![0u8; slot_width];
        for _ in 0..rounds {
            let start = Instant::now();
            there.write(&payload, &interrupt).expect("pinger write");
            back.read_into(&mut buf, &interrupt).expect("pinger read");
            samples.push(start.elapsed().as_nanos() as u64);
        }
    });

    BenchResult {
        name: name.to_string(),
        unit: "ns/rtt".to_string(),
        stats: compute_stats(&mut samples),
    }
}

/// Messages per second moved by `producers` writers and `consumers` readers.
pub fn throughput(
    capacity: usize,
    slot_width: usize,
    producers: usize,
    consumers: usize,
    per_producer: usize,
) -> f64 {
    let ring = RingBuffer::create(capacity, slot_width).expect("ring geometry");
    let interrupt = Interrupt::new();
    let total = producers * per_producer;
    let payload = vec![0x5Au8; slot_width];
    let start_line = Barrier::new(producers + consumers + 1);

    let start = std::thread::scope(|s| {
        for _ in 0..producers {
            s.spawn(|| {
                start_line.wait();
                for _ in 0..per_producer {
                    ring.write(&payload, &interrupt).expect("producer write");
                }
            });
        }
        for c in 0..consumers {
            let share = total / consumers + usize::from(c < total % consumers);
            let (ring, interrupt, start_line) = (&ring, &interrupt, &start_line);
            s.spawn(move || {
                start_line.wait();
                let mut buf = vec![0u8; slot_width];
                for _ in 0..share {
                    ring.read_into(&mut buf, interrupt).expect("consumer read");
                }
            });
        }
        start_line.wait();
        Instant::now()
    });

    total as f64 / start.elapsed().as_secs_f64()
}

// ─── Helpers ────────────────────────────────────────────────────────────────

pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}

pub fn print_result_row(r: &BenchResult) {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {}",
        r.name,
        r.stats.min,
        r.stats.p50,
        r.stats.p75,
        r.stats.p90,
        r.stats.p99,
        r.stats.p999,
        r.stats.max,
        r.unit,
    );
}

pub fn print_table_header() {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p75", "p90", "p99", "p99.9", "max",
    );
    println!("  {}", "─".repeat(100));
}

pub fn section_header(title: &str) {
    println!("\n{}", "─".repeat(90));
    println!("  {title}");
    println!("{}\n", "─".repeat(90));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_of_a_known_series() {
        let mut samples: Vec<u64> = (1..=100).collect();
        let stats = compute_stats(&mut samples);
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 100);
        assert_eq!(stats.p50, 50);
        assert_eq!(stats.p90, 90);
        assert_eq!(stats.p99, 99);
        assert_eq!(stats.count, 100);
        assert!((stats.mean - 50.5).abs() < 1e-9);
    }

    #[test]
    fn single_sample() {
        let stats = compute_stats(&mut [42]);
        assert_eq!((stats.min, stats.p999, stats.max), (42, 42, 42));
        assert_eq!(stats.stddev, 0.0);
    }

    #[test]
    fn ping_pong_collects_one_sample_per_round() {
        let r = ping_pong("pp", 1, 8, 50);
        assert_eq!(r.stats.count, 50);
        assert_eq!(r.unit, "ns/rtt");
    }

    #[test]
    fn format_count_units() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_500), "1.5K");
        assert_eq!(format_count(2_000_000), "2.00M");
    }
}
