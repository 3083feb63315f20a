use std::hint::black_box;

use slotfifo_perf::*;
use slotfifo_ring::{Interrupt, RingBuffer};

const SLOT_WIDTH: usize = 64;

fn main() {
    let mut results: Vec<BenchResult> = Vec::new();
    let mut rates: Vec<serde_json::Value> = Vec::new();

    println!("slotfifo perf report");

    // ═══════════════════════════════════════════════════════════════════════
    // 1. Uncontended write + read on one thread
    // ═══════════════════════════════════════════════════════════════════════
    section_header("Uncontended (single thread)");
    print_table_header();
    for capacity in [1usize, 16, 1024] {
        let ring = RingBuffer::create(capacity, SLOT_WIDTH).expect("ring geometry");
        let interrupt = Interrupt::new();
        let payload = [0x11u8; SLOT_WIDTH];
        let mut buf = [0u8; SLOT_WIDTH];

        let r = measure_batched(
            &format!("write+read cap={capacity}"),
            200,
            1_000,
            5,
            || {
                ring.write(black_box(&payload), &interrupt).expect("write");
                black_box(ring.read_into(&mut buf, &interrupt).expect("read"));
            },
        );
        print_result_row(&r);
        results.push(r);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 2. Cross-thread round trip
    // ═══════════════════════════════════════════════════════════════════════
    section_header("Cross-thread round trip");
    print_table_header();
    for capacity in [1usize, 16] {
        let r = ping_pong(&format!("ping-pong cap={capacity}"), capacity, SLOT_WIDTH, 20_000);
        print_result_row(&r);
        results.push(r);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 3. Throughput
    // ═══════════════════════════════════════════════════════════════════════
    section_header("Throughput (messages/s)");
    for (producers, consumers, capacity) in [(1, 1, 16), (4, 1, 16), (1, 4, 16), (4, 4, 64)] {
        let rate = throughput(capacity, SLOT_WIDTH, producers, consumers, 50_000);
        println!(
            "  P={producers} R={consumers} cap={capacity:<4} {:>10} msg/s",
            format_count(rate as u64)
        );
        rates.push(serde_json::json!({
            "producers": producers,
            "consumers": consumers,
            "capacity": capacity,
            "msgs_per_sec": rate,
        }));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 4. JSON Output
    // ═══════════════════════════════════════════════════════════════════════
    let report = serde_json::json!({
        "slot_width": SLOT_WIDTH,
        "latency": results,
        "throughput": rates,
    });
    section_header("JSON");
    println!(
        "{}",
        serde_json::to_string_pretty(&report).expect("report serializes")
    );
}
