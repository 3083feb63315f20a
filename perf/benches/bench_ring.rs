use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use slotfifo_ring::{Interrupt, RingBuffer};

const SLOT_WIDTH: usize = 64;

fn bench_write_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    for capacity in [1usize, 64] {
        let ring = RingBuffer::create(capacity, SLOT_WIDTH).expect("failed to create ring");
        let interrupt = Interrupt::new();
        let payload = [0x42u8; SLOT_WIDTH];
        let mut buf = [0u8; SLOT_WIDTH];

        group.bench_with_input(
            BenchmarkId::new("write+read_into", capacity),
            &capacity,
            |b, _| {
                b.iter(|| {
                    ring.write(black_box(&payload), &interrupt).unwrap();
                    black_box(ring.read_into(&mut buf, &interrupt).unwrap());
                });
            },
        );
    }

    drop(group);
}

fn bench_fill_drain(c: &mut Criterion) {
    let capacity = 256;
    let ring = RingBuffer::create(capacity, SLOT_WIDTH).expect("failed to create ring");
    let interrupt = Interrupt::new();
    let payload = [0x42u8; SLOT_WIDTH];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(capacity as u64));

    group.bench_function("fill+drain (256)", |b| {
        b.iter(|| {
            for _ in 0..capacity {
                ring.write(black_box(&payload), &interrupt).unwrap();
            }
            for _ in 0..capacity {
                black_box(ring.read(SLOT_WIDTH, &interrupt).unwrap());
            }
        });
    });

    drop(group);
}

fn bench_truncating_write(c: &mut Criterion) {
    let ring = RingBuffer::create(1, 8).expect("failed to create ring");
    let interrupt = Interrupt::new();
    let payload = [0x42u8; 4096];
    let mut buf = [0u8; 8];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("write (truncated 4096→8)", |b| {
        b.iter(|| {
            ring.write(black_box(&payload), &interrupt).unwrap();
            ring.read_into(&mut buf, &interrupt).unwrap();
        });
    });

    drop(group);
}

fn bench_ping_pong(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.sample_size(20);

    group.bench_function("ping-pong x1000 (cap=1)", |b| {
        b.iter(|| black_box(slotfifo_perf::ping_pong("bench", 1, SLOT_WIDTH, 1_000)));
    });

    drop(group);
}

criterion_group!(
    benches,
    bench_write_read,
    bench_fill_drain,
    bench_truncating_write,
    bench_ping_pong
);
criterion_main!(benches);
