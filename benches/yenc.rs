//! Benchmarks for streaming yEnc decoding and CRC stitching
//!
//! Decode throughput is the critical path for Usenet binary downloads: the
//! decoder sits between every socket read and the disk.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use nntp_codec::{crc32, crc32_combine, yenc, Decoder};

/// Build a complete single-part article response around `size` payload bytes.
fn generate_article(size: usize) -> Vec<u8> {
    let payload: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    let (body, crc) = yenc::encode(&payload);

    let mut wire = Vec::with_capacity(body.len() + 128);
    wire.extend_from_slice(b"222 0 <bench@local>\r\n");
    wire.extend_from_slice(format!("=ybegin line=128 size={size} name=bench.bin\r\n").as_bytes());
    wire.extend_from_slice(&body);
    wire.extend_from_slice(format!("\r\n=yend size={size} crc32={crc:08x}\r\n.\r\n").as_bytes());
    wire
}

fn bench_streaming_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming_decode");

    // Typical article sizes from 1KB up to a full 10MB part
    for size in [1_024, 102_400, 1_024_000, 10_240_000usize].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        let wire = generate_article(*size);
        // Socket-sized writes
        let read_size = 64 * 1024;

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}KB", size / 1024)),
            size,
            |b, _| {
                b.iter(|| {
                    let mut decoder = Decoder::new(256 * 1024);
                    for piece in wire.chunks(read_size) {
                        decoder.buffer_mut()[..piece.len()].copy_from_slice(piece);
                        decoder.process(piece.len()).unwrap();
                    }
                    black_box((&mut decoder).next())
                });
            },
        );
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [102_400, 1_024_000usize].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        let payload: Vec<u8> = (0..*size).map(|i| (i % 256) as u8).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}KB", size / 1024)),
            size,
            |b, _| {
                b.iter(|| yenc::encode(black_box(&payload)));
            },
        );
    }

    group.finish();
}

fn bench_crc_combine(c: &mut Criterion) {
    // Combining is O(log n) in the second length; compare against rescanning
    let part: Vec<u8> = (0..1_000_000).map(|i| (i % 251) as u8).collect();
    let crc_a = crc32(&part, 0);
    let crc_b = crc32(&part, 0);

    c.bench_function("crc32_combine_1MB", |b| {
        b.iter(|| crc32_combine(black_box(crc_a), black_box(crc_b), part.len() as u64));
    });

    c.bench_function("crc32_rescan_1MB", |b| {
        b.iter(|| crc32(black_box(&part), crc_a));
    });
}

criterion_group!(
    benches,
    bench_streaming_decode,
    bench_encode,
    bench_crc_combine
);
criterion_main!(benches);
