// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![expect(missing_docs, reason = "Benchmark code")]

use std::hint::black_box;

use bytestream::{BufferedInput, BufferedOutput, DEFAULT_CAPACITY, Sink, Source, pipe};
use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

// Large enough to force several flushes and pulls through the default-sized buffers.
const TEST_DATA: &[u8] = &[88_u8; 100_000];

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    group.throughput(Throughput::Bytes(TEST_DATA.len() as u64));

    group.bench_function("write_all_read_exact", |b| {
        b.iter_batched(
            pipe,
            |(mut reader, mut writer)| {
                {
                    let mut output = BufferedOutput::new().unwrap();
                    output.bind(&mut writer);
                    output.write_all(black_box(TEST_DATA)).unwrap();
                    output.flush().unwrap();
                }

                let mut input = BufferedInput::new().unwrap();
                input.bind(&mut reader);

                let mut dest = vec![0_u8; TEST_DATA.len()];
                input.read_exact(&mut dest).unwrap();
                black_box(dest);
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("windowed_scan", |b| {
        b.iter_batched(
            || {
                let (reader, mut writer) = pipe();
                writer.write_all(TEST_DATA).unwrap();
                reader
            },
            |mut reader| {
                let mut input = BufferedInput::new().unwrap();
                input.bind(&mut reader);

                let mut sum = 0_u64;

                while let Ok(available) = input.provide_some_data(DEFAULT_CAPACITY) {
                    sum += input.data()[..available].iter().map(|&byte| u64::from(byte)).sum::<u64>();
                    input.advance_data(available);
                }

                black_box(sum);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}
