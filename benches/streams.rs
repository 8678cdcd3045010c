// SPDX-License-Identifier: Apache-2.0
//
// There's no file/socket collaborator in this crate (spec non-goal: raw I/O
// is delegated entirely to external collaborators), so this benchmarks the
// buffered reader/writer adapters against synthetic in-memory sources/sinks
// instead of a file descriptor.

use std::sync::Arc;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use fluxio::pool::SegmentPool;
use fluxio::streams::{BufferedReader, BufferedWriter};

const SIZE: usize = fluxio::SEGMENT_SIZE;
const DATA: &[u8] = &[0x55; SIZE * 8];

fn buffered_reader_expect_size(c: &mut Criterion) {
	let pool: Arc<SegmentPool<SIZE>> = Arc::new(SegmentPool::new());
	c.bench_function("buffered_reader_expect_size", |b| b.iter_batched(
		|| BufferedReader::<SIZE, _, _>::new(DATA, pool.clone()),
		|mut reader| reader.expect_size(DATA.len()).unwrap(),
		BatchSize::SmallInput,
	));
}

fn buffered_writer_write_bytes(c: &mut Criterion) {
	let pool: Arc<SegmentPool<SIZE>> = Arc::new(SegmentPool::new());
	c.bench_function("buffered_writer_write_bytes", |b| b.iter_batched(
		|| BufferedWriter::<SIZE, _, _>::new(Vec::<u8>::new(), pool.clone()),
		|mut writer| writer.write_bytes(DATA).unwrap(),
		BatchSize::SmallInput,
	));
}

criterion_group!(benches, buffered_reader_expect_size, buffered_writer_write_bytes);
criterion_main!(benches);
