// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use fluxio::pool::SegmentPool;
use fluxio::{Buffer, Pipe};

const SIZE: usize = fluxio::SEGMENT_SIZE;
const DATA: &[u8] = &[0x11; SIZE * 4];

fn write_then_read_unfolded(c: &mut Criterion) {
	let pool: Arc<SegmentPool<SIZE>> = Arc::new(SegmentPool::new());
	c.bench_function("pipe_write_then_read", |b| b.iter_batched(
		|| {
			let pipe: Pipe<SIZE, Arc<SegmentPool<SIZE>>> = Pipe::with_pool(DATA.len() * 2, pool.clone());
			let mut src = Buffer::<SIZE, Arc<SegmentPool<SIZE>>>::with_pool(pool.clone());
			src.write_bytes(DATA);
			(pipe, src)
		},
		|(pipe, mut src)| {
			let writer = pipe.writer();
			writer.write_from(&mut src, DATA.len()).unwrap();
			let reader = pipe.reader();
			let mut dst = Buffer::<SIZE, Arc<SegmentPool<SIZE>>>::with_pool(pool.clone());
			reader.read_at_most_to(&mut dst, DATA.len()).unwrap();
			dst
		},
		BatchSize::SmallInput,
	));
}

criterion_group!(benches, write_then_read_unfolded);
criterion_main!(benches);
