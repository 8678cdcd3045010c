// SPDX-License-Identifier: Apache-2.0

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use fluxio::Segment;

const SIZE: usize = fluxio::SEGMENT_SIZE;
const DATA: [u8; SIZE] = [0xab; SIZE];

fn alloc_segment(c: &mut Criterion) {
	c.bench_function("alloc_segment", |b| b.iter(Segment::<SIZE>::new));
}

fn push_slice(c: &mut Criterion) {
	c.bench_function("push_slice", |b| b.iter_batched(
		Segment::<SIZE>::new,
		|mut seg| seg.push_slice(&DATA),
		BatchSize::SmallInput,
	));
}

fn pop_into_slice(c: &mut Criterion) {
	let target = &mut [0u8; SIZE][..];
	c.bench_function("pop_into_slice", |b| b.iter_batched(
		|| {
			let mut seg = Segment::<SIZE>::new();
			seg.push_slice(&DATA);
			seg
		},
		|mut seg| seg.pop_into_slice(target),
		BatchSize::SmallInput,
	));
}

fn shared_copy(c: &mut Criterion) {
	let mut seg = Segment::<SIZE>::new();
	seg.push_slice(&DATA);
	c.bench_function("shared_copy", |b| b.iter(|| seg.shared_copy()));
}

fn split_head(c: &mut Criterion) {
	c.bench_function("split_head", |b| b.iter_batched(
		|| {
			let mut seg = Segment::<SIZE>::new();
			seg.push_slice(&DATA);
			seg
		},
		|mut seg| seg.split_head(SIZE / 2),
		BatchSize::SmallInput,
	));
}

criterion_group!(benches, alloc_segment, push_slice, pop_into_slice, shared_copy, split_head);
criterion_main!(benches);
