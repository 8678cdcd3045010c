// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The segment pool (spec §3 "Pool partition", §4.2): a thread-partitioned free
//! list of recycled [`Segment`]s with a global overflow partition, replacing the
//! `shared-pool`-feature toggle this crate used to carry (see `DESIGN.md`).

use std::sync::{Arc, Mutex};
use once_cell::sync::Lazy;
use crate::config::EngineConfig;
use crate::segment::DEFAULT_SEGMENT_SIZE;
use crate::util::thread_partition;
use crate::Segment;

/// Something that can hand out and take back [`Segment`]s.
pub trait Pool<const N: usize>: Send + Sync {
	/// Claims a segment, allocating a fresh one if the pool is exhausted.
	fn claim(&self) -> Segment<N>;

	/// Returns a segment to the pool. If the segment is a shared view, its copy
	/// tracker is decremented; the backing array is only recycled once the last
	/// view releases it.
	fn recycle(&self, segment: Segment<N>);

	/// Claims `count` segments at once.
	fn claim_count(&self, count: usize) -> Vec<Segment<N>> {
		(0..count).map(|_| self.claim()).collect()
	}
}

impl<const N: usize, P: Pool<N> + ?Sized> Pool<N> for Arc<P> {
	fn claim(&self) -> Segment<N> { (**self).claim() }
	fn recycle(&self, segment: Segment<N>) { (**self).recycle(segment) }
}

struct Partition<const N: usize> {
	stack: Vec<Segment<N>>,
	bytes: usize,
}

impl<const N: usize> Partition<N> {
	fn new() -> Self { Self { stack: Vec::new(), bytes: 0 } }
}

/// A thread-partitioned pool of recycled segments (spec §4.2).
///
/// Each thread hashes to one of `P` partitions for its claim/recycle fast path;
/// a partition caps at `max_partition_bytes`. Recycled segments that would
/// overflow their partition spill into a single global partition capped at
/// `max_pool_bytes`; beyond that, segments are simply dropped and left to the
/// allocator.
pub struct SegmentPool<const N: usize = DEFAULT_SEGMENT_SIZE> {
	partitions: Vec<Mutex<Partition<N>>>,
	global: Mutex<Partition<N>>,
	config: EngineConfig,
}

fn default_partition_count() -> usize {
	std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

impl<const N: usize> SegmentPool<N> {
	pub fn new() -> Self {
		Self::with_partitions(default_partition_count())
	}

	pub fn with_partitions(partitions: usize) -> Self {
		Self {
			partitions: (0..partitions.max(1)).map(|_| Mutex::new(Partition::new())).collect(),
			global: Mutex::new(Partition::new()),
			config: EngineConfig::get(),
		}
	}

	fn partition_index(&self) -> usize { thread_partition(self.partitions.len()) }
}

impl<const N: usize> Default for SegmentPool<N> {
	fn default() -> Self { Self::new() }
}

impl<const N: usize> Pool<N> for SegmentPool<N> {
	fn claim(&self) -> Segment<N> {
		let idx = self.partition_index();
		if let Ok(mut part) = self.partitions[idx].lock() {
			if let Some(seg) = part.stack.pop() {
				part.bytes -= N;
				return seg;
			}
		}
		if let Ok(mut global) = self.global.lock() {
			if let Some(seg) = global.stack.pop() {
				global.bytes -= N;
				return seg;
			}
		}
		Segment::new()
	}

	fn recycle(&self, mut segment: Segment<N>) {
		if segment.is_shared() {
			if segment.release_copy() > 0 {
				// Another view still references the backing array.
				return;
			}
		}
		segment.clear();

		let idx = self.partition_index();
		if let Ok(mut part) = self.partitions[idx].lock() {
			if part.bytes + N <= self.config.max_partition_bytes {
				part.bytes += N;
				part.stack.push(segment);
				return;
			}
		}
		if let Ok(mut global) = self.global.lock() {
			if global.bytes + N <= self.config.max_pool_bytes {
				global.bytes += N;
				global.stack.push(segment);
			}
		}
		// Otherwise the segment is dropped and its array freed normally.
	}
}

static DEFAULT_POOL: Lazy<Arc<SegmentPool<DEFAULT_SEGMENT_SIZE>>> =
	Lazy::new(|| Arc::new(SegmentPool::new()));

impl SegmentPool<DEFAULT_SEGMENT_SIZE> {
	/// The process-wide pool for the default segment size, shared by every
	/// [`crate::Buffer`] that doesn't construct its own.
	pub fn shared() -> Arc<Self> { DEFAULT_POOL.clone() }
}
