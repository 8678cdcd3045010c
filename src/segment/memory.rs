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

//! The backing byte array behind a [`super::Segment`], shared copy-on-write via
//! an atomic [`CopyTracker`] (grounded in the reference-counted block pattern
//! used for pooled memory blocks elsewhere in the ecosystem).

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An atomic reference count over a shared segment backing array.
///
/// Unlike `Rc`/`Arc`'s own strong count, this tracks *sharing* specifically:
/// it starts at zero (an unshared owner) and is incremented only by
/// [`Memory::share`]. `SegmentPool::recycle` uses [`CopyTracker::remove_copy`]
/// to decide whether the array may be returned to the pool or is still
/// referenced by another view.
pub(crate) struct CopyTracker(AtomicUsize);

impl CopyTracker {
	fn new() -> Self { Self(AtomicUsize::new(0)) }

	pub(crate) fn add_copy(&self) -> usize {
		self.0.fetch_add(1, Ordering::AcqRel) + 1
	}

	/// Returns the count *before* the decrement, i.e. whether the array was
	/// shared prior to this release (spec §4.2 "if it returned *was shared
	/// before*, do not recycle"). `SegmentPool::recycle` gates on this value,
	/// not the post-decrement count, so a release that finds another live
	/// view correctly bails without freeing the array out from under it.
	pub(crate) fn remove_copy(&self) -> usize {
		self.0.fetch_sub(1, Ordering::AcqRel)
	}

	pub(crate) fn is_shared(&self) -> bool {
		self.0.load(Ordering::Acquire) > 0
	}
}

/// A boxed, pinned, fixed-size byte array plus the tracker counting shared
/// views over it.
struct MemoryData<const N: usize> {
	bytes: Pin<Box<[u8; N]>>,
	tracker: CopyTracker,
}

impl<const N: usize> MemoryData<N> {
	fn new() -> Self {
		Self {
			bytes: Pin::new(Box::new([0; N])),
			tracker: CopyTracker::new(),
		}
	}
}

/// A segment's backing array, reference-counted across all segments sharing it.
pub(crate) struct Memory<const N: usize> {
	data: Arc<MemoryData<N>>,
}

impl<const N: usize> Memory<N> {
	pub(crate) fn new() -> Self {
		Self { data: Arc::new(MemoryData::new()) }
	}

	pub(crate) fn is_shared(&self) -> bool { self.data.tracker.is_shared() }

	pub(crate) fn data(&self) -> &[u8; N] { &self.data.bytes }

	/// Mutable access to the backing array. Safe because mutation is only ever
	/// requested by an unshared owner (`Segment::data_mut`/`push_slice` assert
	/// this), so no other live view can observe the write concurrently.
	#[allow(clippy::mut_from_ref)]
	pub(crate) fn data_mut(&self) -> &mut [u8; N] {
		let ptr = Arc::as_ptr(&self.data) as *mut MemoryData<N>;
		unsafe { &mut (*ptr).bytes }
	}

	/// Creates a new view over the same array, incrementing the copy tracker.
	pub(crate) fn share(&self) -> Self {
		self.data.tracker.add_copy();
		Self { data: Arc::clone(&self.data) }
	}

	/// Clones the array's contents into a freshly allocated, unshared array.
	pub(crate) fn fork(&self) -> Self {
		let mut copy = MemoryData::new();
		copy.bytes.copy_from_slice(self.data.bytes.as_ref().get_ref());
		Self { data: Arc::new(copy) }
	}

	/// Shifts bytes `[start, end)` down to `[0, end - start)`.
	pub(crate) fn shift(&self, start: usize, end: usize) {
		let bytes = self.data_mut();
		bytes.copy_within(start..end, 0);
	}

	/// Decrements the copy tracker, returning the count from just before the
	/// decrement (non-zero means the array was shared before this call, and
	/// the pool must not recycle it). Called by the pool on recycle whenever
	/// the segment being recycled currently reports `is_shared()`.
	pub(crate) fn release_copy(&self) -> usize {
		self.data.tracker.remove_copy()
	}
}
