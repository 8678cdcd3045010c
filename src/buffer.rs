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

//! [`Buffer`]: a circular queue of [`Segment`]s implementing both a mutable
//! byte queue and an immutable snapshot source (spec §3, §4.3). This is the
//! heart of the engine.
//!
//! The queue is a `VecDeque<Segment<N>>` rather than an intrusive doubly-linked
//! list: spec §9 warns against cyclic `Rc`-linked segments and recommends an
//! arena/index-based representation instead, and a growable ring buffer *is*
//! exactly that — front/back indices instead of `prev`/`next` pointers, with
//! none of the aliasing hazard a hand-rolled linked list would invite.

mod options;
mod read;
mod write;
mod search;
mod cursor;

use std::collections::VecDeque;
use std::sync::Arc;
use once_cell::sync::OnceCell;
pub use options::BufferOptions;
pub use cursor::UnsafeCursor;
use crate::pool::{Pool, SegmentPool};
use crate::segment::DEFAULT_SEGMENT_SIZE;
use crate::{ByteString, Error, ErrorKind, OperationKind, ReadBytes, Segment, SegmentedByteString};

/// Threshold below which [`Buffer::read_byte_string`]/[`Buffer::snapshot`]
/// materialize a flat [`ByteString`] instead of a [`SegmentedByteString`]
/// (spec §3).
pub const SEGMENTING_THRESHOLD: usize = 4096;

/// A doubly-circular queue of segments: the core byte-moving primitive of the
/// engine (spec §3, §4.3). `Buffer` is single-owner and not internally
/// synchronized; callers sharing one across threads (e.g. [`crate::Pipe`])
/// must provide external synchronization.
pub struct Buffer<const N: usize = DEFAULT_SEGMENT_SIZE, P: Pool<N> = Arc<SegmentPool<N>>> {
	pool: P,
	segments: VecDeque<Segment<N>>,
	byte_size: usize,
	options: BufferOptions,
}

impl<const N: usize, P: Pool<N>> Buffer<N, P> {
	pub fn with_pool(pool: P) -> Self {
		Self::with_pool_and_options(pool, BufferOptions::default())
	}

	pub fn with_pool_and_options(pool: P, options: BufferOptions) -> Self {
		Self { pool, segments: VecDeque::new(), byte_size: 0, options }
	}

	/// A buffer that always shares and always compacts (spec §9 supplemented
	/// feature; see `SPEC_FULL.md`).
	pub fn lean(pool: P) -> Self {
		Self::with_pool_and_options(pool, BufferOptions::lean())
	}

	pub fn options(&self) -> BufferOptions { self.options }

	/// Total unread bytes across all segments.
	pub fn byte_size(&self) -> usize { self.byte_size }

	pub fn exhausted(&self) -> bool { self.byte_size == 0 }

	/// Whether at least `n` bytes are currently available without further I/O.
	pub fn request(&self, n: usize) -> bool { self.byte_size >= n }

	/// Errors with `Eos` unless at least `n` bytes are available.
	pub fn require(&self, n: usize) -> Result<(), Error> {
		if self.request(n) {
			Ok(())
		} else {
			Err(Error::eos(OperationKind::BufferRead))
		}
	}

	/// Returns the tail segment with at least `min_capacity` free bytes,
	/// reusing the current tail when it's an unshared owner with room, else
	/// claiming a fresh segment from the pool (spec §4.3.1).
	pub(crate) fn writable_tail(&mut self, min_capacity: usize) -> &mut Segment<N> {
		debug_assert!(min_capacity <= N);
		let reuse = match self.segments.back() {
			Some(tail) => tail.is_owner() && !tail.is_shared() && tail.limit() + min_capacity <= N,
			None => false,
		};
		if !reuse {
			self.segments.push_back(self.pool.claim());
		}
		self.segments.back_mut().expect("tail segment just ensured")
	}

	/// Appends bytes to the tail, claiming new segments as needed.
	pub fn write_bytes(&mut self, mut bytes: &[u8]) {
		while !bytes.is_empty() {
			let tail = self.writable_tail(1);
			let capacity = N - tail.limit();
			let take = capacity.min(bytes.len());
			tail.push_slice(&bytes[..take]);
			bytes = &bytes[take..];
			self.byte_size += take;
		}
		self.maybe_compact();
	}

	/// Writes a [`ByteString`]-like value's bytes, `offset..offset+count`.
	pub fn write(&mut self, bytes: &[u8], offset: usize, count: usize) -> Result<(), Error> {
		if offset + count > bytes.len() {
			return Err(Error::range(OperationKind::BufferWrite, "offset/count out of range"));
		}
		self.write_bytes(&bytes[offset..offset + count]);
		Ok(())
	}

	/// Recycles every segment, resetting the buffer to empty.
	pub fn clear(&mut self) {
		for seg in self.segments.drain(..) {
			self.pool.recycle(seg);
		}
		self.byte_size = 0;
	}

	/// Advances past `n` bytes, recycling fully-drained segments.
	pub fn skip(&mut self, n: usize) -> Result<(), Error> {
		self.require(n)?;
		let mut remaining = n;
		while remaining > 0 {
			let head = self.segments.front_mut().expect("bytes were available");
			let take = head.len().min(remaining);
			head.consume(take);
			remaining -= take;
			self.byte_size -= take;
			if head.is_empty() {
				let seg = self.segments.pop_front().unwrap();
				self.pool.recycle(seg);
			}
		}
		Ok(())
	}

	/// Total size of fragmentation: bytes that could be reclaimed by shifting
	/// non-tail segments, used to decide when to [`Buffer::compact`].
	fn void_size(&self) -> usize {
		self.segments.iter().map(|s| s.pos()).sum()
	}

	fn maybe_compact(&mut self) {
		if self.void_size() >= self.options.compact_threshold.max(1) || self.options.compact_threshold == 0 {
			self.compact();
		}
	}

	/// Shifts every segment's live bytes to offset 0 and merges adjacent
	/// segments under 50% full where possible (spec invariant 4, §4.3.9-ish).
	pub fn compact(&mut self) {
		let mut merged: VecDeque<Segment<N>> = VecDeque::with_capacity(self.segments.len());
		for mut seg in self.segments.drain(..) {
			if seg.is_empty() {
				self.pool.recycle(seg);
				continue;
			}
			seg.shift();
			if let Some(prev) = merged.back_mut() {
				if prev.is_owner() && !prev.is_shared() && prev.limit() + seg.len() <= N {
					let n = seg.len();
					let bytes = seg.data().to_vec();
					prev.push_slice(&bytes);
					let _ = n;
					continue;
				}
			}
			merged.push_back(seg);
		}
		self.segments = merged;
	}

	/// Zero-copy transfer of `byte_count` bytes from `source`'s head into
	/// `self`'s tail (spec §4.3.3). The central algorithm of the engine.
	pub fn write_from(&mut self, source: &mut Buffer<N, impl Pool<N>>, byte_count: usize) -> Result<(), Error> {
		source.require(byte_count)?;
		let mut remaining = byte_count;
		while remaining > 0 {
			let src_head_len = source.segments.front().expect("bytes available").len();
			let taken = if remaining < src_head_len {
				// Case A: partial head.
				let compactable = self.tail_compactable(remaining);
				if compactable {
					let src_head = source.segments.front_mut().unwrap();
					let tail = self.segments.back_mut().expect("compactable tail exists");
					src_head.write_to(tail, remaining);
					remaining
				} else {
					let src_head = source.segments.front_mut().unwrap();
					let prefix = src_head.split_head(remaining);
					self.push_tail_segment(prefix);
					remaining
				}
			} else {
				// Case B: whole head.
				let seg = source.segments.pop_front().unwrap();
				let n = seg.len();
				self.push_tail_segment(seg);
				n
			};
			source.byte_size -= taken;
			self.byte_size += taken;
			remaining -= taken;
		}
		self.maybe_compact();
		Ok(())
	}

	fn tail_compactable(&self, new_bytes: usize) -> bool {
		match self.segments.back() {
			Some(tail) => {
				tail.is_owner()
					&& new_bytes <= N - tail.limit() + if tail.is_shared() { 0 } else { tail.pos() }
			}
			None => false,
		}
	}

	/// Appends a detached segment as the new tail, compacting it into the
	/// current tail when that's cheaper than a splice.
	fn push_tail_segment(&mut self, mut seg: Segment<N>) {
		if let Some(tail) = self.segments.back_mut() {
			if tail.is_owner() && !tail.is_shared() && tail.limit() + seg.len() <= N {
				if tail.pos() > 0 {
					tail.shift();
				}
				let bytes = seg.data().to_vec();
				tail.push_slice(&bytes);
				return;
			}
		}
		seg.shift();
		self.segments.push_back(seg);
	}

	/// Walks segments copying `count` bytes starting at `offset` into `out`,
	/// via shared copies (no consumption of `self`).
	pub fn copy_to(&self, out: &mut Buffer<N, impl Pool<N>>, offset: usize, count: usize) -> Result<(), Error> {
		if offset + count > self.byte_size {
			return Err(Error::range(OperationKind::BufferCopy, "offset/count out of range"));
		}
		let mut skip = offset;
		let mut remaining = count;
		for seg in &self.segments {
			if remaining == 0 {
				break;
			}
			let len = seg.len();
			if skip >= len {
				skip -= len;
				continue;
			}
			let start = skip;
			let take = (len - start).min(remaining);
			let copy = narrow_copy(seg.shared_copy(), start, take);
			out.push_narrowed_copy(copy);
			remaining -= take;
			skip = 0;
		}
		Ok(())
	}

	pub(crate) fn push_narrowed_copy(&mut self, seg: Segment<N>) {
		let n = seg.len();
		self.segments.push_back(seg);
		self.byte_size += n;
	}

	/// Builds a [`SegmentedByteString`] snapshot of the entire buffer without
	/// consuming it.
	pub fn snapshot(&self) -> SegmentedByteString<N>
	where
		P: Clone + 'static,
	{
		self.snapshot_n(self.byte_size)
	}

	pub fn snapshot_n(&self, n: usize) -> SegmentedByteString<N>
	where
		P: Clone + 'static,
	{
		let pool: Arc<dyn Pool<N>> = Arc::new(self.pool.clone());
		let mut pieces = Vec::new();
		let mut remaining = n.min(self.byte_size);
		for seg in &self.segments {
			if remaining == 0 {
				break;
			}
			let take = seg.len().min(remaining);
			let copy = narrow_copy(seg.shared_copy(), 0, take);
			pieces.push(copy);
			remaining -= take;
		}
		SegmentedByteString::from_segments(pieces, pool)
	}

	/// Reads `n` unread bytes as an immutable value, consuming them. Below
	/// [`SEGMENTING_THRESHOLD`] this copies into a flat [`ByteString`]; at or
	/// above it the returned value stays segment-backed, sharing this
	/// buffer's pages rather than copying `n` bytes up front (spec §4.3.2).
	pub fn read_byte_string(&mut self, n: usize) -> Result<ReadBytes<N>, Error>
	where
		P: Clone + 'static,
	{
		self.require(n)?;
		if n < SEGMENTING_THRESHOLD {
			let mut bytes = vec![0u8; n];
			self.read_into_slice(&mut bytes)?;
			Ok(ReadBytes::Flat(ByteString::from(bytes)))
		} else {
			let snapshot = self.snapshot_n(n);
			self.skip(n)?;
			Ok(ReadBytes::Segmented(snapshot, OnceCell::new()))
		}
	}

	pub(crate) fn read_into_slice(&mut self, dst: &mut [u8]) -> Result<(), Error> {
		self.require(dst.len())?;
		let mut filled = 0;
		while filled < dst.len() {
			let head = self.segments.front_mut().expect("bytes were available");
			let take = head.len().min(dst.len() - filled);
			head.pop_into_slice(&mut dst[filled..filled + take]);
			filled += take;
			self.byte_size -= take;
			if head.is_empty() {
				let seg = self.segments.pop_front().unwrap();
				self.pool.recycle(seg);
			}
		}
		Ok(())
	}

	pub(crate) fn peek_byte(&self, offset: usize) -> Option<u8> {
		let mut skip = offset;
		for seg in &self.segments {
			if skip < seg.len() {
				return Some(seg.data()[skip]);
			}
			skip -= seg.len();
		}
		None
	}

	pub(crate) fn segment_count(&self) -> usize { self.segments.len() }
}

/// Narrows an already-shared segment copy to `[start, start+len)` relative to
/// its current window, by splitting off and discarding the leading `start`
/// bytes and then keeping only the first `len` bytes of what remains.
pub(crate) fn narrow_copy<const N: usize>(mut seg: Segment<N>, start: usize, len: usize) -> Segment<N> {
	if start > 0 {
		let _dropped = seg.split_head(start.min(seg.len()));
	}
	if seg.len() > len {
		return seg.split_head(len);
	}
	seg
}

impl<const N: usize> Default for Buffer<N, Arc<SegmentPool<N>>> {
	fn default() -> Self { Self::with_pool(Arc::new(SegmentPool::new())) }
}

impl Buffer<DEFAULT_SEGMENT_SIZE, Arc<SegmentPool<DEFAULT_SEGMENT_SIZE>>> {
	/// A buffer backed by the process-wide default-size segment pool.
	pub fn new() -> Self { Self::with_pool(SegmentPool::shared()) }
}

impl<const N: usize, P: Pool<N>> Drop for Buffer<N, P> {
	fn drop(&mut self) { self.clear(); }
}
