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

//! [`UnsafeCursor`]: a client-attached read-or-read/write view over one
//! segment at a time, exposing a raw pointer (spec §4.3.7).
//!
//! An attached cursor expects exclusive ownership of its [`Buffer`] for its
//! whole lifetime; that's enforced here by holding `&mut Buffer` for as long
//! as the cursor exists, rather than by any runtime check.

use crate::pool::Pool;
use super::Buffer;

/// A cursor over one segment of a [`Buffer`] at a time, exposing `data`,
/// `pos`, and `limit` directly for bulk access (spec §4.3.7).
///
/// Reading through `data[pos..limit]` is always sound while the cursor is
/// seeked there. Writing through it is only sound when the cursor was
/// attached read-write ([`Buffer::read_and_write_unsafe`]); the cursor itself
/// cannot enforce that at the type level, which is why the accessors living
/// on it are unsafe.
pub struct UnsafeCursor<'b, const N: usize, P: Pool<N>> {
	buffer: &'b mut Buffer<N, P>,
	segment_index: usize,
	segment_offset: usize,
	readwrite: bool,
	/// Raw pointer to the start of the current segment's backing array.
	/// Valid for `[pos, limit)` while the cursor remains seeked here.
	pub data: *mut u8,
	pub pos: usize,
	pub limit: usize,
}

impl<'b, const N: usize, P: Pool<N>> UnsafeCursor<'b, N, P> {
	pub(super) fn attach(buffer: &'b mut Buffer<N, P>, readwrite: bool) -> Self {
		let mut cursor = Self {
			buffer,
			segment_index: 0,
			segment_offset: 0,
			readwrite,
			data: std::ptr::null_mut(),
			pos: 0,
			limit: 0,
		};
		cursor.seek(0);
		cursor
	}

	/// Seeks to the segment containing logical offset `index`, updating
	/// `data`/`pos`/`limit` to that segment's window. Returns the logical
	/// offset of the segment's first byte, or `-1` if `index` is out of
	/// range.
	pub fn seek(&mut self, index: usize) -> isize {
		if index > self.buffer.byte_size {
			return -1;
		}
		if self.buffer.segments.is_empty() {
			self.data = std::ptr::null_mut();
			self.pos = 0;
			self.limit = 0;
			return if index == 0 { 0 } else { -1 };
		}
		let mut offset = 0;
		let last = self.buffer.segments.len() - 1;
		for i in 0..self.buffer.segments.len() {
			let len = self.buffer.segments[i].len();
			if index < offset + len || i == last {
				self.attach_segment(i, offset);
				return offset as isize;
			}
			offset += len;
		}
		unreachable!("loop always returns via the last-segment arm")
	}

	/// Advances to the next segment, if any. Returns its start offset, or
	/// `-1` if the current segment was the last.
	pub fn next(&mut self) -> isize {
		if self.segment_index + 1 >= self.buffer.segments.len() {
			return -1;
		}
		let offset = self.segment_offset + self.limit;
		self.attach_segment(self.segment_index + 1, offset);
		offset as isize
	}

	fn attach_segment(&mut self, index: usize, offset: usize) {
		self.segment_index = index;
		self.segment_offset = offset;
		if self.readwrite && self.buffer.segments[index].is_shared() {
			self.buffer.segments[index] = self.buffer.segments[index].unshared_copy();
		}
		let seg = &mut self.buffer.segments[index];
		self.pos = seg.pos();
		self.limit = seg.limit();
		self.data = if self.readwrite {
			seg.data_mut().as_mut_ptr()
		} else {
			seg.data().as_ptr() as *mut u8
		}.wrapping_sub(self.pos);
		// `data` now points at the segment's logical index 0, matching
		// `pos`/`limit` which are absolute within the segment's array.
	}

	/// Grows or shrinks the buffer to `new_size` bytes, seeking to the first
	/// newly-allocated segment on growth or to the end on shrinkage (spec
	/// §4.3.7).
	pub fn resize_buffer(&mut self, new_size: usize) -> isize {
		let old_size = self.buffer.byte_size as isize;
		if new_size > self.buffer.byte_size {
			self.expand_buffer(new_size - self.buffer.byte_size);
		} else if new_size < self.buffer.byte_size {
			let drop = self.buffer.byte_size - new_size;
			self.buffer.skip_tail(drop);
			self.seek(self.buffer.byte_size);
		}
		old_size
	}

	/// Ensures at least `min_increment` writable bytes exist past the
	/// current end, claiming a fresh owned tail segment, and seeks the
	/// cursor there. Returns the number of bytes actually made available
	/// (always `>= min_increment`, rounded up to a whole segment).
	pub fn expand_buffer(&mut self, min_increment: usize) -> usize {
		let mut added = 0;
		while added < min_increment {
			let mut seg = self.buffer.pool.claim();
			let room = N - seg.limit();
			seg.push_slice(&vec![0u8; room]);
			added += room;
			let offset = self.buffer.byte_size;
			self.buffer.segments.push_back(seg);
			self.buffer.byte_size += room;
			if added >= min_increment {
				self.attach_segment(self.buffer.segments.len() - 1, offset);
			}
		}
		added
	}
}

impl<const N: usize, P: Pool<N>> Buffer<N, P> {
	/// Attaches a read-only [`UnsafeCursor`] over this buffer (spec §4.3.7).
	pub fn read_unsafe(&mut self) -> UnsafeCursor<'_, N, P> {
		UnsafeCursor::attach(self, false)
	}

	/// Attaches a read/write [`UnsafeCursor`] over this buffer.
	pub fn read_and_write_unsafe(&mut self) -> UnsafeCursor<'_, N, P> {
		UnsafeCursor::attach(self, true)
	}

	/// Drops the trailing `n` bytes of the buffer, recycling segments freed
	/// entirely and shrinking the last surviving one in place.
	pub(super) fn skip_tail(&mut self, mut n: usize) {
		while n > 0 {
			let tail_len = self.segments.back().expect("bytes available").len();
			if tail_len <= n {
				let seg = self.segments.pop_back().unwrap();
				self.pool.recycle(seg);
				n -= tail_len;
				self.byte_size -= tail_len;
			} else {
				let tail = self.segments.back_mut().unwrap();
				tail.truncate(tail_len - n);
				self.byte_size -= n;
				n = 0;
			}
		}
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;
	use crate::pool::SegmentPool;
	use super::*;

	fn buf() -> Buffer<8, Arc<SegmentPool<8>>> {
		Buffer::with_pool(Arc::new(SegmentPool::new()))
	}

	#[test]
	fn expand_then_resize_shrink_keeps_prefix() {
		let mut b = buf();
		{
			let mut cursor = b.read_and_write_unsafe();
			cursor.expand_buffer(8);
			unsafe {
				for i in 0..8u8 {
					*cursor.data.add(cursor.pos + i as usize) = i;
				}
			}
		}
		assert_eq!(b.byte_size(), 8);
		{
			let mut cursor = b.read_and_write_unsafe();
			cursor.resize_buffer(4);
		}
		assert_eq!(b.byte_size(), 4);
		let out = b.read_byte_string(4).unwrap();
		assert_eq!(out.as_bytes(), &[0, 1, 2, 3]);
	}

	#[test]
	fn seek_locates_segment_for_offset() {
		let mut b = buf();
		b.write_bytes(b"abcdefghijklmnop");
		let mut cursor = b.read_unsafe();
		let start = cursor.seek(9);
		assert_eq!(start, 8);
		let within = 9 - start as usize;
		let byte = unsafe { *cursor.data.add(cursor.pos + within) };
		assert_eq!(byte, b'j');
	}
}
