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

//! The [`Segment`] primitive: a fixed-capacity byte page with owner/share
//! discipline and a small CAS state machine (spec §3, §4.1).

mod memory;

use std::sync::atomic::{AtomicU8, Ordering};
use crate::{Error, ErrorKind, OperationKind};

/// Default segment capacity: 8 KiB. Spec §3 also names a 16,709B variant sized
/// for one maximum-size TLS record; callers needing that can instantiate
/// `Segment::<16709>` directly since capacity is a const generic.
pub const DEFAULT_SEGMENT_SIZE: usize = 8192;

/// Below this many bytes, [`Segment::split_head`] and the zero-copy transfer
/// path (`Buffer::write_from`) copy instead of sharing (spec §4.1, §4.3.3).
pub const SHARE_MINIMUM: usize = 1024;

/// A segment's position in its owning queue's lifecycle (spec §3).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Status {
	Available = 0,
	Writing = 1,
	Transferring = 2,
	Removing = 3,
}

impl Status {
	fn from_u8(v: u8) -> Self {
		match v {
			0 => Status::Available,
			1 => Status::Writing,
			2 => Status::Transferring,
			_ => Status::Removing,
		}
	}
}

/// A fixed-capacity byte page (spec §3 `Segment`).
///
/// `N` is the segment's capacity in bytes. A `Segment` is either the sole
/// *owner* of its backing array (and may extend `limit`) or a *shared* view
/// created by [`Segment::shared_copy`] (read-only; see [`Self::is_shared`]).
pub struct Segment<const N: usize = DEFAULT_SEGMENT_SIZE> {
	memory: memory::Memory<N>,
	pos: usize,
	limit: usize,
	owner: bool,
	status: AtomicU8,
}

impl<const N: usize> Segment<N> {
	/// Returns a fresh, empty, owned segment backed by a new array.
	pub fn new() -> Self {
		Self {
			memory: memory::Memory::new(),
			pos: 0,
			limit: 0,
			owner: true,
			status: AtomicU8::new(Status::Available as u8),
		}
	}

	pub fn pos(&self) -> usize { self.pos }
	pub fn limit(&self) -> usize { self.limit }
	/// Unread byte count.
	pub fn len(&self) -> usize { self.limit - self.pos }
	pub fn is_empty(&self) -> bool { self.pos == self.limit }
	pub fn is_full(&self) -> bool { self.limit == N }
	pub fn is_owner(&self) -> bool { self.owner }
	/// True iff another segment shares this segment's backing array.
	pub fn is_shared(&self) -> bool { self.memory.is_shared() }

	pub fn status(&self) -> Status { Status::from_u8(self.status.load(Ordering::Acquire)) }

	/// Decrements the backing array's copy tracker, for use by the pool when
	/// recycling a shared view. Returns the count remaining.
	pub(crate) fn release_copy(&self) -> usize { self.memory.release_copy() }

	/// The unread bytes in this segment.
	pub fn data(&self) -> &[u8] { &self.memory.data()[self.pos..self.limit] }

	/// Mutable access to the unread bytes.
	///
	/// # Panics (debug only)
	/// If this segment is not an unshared owner; callers must go through
	/// [`Segment::unshared_copy`] first.
	pub fn data_mut(&mut self) -> &mut [u8] {
		debug_assert!(self.owner && !self.is_shared(), "mutation of a shared segment");
		let (pos, limit) = (self.pos, self.limit);
		&mut self.memory.data_mut()[pos..limit]
	}

	// --- CAS state transitions (spec §4.1) ---

	/// CAS `AVAILABLE -> WRITING`. Only the owner may succeed.
	pub fn try_write(&self) -> bool {
		self.owner
			&& self.status.compare_exchange(
				Status::Available as u8,
				Status::Writing as u8,
				Ordering::AcqRel,
				Ordering::Acquire,
			).is_ok()
	}

	/// CAS `WRITING -> AVAILABLE`.
	pub fn finish_write(&self) -> Result<(), Error> {
		self.status
			.compare_exchange(Status::Writing as u8, Status::Available as u8, Ordering::AcqRel, Ordering::Acquire)
			.map(|_| ())
			.map_err(|_| Error::state(OperationKind::BufferWrite, "finish_write on a segment that wasn't writing"))
	}

	/// CAS `AVAILABLE -> REMOVING`. Returns true if now (or already) `REMOVING`.
	pub fn try_remove(&self) -> bool {
		match self.status.compare_exchange(
			Status::Available as u8,
			Status::Removing as u8,
			Ordering::AcqRel,
			Ordering::Acquire,
		) {
			Ok(_) => true,
			Err(observed) => Status::from_u8(observed) == Status::Removing,
		}
	}

	/// Precondition: `REMOVING`. Returns true (terminal) iff the segment is
	/// fully drained; otherwise reverts to `AVAILABLE` and returns false.
	pub fn validate_remove(&self) -> bool {
		debug_assert_eq!(self.status(), Status::Removing);
		if self.is_empty() {
			true
		} else {
			self.status.store(Status::Available as u8, Ordering::Release);
			false
		}
	}

	/// CAS `AVAILABLE -> TRANSFERRING` unless already `WRITING`, in which case
	/// the writing state is preserved. Returns whether the segment was writing.
	pub fn start_transfer(&self) -> bool {
		if self.status() == Status::Writing {
			return true;
		}
		let prior = self.status.swap(Status::Transferring as u8, Ordering::AcqRel);
		debug_assert_eq!(Status::from_u8(prior), Status::Available);
		false
	}

	/// Reverses [`Segment::start_transfer`].
	pub fn finish_transfer(&self, was_writing: bool) {
		if !was_writing {
			let _ = self.status.compare_exchange(
				Status::Transferring as u8,
				Status::Available as u8,
				Ordering::AcqRel,
				Ordering::Acquire,
			);
		}
	}

	/// Creates a new read-only view over the same backing array, incrementing
	/// its `CopyTracker`.
	pub fn shared_copy(&self) -> Self {
		Self {
			memory: self.memory.share(),
			pos: self.pos,
			limit: self.limit,
			owner: false,
			status: AtomicU8::new(Status::Available as u8),
		}
	}

	/// Clones the backing array into a fresh one and returns a fresh owner over
	/// it.
	pub fn unshared_copy(&self) -> Self {
		Self {
			memory: self.memory.fork(),
			pos: self.pos,
			limit: self.limit,
			owner: true,
			status: AtomicU8::new(Status::Available as u8),
		}
	}

	/// Splits off a prefix of `byte_count` bytes as a new segment, advancing
	/// `self.pos` past it. Shares the backing array when `byte_count >=
	/// SHARE_MINIMUM`; otherwise copies into a freshly allocated segment.
	pub fn split_head(&mut self, byte_count: usize) -> Self {
		debug_assert!(byte_count <= self.len());
		if byte_count >= SHARE_MINIMUM {
			let mut prefix = self.shared_copy();
			prefix.limit = prefix.pos + byte_count;
			self.pos += byte_count;
			prefix
		} else {
			let mut prefix = Self::new();
			prefix.push_slice(&self.data()[..byte_count]);
			self.pos += byte_count;
			prefix
		}
	}

	/// Copies `byte_count` bytes from `self` into `target`, which must be an
	/// unshared owner. Compacts `target` first (shifting its live bytes to
	/// offset 0) if the bytes wouldn't otherwise fit.
	pub fn write_to(&mut self, target: &mut Self, byte_count: usize) {
		debug_assert!(target.owner && !target.is_shared());
		if target.limit + byte_count > N {
			target.shift();
		}
		debug_assert!(target.limit + byte_count <= N, "segment capacity exceeded");
		let bytes = self.data()[..byte_count].to_vec();
		target.push_slice(&bytes);
		self.pos += byte_count;
	}

	/// Shifts live bytes `[pos, limit)` down to `[0, limit - pos)`.
	pub fn shift(&mut self) {
		if self.pos == 0 {
			return;
		}
		self.memory.shift(self.pos, self.limit);
		self.limit -= self.pos;
		self.pos = 0;
	}

	/// Appends `bytes` to the end of this segment's live data.
	///
	/// # Panics (debug only)
	/// If `self` is not an unshared owner, or capacity would be exceeded.
	pub fn push_slice(&mut self, bytes: &[u8]) {
		debug_assert!(self.owner && !self.is_shared());
		debug_assert!(self.limit + bytes.len() <= N);
		let limit = self.limit;
		self.memory.data_mut()[limit..limit + bytes.len()].copy_from_slice(bytes);
		self.limit += bytes.len();
	}

	/// Reads `dst.len()` bytes starting at `pos`, advancing `pos`.
	pub fn pop_into_slice(&mut self, dst: &mut [u8]) {
		dst.copy_from_slice(&self.data()[..dst.len()]);
		self.pos += dst.len();
	}

	/// Advances `pos` by `n` bytes without copying them anywhere.
	pub fn consume(&mut self, n: usize) {
		debug_assert!(self.pos + n <= self.limit);
		self.pos += n;
	}

	/// Clears this segment back to empty, retaining its backing array.
	pub fn clear(&mut self) {
		self.pos = 0;
		self.limit = 0;
	}

	/// Shrinks the unread region to its first `new_len` bytes.
	pub fn truncate(&mut self, new_len: usize) {
		debug_assert!(new_len <= self.len());
		self.limit = self.pos + new_len;
	}

	/// A read-only view of `byte_count` unread bytes, for scatter I/O.
	pub fn as_read_byte_buffer(&self, byte_count: usize) -> &[u8] {
		&self.data()[..byte_count]
	}

	/// A writable view of `byte_count` bytes past `limit`, for gather I/O.
	/// Caller must call [`Segment::commit_write`] with the number of bytes
	/// actually filled.
	pub fn as_write_byte_buffer(&mut self, byte_count: usize) -> &mut [u8] {
		debug_assert!(self.limit + byte_count <= N);
		let (limit, end) = (self.limit, self.limit + byte_count);
		&mut self.memory.data_mut()[limit..end]
	}

	/// Commits bytes previously written through [`Segment::as_write_byte_buffer`].
	pub fn commit_write(&mut self, byte_count: usize) {
		debug_assert!(self.limit + byte_count <= N);
		self.limit += byte_count;
	}
}

impl<const N: usize> Default for Segment<N> {
	fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn owner_can_write_then_read() {
		let mut seg = Segment::<64>::new();
		assert!(seg.try_write());
		seg.push_slice(b"hello");
		seg.finish_write().unwrap();
		assert_eq!(seg.data(), b"hello");
	}

	#[test]
	fn shared_copy_is_not_owner_and_counts_as_shared() {
		let seg = Segment::<64>::new();
		let shared = seg.shared_copy();
		assert!(!shared.is_owner());
		assert!(seg.is_shared());
		assert!(shared.is_shared());
	}

	#[test]
	fn split_head_below_threshold_copies() {
		let mut seg = Segment::<64>::new();
		seg.push_slice(b"hello world");
		let prefix = seg.split_head(5);
		assert_eq!(prefix.data(), b"hello");
		assert_eq!(seg.data(), b" world");
		assert!(!seg.is_shared());
	}

	#[test]
	fn split_head_above_threshold_shares() {
		let mut seg = Segment::<SHARE_MINIMUM>::new();
		seg.push_slice(&vec![7u8; SHARE_MINIMUM]);
		let prefix = seg.split_head(SHARE_MINIMUM);
		assert_eq!(prefix.len(), SHARE_MINIMUM);
		assert!(prefix.is_shared());
	}

	#[test]
	fn try_remove_then_validate_drained() {
		let seg = Segment::<64>::new();
		assert!(seg.try_remove());
		assert!(seg.validate_remove());
		assert_eq!(seg.status(), Status::Removing);
	}

	#[test]
	fn validate_remove_reverts_when_not_drained() {
		let mut seg = Segment::<64>::new();
		seg.push_slice(b"x");
		assert!(seg.try_remove());
		assert!(!seg.validate_remove());
		assert_eq!(seg.status(), Status::Available);
	}

	#[test]
	fn unshared_copy_is_independent() {
		let mut seg = Segment::<64>::new();
		seg.push_slice(b"abc");
		let shared = seg.shared_copy();
		let mut unshared = shared.unshared_copy();
		unshared.push_slice(b"!");
		assert_eq!(seg.data(), b"abc");
	}
}
