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

//! Random-access read & search (spec §4.3.5): `get_byte`, `index_of`,
//! `index_of_element`, `range_equals`.
//!
//! Segment traversal here is a simple linear front-to-back scan rather than
//! spec's front-vs-back proximity heuristic; see `DESIGN.md`.

use crate::pool::Pool;
use crate::{Error, OperationKind};
use super::Buffer;

impl<const N: usize, P: Pool<N>> Buffer<N, P> {
	/// The byte at logical offset `i`, without consuming anything.
	pub fn get_byte(&self, i: usize) -> Result<u8, Error> {
		self.peek_byte(i).ok_or_else(|| Error::range(OperationKind::BufferRead, "index out of range"))
	}

	/// The earliest offset in `[start, end)` holding byte `b`, or `None`.
	pub fn index_of(&self, b: u8, start: usize, end: usize) -> Option<usize> {
		let end = end.min(self.byte_size);
		(start..end).find(|&i| self.peek_byte(i) == Some(b))
	}

	/// The earliest offset in `[start, end)` whose byte is one of `targets`.
	/// A fast path special-cases exactly two targets (spec §4.3.5).
	pub fn index_of_element(&self, targets: &[u8], start: usize, end: usize) -> Option<usize> {
		let end = end.min(self.byte_size);
		if let [a, b] = *targets {
			return (start..end).find(|&i| matches!(self.peek_byte(i), Some(v) if v == a || v == b));
		}
		(start..end).find(|&i| matches!(self.peek_byte(i), Some(v) if targets.contains(&v)))
	}

	/// The earliest offset in `[start, end)` at which `needle` occurs in its
	/// entirety: finds the first byte via [`Buffer::index_of`], then confirms
	/// the remainder via [`Buffer::range_equals`].
	pub fn index_of_bytes(&self, needle: &[u8], start: usize, end: usize) -> Option<usize> {
		if needle.is_empty() {
			return Some(start.min(self.byte_size));
		}
		let mut from = start;
		loop {
			let at = self.index_of(needle[0], from, end)?;
			if at + needle.len() > self.byte_size {
				return None;
			}
			if self.range_equals(at, needle) {
				return Some(at);
			}
			from = at + 1;
		}
	}

	/// Whether the `needle.len()` bytes starting at logical offset `offset`
	/// equal `needle`, without consuming anything.
	pub fn range_equals(&self, offset: usize, needle: &[u8]) -> bool {
		if offset + needle.len() > self.byte_size {
			return false;
		}
		(0..needle.len()).all(|i| self.peek_byte(offset + i) == Some(needle[i]))
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
	fn index_of_finds_byte_across_segments() {
		let mut b = buf();
		b.write_bytes(b"abcdefghijklmnop");
		assert_eq!(b.index_of(b'j', 0, b.byte_size()), Some(9));
	}

	#[test]
	fn index_of_bytes_finds_needle_spanning_segments() {
		let mut b = buf();
		b.write_bytes(b"abcdefghijklmnop");
		assert_eq!(b.index_of_bytes(b"fgh", 0, b.byte_size()), Some(5));
		assert_eq!(b.index_of_bytes(b"xyz", 0, b.byte_size()), None);
	}

	#[test]
	fn index_of_element_fast_path_for_two_targets() {
		let mut b = buf();
		b.write_bytes(b"abcdXYghij");
		assert_eq!(b.index_of_element(b"XY", 0, b.byte_size()), Some(4));
	}

	#[test]
	fn range_equals_checks_without_consuming() {
		let mut b = buf();
		b.write_bytes(b"hello world");
		assert!(b.range_equals(6, b"world"));
		assert!(!b.range_equals(6, b"earth"));
		assert_eq!(b.byte_size(), 11);
	}
}
