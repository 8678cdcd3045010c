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

//! [`Options`]: a set of candidate byte strings for [`crate::Buffer::select`]
//! (spec §4.5). The Build step sorts candidates lexicographically and strips
//! any that are strict extensions of a sorted predecessor (the shorter,
//! already-seen alternative wins a tie; exact duplicates are an error). What
//! survives is prefix-free, so `select` can stop at the first match rather
//! than needing a trie's longest-match bookkeeping; see `DESIGN.md`.

use crate::pool::Pool;
use crate::{Buffer, Error};

/// A set of candidate byte strings, deduplicated for [`Buffer::select`] (spec
/// §4.5). Construct with [`Options::new`].
#[derive(Clone, Debug, Default)]
pub struct Options {
	/// `(original_index, bytes)`, sorted lexicographically, with strict
	/// extensions of an earlier candidate removed.
	candidates: Vec<(usize, Vec<u8>)>,
}

impl Options {
	/// Builds an option set from `candidates` (spec §4.5 "Build"): sorts
	/// lexicographically, then drops any candidate that's a strict extension
	/// of an earlier (shorter-or-equal) one. Errors if two candidates are
	/// exactly equal.
	pub fn new(candidates: impl IntoIterator<Item = impl Into<Vec<u8>>>) -> Result<Self, Error> {
		let mut candidates: Vec<(usize, Vec<u8>)> =
			candidates.into_iter().map(Into::into).enumerate().collect();
		candidates.sort_by(|(_, a), (_, b)| a.cmp(b));

		let mut kept: Vec<(usize, Vec<u8>)> = Vec::with_capacity(candidates.len());
		for (idx, bytes) in candidates {
			if let Some((_, prev)) = kept.last() {
				if bytes == *prev {
					return Err(Error::argument("duplicate candidate in Options"));
				}
				if bytes.starts_with(prev.as_slice()) {
					continue;
				}
			}
			kept.push((idx, bytes));
		}
		Ok(Self { candidates: kept })
	}

	pub fn len(&self) -> usize { self.candidates.len() }
	pub fn is_empty(&self) -> bool { self.candidates.is_empty() }

	pub(crate) fn candidates(&self) -> &[(usize, Vec<u8>)] { &self.candidates }
}

impl<const N: usize, P: Pool<N>> Buffer<N, P> {
	/// Finds which candidate in `options` is a prefix of the buffer starting
	/// at the current read position, consumes it, and returns its original
	/// index. Returns `-1` if none match (spec §4.5). Since `options` is
	/// prefix-free after dedup, at most one candidate can ever match.
	pub fn select(&mut self, options: &Options) -> i32 {
		for (original_idx, candidate) in options.candidates() {
			if self.range_equals(0, candidate) {
				let _ = self.skip(candidate.len());
				return *original_idx as i32;
			}
		}
		-1
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;
	use crate::pool::SegmentPool;
	use super::*;

	fn buf() -> Buffer<64, Arc<SegmentPool<64>>> {
		Buffer::with_pool(Arc::new(SegmentPool::new()))
	}

	#[test]
	fn select_picks_the_surviving_prefix() {
		let mut b = buf();
		b.write_bytes(b"abcdef");
		// "abcd" is not a strict extension of "ab"/"abc" removal chain: only
		// "abc" extends "ab", and "abcd" extends "abc", so both are dropped,
		// leaving only "ab".
		let options = Options::new(["ab", "abc", "abcd"]).unwrap();
		let picked = b.select(&options);
		assert_eq!(picked, 0);
		assert_eq!(b.byte_size(), 4);
	}

	#[test]
	fn boundary_scenario_e_strips_strict_extension() {
		let mut b = buf();
		b.write_bytes(b"abcde");
		let options = Options::new(["abc", "abd", "abcde"]).unwrap();
		let picked = b.select(&options);
		assert_eq!(picked, 0);
		assert_eq!(b.byte_size(), 2);
	}

	#[test]
	fn select_returns_negative_one_when_nothing_matches() {
		let mut b = buf();
		b.write_bytes(b"xyz");
		let options = Options::new(["ab", "cd"]).unwrap();
		assert_eq!(b.select(&options), -1);
		assert_eq!(b.byte_size(), 3);
	}

	#[test]
	fn exact_duplicates_are_rejected() {
		assert!(Options::new(["ab", "ab"]).is_err());
	}
}
