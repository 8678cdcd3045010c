// SPDX-License-Identifier: Apache-2.0

use crate::SEGMENT_SIZE;

/// Options for tuning [`Buffer`](super::Buffer)'s behavior and performance
/// (spec §3 "Pool partition" / §9 design notes on the share/compact tradeoff).
///
/// # Share threshold
///
/// The minimum size for segment data to be shared rather than copied into
/// another segment. Defaults to `1024B` ([`crate::segment::SHARE_MINIMUM`]),
/// one eighth the default segment size. With a value larger than the segment
/// size, segments are never shared.
///
/// Sharing is significantly faster than copying for large segments, O(1) vs
/// O(n) complexity. The tradeoff may not be worth it for small segments: as
/// memory fragments with many small shared segments, the buffer compacts (see
/// [Compact threshold](#compact-threshold)).
///
/// # Compact threshold
///
/// The total size of fragmentation (gaps where segments have been partially
/// read or written) that triggers compacting. Defaults to `4096B`, half the
/// segment size. With a value of `0`, the buffer always compacts.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub struct BufferOptions {
	pub share_threshold: usize,
	pub compact_threshold: usize,
}

impl Default for BufferOptions {
	fn default() -> Self {
		Self {
			share_threshold: SEGMENT_SIZE / 8,
			compact_threshold: SEGMENT_SIZE / 2,
		}
	}
}

impl BufferOptions {
	/// Presets the options to create a "lean" buffer: one that always shares
	/// and always compacts.
	pub fn lean() -> Self {
		Self {
			share_threshold: 0,
			compact_threshold: 0,
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn defaults_match_segment_size_fractions() {
		let opts = BufferOptions::default();
		assert_eq!(opts.share_threshold, SEGMENT_SIZE / 8);
		assert_eq!(opts.compact_threshold, SEGMENT_SIZE / 2);
	}

	#[test]
	fn lean_is_always_share_and_compact() {
		let opts = BufferOptions::lean();
		assert_eq!(opts.share_threshold, 0);
		assert_eq!(opts.compact_threshold, 0);
	}
}
