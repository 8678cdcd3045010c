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

#[macro_use]
mod common;

use pretty_assertions::assert_eq;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use fluxio::Buffer;

#[quickcheck] fn byte(v: u8) -> TestResult { element_round_trip(v, Buffer::write_byte, Buffer::read_byte) }
#[quickcheck] fn short(v: i16) -> TestResult { element_round_trip(v, Buffer::write_short, Buffer::read_short) }
#[quickcheck] fn int(v: i32) -> TestResult { element_round_trip(v, Buffer::write_int, Buffer::read_int) }
#[quickcheck] fn long(v: i64) -> TestResult { element_round_trip(v, Buffer::write_long, Buffer::read_long) }
#[quickcheck] fn decimal(v: i64) -> TestResult {
	let mut buf = Buffer::default();
	buf.write_decimal_long(v);
	match buf.read_decimal_long() {
		Ok(read) => qc_assert_eq!(v, read),
		Err(e) => TestResult::error(e.to_string()),
	}
}

fn element_round_trip<T>(
	value: T,
	write: fn(&mut Buffer, T),
	read: fn(&mut Buffer) -> Result<T, fluxio::Error>,
) -> TestResult
where
	T: Copy + PartialEq + std::fmt::Debug,
{
	let mut buf = Buffer::default();
	write(&mut buf, value);
	match read(&mut buf) {
		Ok(read_value) => qc_assert_eq!(value, read_value),
		Err(e) => TestResult::error(e.to_string()),
	}
}

#[test]
fn write_bytes_then_read_byte_string_round_trips() {
	let mut buf = Buffer::default();
	buf.write_bytes(b"the quick brown fox");
	let bs = buf.read_byte_string(19).unwrap();
	assert_eq!(bs.as_bytes(), b"the quick brown fo");
	assert_eq!(buf.byte_size(), 1);
}

#[test]
fn compact_merges_voids_after_large_skip() {
	let mut buf = Buffer::default();
	let chunk = vec![b'x'; fluxio::SEGMENT_SIZE * 3];
	buf.write_bytes(&chunk);
	buf.skip(fluxio::SEGMENT_SIZE * 2 + 10).unwrap();
	buf.compact();
	assert_eq!(buf.byte_size(), fluxio::SEGMENT_SIZE - 10);
}

#[test]
fn write_from_transfers_zero_copy_across_buffers() {
	let mut src = Buffer::default();
	src.write_bytes(&vec![7u8; fluxio::SEGMENT_SIZE + 5]);
	let mut dst = Buffer::default();
	dst.write_from(&mut src, fluxio::SEGMENT_SIZE + 5).unwrap();
	assert_eq!(src.byte_size(), 0);
	assert_eq!(dst.byte_size(), fluxio::SEGMENT_SIZE + 5);
}

/// Spec §8 testable property 4 ("Snapshot stability"): a snapshot's contents
/// don't move when the originating buffer is mutated afterward.
#[test]
fn snapshot_is_unaffected_by_later_buffer_mutation() {
	let mut buf = Buffer::default();
	let chunk = vec![b'a'; fluxio::SEGMENT_SIZE * 2 + 37];
	buf.write_bytes(&chunk);
	let snapshot = buf.snapshot();
	assert_eq!(snapshot.len(), chunk.len());

	buf.write_bytes(b"more bytes appended after snapshotting");
	buf.skip(10).unwrap();

	assert_eq!(snapshot.len(), chunk.len());
	for i in 0..snapshot.len() {
		assert_eq!(snapshot.get_byte(i), Some(b'a'));
	}
}

/// Spec §8 testable property 5 ("Substring equivalence"):
/// `snapshot.substring(a, b)` equals the flat byte-string read over `[a, b)`.
#[test]
fn segmented_substring_matches_flat_byte_range() {
	let mut buf = Buffer::default();
	let data: Vec<u8> = (0..(fluxio::SEGMENT_SIZE * 2 + 11)).map(|i| (i % 251) as u8).collect();
	buf.write_bytes(&data);
	let snapshot = buf.snapshot();

	let (a, b) = (5, fluxio::SEGMENT_SIZE + 20);
	let sub = snapshot.substring(a, b);
	let expected = fluxio::ByteString::from(&data[a..b]);
	assert_eq!(sub, expected);
	assert_eq!(sub.len(), b - a);
}
