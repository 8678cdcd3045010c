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

//! Integer and UTF-8 code point writers (spec §4.3.1).

use crate::element::StreamElement;
use crate::pool::Pool;
use crate::{Error, OperationKind};
use super::Buffer;

impl<const N: usize, P: Pool<N>> Buffer<N, P> {
	/// Writes any primitive [`StreamElement`] (`u8`..`i64`) big-endian.
	pub fn write_element<T: StreamElement>(&mut self, value: T) {
		self.write_bytes(&value.into_bytes());
	}

	pub fn write_byte(&mut self, value: u8) { self.write_element(value) }
	pub fn write_short(&mut self, value: i16) { self.write_element(value) }
	pub fn write_int(&mut self, value: i32) { self.write_element(value) }
	pub fn write_long(&mut self, value: i64) { self.write_element(value) }

	/// Writes the decimal representation of `v`, handling `i64::MIN` as the
	/// literal `"-9223372036854775808"` since it has no positive counterpart
	/// (spec §4.3.1).
	pub fn write_decimal_long(&mut self, v: i64) {
		if v == i64::MIN {
			self.write_bytes(b"-9223372036854775808");
			return;
		}
		let mut buf = [0u8; 20];
		let mut i = buf.len();
		let negative = v < 0;
		let mut n: u64 = v.unsigned_abs();
		loop {
			i -= 1;
			buf[i] = b'0' + (n % 10) as u8;
			n /= 10;
			if n == 0 {
				break;
			}
		}
		if negative {
			i -= 1;
			buf[i] = b'-';
		}
		self.write_bytes(&buf[i..]);
	}

	/// Writes the lowercase hexadecimal representation of `v`.
	pub fn write_hexadecimal_unsigned_long(&mut self, v: u64) {
		if v == 0 {
			self.write_bytes(b"0");
			return;
		}
		let mut buf = [0u8; 16];
		let mut i = buf.len();
		let mut n = v;
		while n != 0 {
			i -= 1;
			let digit = (n & 0xF) as u8;
			buf[i] = if digit < 10 { b'0' + digit } else { b'a' + (digit - 10) };
			n >>= 4;
		}
		self.write_bytes(&buf[i..]);
	}

	/// Encodes `cp` as 1-4 UTF-8 bytes. A surrogate half (`0xD800..=0xDFFF`)
	/// is replaced with `'?'`; values past `0x10FFFF` are a range error
	/// (spec §4.3.1).
	pub fn write_utf8_code_point(&mut self, cp: u32) -> Result<(), Error> {
		if cp > 0x10FFFF {
			return Err(Error::range(OperationKind::BufferWrite, format!("code point {cp:#x} out of range")));
		}
		let resolved = if (0xD800..=0xDFFF).contains(&cp) { '?' } else {
			char::from_u32(cp).unwrap_or('\u{FFFD}')
		};
		let mut buf = [0u8; 4];
		let s = resolved.encode_utf8(&mut buf);
		self.write_bytes(s.as_bytes());
		Ok(())
	}

	/// Writes a string's UTF-8 bytes.
	pub fn write_string(&mut self, s: &str) {
		self.write_bytes(s.as_bytes());
	}

	/// The byte count of segments that are entirely full and unshared, i.e.
	/// safe to hand to a raw sink without waiting on the still-writable tail
	/// (spec §4.6.1 `emit_complete_segments`).
	pub fn complete_segment_bytes(&self) -> usize {
		let mut total = 0;
		let mut iter = self.segments_iter().peekable();
		while let Some(seg) = iter.next() {
			if iter.peek().is_none() {
				// Tail: only counts if it can't grow further.
				if seg.is_owner() && !seg.is_full() {
					break;
				}
			}
			total += seg.len();
		}
		total
	}

	pub(crate) fn segments_iter(&self) -> impl Iterator<Item = &crate::Segment<N>> {
		self.segments.iter()
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
	fn decimal_round_trip_including_min() {
		for v in [0i64, 1, -1, 12345, i64::MAX, i64::MIN, -9000] {
			let mut b = buf();
			b.write_decimal_long(v);
			let s = b.read_byte_string(b.byte_size()).unwrap();
			assert_eq!(s.as_bytes(), v.to_string().as_bytes());
		}
	}

	#[test]
	fn hex_round_trip() {
		for v in [0u64, 1, 0xFF, u64::MAX] {
			let mut b = buf();
			b.write_hexadecimal_unsigned_long(v);
			let s = b.read_byte_string(b.byte_size()).unwrap();
			assert_eq!(s.as_bytes(), format!("{v:x}").as_bytes());
		}
	}

	#[test]
	fn utf8_code_point_round_trips() {
		for cp in ['a' as u32, 0x20AC, 0x1F600] {
			let mut b = buf();
			b.write_utf8_code_point(cp).unwrap();
			let ch = b.read_utf8_code_point().unwrap();
			assert_eq!(ch as u32, cp);
		}
	}

	#[test]
	fn surrogate_half_becomes_question_mark() {
		let mut b = buf();
		b.write_utf8_code_point(0xD900).unwrap();
		assert_eq!(b.read_utf8_code_point().unwrap(), '?');
	}
}
