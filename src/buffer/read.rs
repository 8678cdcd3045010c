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

//! Integer, decimal/hex text, and UTF-8 code point readers (spec §4.3.2).

use crate::element::StreamElement;
use crate::pool::Pool;
use crate::{ByteString, Error, NumberFormatError, OperationKind};
use super::Buffer;

impl<const N: usize, P: Pool<N>> Buffer<N, P> {
	/// Reads any primitive [`StreamElement`] (`u8`..`i64`) big-endian.
	pub fn read_element<T: StreamElement>(&mut self) -> Result<T, Error> {
		let mut bytes = vec![0u8; T::SIZE];
		self.read_into_slice(&mut bytes)?;
		let arr = bytes.try_into().unwrap_or_else(|_| unreachable!("exact size just read"));
		Ok(T::from_bytes(arr))
	}

	pub fn read_byte(&mut self) -> Result<u8, Error> { self.read_element() }
	pub fn read_short(&mut self) -> Result<i16, Error> { self.read_element() }
	pub fn read_int(&mut self) -> Result<i32, Error> { self.read_element() }
	pub fn read_long(&mut self) -> Result<i64, Error> { self.read_element() }

	/// Parses a (possibly negative) run of ASCII decimal digits as an `i64`,
	/// consuming exactly the digits read. At least one digit is required.
	///
	/// Accumulates in `i128` and range-checks against `i64` at the end rather
	/// than tracking the overflow boundary digit-by-digit; this is simpler and
	/// gives the identical accept/reject behavior, including `i64::MIN`.
	pub fn read_decimal_long(&mut self) -> Result<i64, Error> {
		let mut offset = 0;
		let negative = matches!(self.peek_byte(0), Some(b'-'));
		if negative {
			offset += 1;
		}
		let mut acc: i128 = 0;
		let mut digits = 0;
		loop {
			match self.peek_byte(offset) {
				Some(b @ b'0'..=b'9') => {
					acc = acc * 10 + (b - b'0') as i128;
					digits += 1;
					offset += 1;
				}
				Some(other) if digits == 0 => {
					return Err(NumberFormatError { partial: acc, offending: other }.into());
				}
				_ => break,
			}
		}
		if digits == 0 {
			return Err(Error::eos(OperationKind::BufferRead));
		}
		let signed = if negative { -acc } else { acc };
		if signed < i64::MIN as i128 || signed > i64::MAX as i128 {
			return Err(NumberFormatError { partial: signed, offending: 0 }.into());
		}
		self.skip(offset)?;
		Ok(signed as i64)
	}

	/// Parses a run of ASCII hex digits (case-insensitive) as a `u64`. At
	/// least one digit is required.
	pub fn read_hexadecimal_unsigned_long(&mut self) -> Result<u64, Error> {
		let mut offset = 0;
		let mut acc: u128 = 0;
		let mut digits = 0;
		loop {
			match self.peek_byte(offset).and_then(hex_value) {
				Some(v) => {
					acc = (acc << 4) | v as u128;
					digits += 1;
					offset += 1;
					if digits > 16 {
						return Err(NumberFormatError { partial: acc as i128, offending: 0 }.into());
					}
				}
				None => break,
			}
		}
		if digits == 0 {
			return Err(Error::eos(OperationKind::BufferRead));
		}
		self.skip(offset)?;
		Ok(acc as u64)
	}

	/// Decodes one UTF-8 code point from the head of the buffer, consuming the
	/// bytes it occupies. Never errors on malformed input (spec §4.3.2, §8.7
	/// testable property 7): a lead byte that doesn't start any valid
	/// encoding emits `U+FFFD` and skips just that byte; a multi-byte lead
	/// whose trailer is truncated by end-of-buffer or is invalid/overlong
	/// emits `U+FFFD` and skips whatever of the sequence was present.
	pub fn read_utf8_code_point(&mut self) -> Result<char, Error> {
		let lead = self.peek_byte(0).ok_or_else(|| Error::eos(OperationKind::BufferRead))?;
		let Some(len) = utf8_len(lead) else {
			self.skip(1)?;
			return Ok('\u{FFFD}');
		};
		let available = self.byte_size().min(len);
		let mut bytes = vec![0u8; available];
		for (i, b) in bytes.iter_mut().enumerate() {
			*b = self.peek_byte(i).expect("byte available");
		}
		if available == len {
			if let Ok(s) = std::str::from_utf8(&bytes) {
				let ch = s.chars().next().expect("non-empty");
				self.skip(len)?;
				return Ok(ch);
			}
		}
		self.skip(available)?;
		Ok('\u{FFFD}')
	}

	/// Reads up to and including the next `'\n'`, returning the bytes before
	/// it with a trailing `'\r'` stripped (but still consumed); `None` if the
	/// buffer holds no `'\n'` (spec §4.3.2).
	pub fn read_line(&mut self) -> Result<Option<ByteString>, Error> {
		match self.index_of(b'\n', 0, self.byte_size()) {
			Some(newline) => Ok(Some(self.consume_line(newline)?)),
			None => Ok(None),
		}
	}

	/// Like [`Buffer::read_line`], but requires a `'\n'` within `limit` bytes
	/// (or anywhere in the buffer if `limit` is `None`), erroring otherwise
	/// (spec §4.3.2).
	pub fn read_line_strict(&mut self, limit: Option<usize>) -> Result<ByteString, Error> {
		let end = limit.map_or(self.byte_size(), |l| l.min(self.byte_size()));
		let newline = self.index_of(b'\n', 0, end)
			.ok_or_else(|| Error::eos(OperationKind::BufferRead))?;
		self.consume_line(newline)
	}

	/// Consumes the line ending at logical offset `newline` (the `'\n'`
	/// itself), stripping a preceding `'\r'` from the returned bytes while
	/// still consuming it.
	fn consume_line(&mut self, newline: usize) -> Result<ByteString, Error> {
		let strip_cr = newline > 0 && self.peek_byte(newline - 1) == Some(b'\r');
		let text_len = if strip_cr { newline - 1 } else { newline };
		let mut bytes = vec![0u8; text_len];
		self.read_into_slice(&mut bytes)?;
		if strip_cr {
			self.skip(1)?;
		}
		self.skip(1)?;
		Ok(ByteString::from(bytes))
	}
}

fn hex_value(b: u8) -> Option<u8> {
	match b {
		b'0'..=b'9' => Some(b - b'0'),
		b'a'..=b'f' => Some(b - b'a' + 10),
		b'A'..=b'F' => Some(b - b'A' + 10),
		_ => None,
	}
}

fn utf8_len(lead: u8) -> Option<usize> {
	if lead & 0x80 == 0 {
		Some(1)
	} else if lead & 0xE0 == 0xC0 {
		Some(2)
	} else if lead & 0xF0 == 0xE0 {
		Some(3)
	} else if lead & 0xF8 == 0xF0 {
		Some(4)
	} else {
		None
	}
}
