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

//! The crate-wide error taxonomy (spec §7): every fallible operation returns
//! [`Error`], a small `(operation, kind)` pair plus an optional wrapped source.

use std::{error, io};
use amplify_derive::Display;
use thiserror::Error as ThisError;

/// What the engine was doing when the error occurred.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum OperationKind {
	#[display("buffer read")]
	BufferRead,
	#[display("buffer write")]
	BufferWrite,
	#[display("buffer copy")]
	BufferCopy,
	#[display("buffer clear")]
	BufferClear,
	#[display("buffer compact")]
	BufferCompact,
	#[display("buffer seek")]
	BufferSeek,
	#[display("pool claim")]
	PoolClaim,
	#[display("pool recycle")]
	PoolRecycle,
	#[display("options select")]
	OptionsSelect,
	#[display("stream flush")]
	StreamFlush,
	#[display("stream close")]
	StreamClose,
	#[display("stream fill")]
	StreamFill,
	#[display("stream emit")]
	StreamEmit,
	#[display("pipe read")]
	PipeRead,
	#[display("pipe write")]
	PipeWrite,
	#[display("pipe fold")]
	PipeFold,
}

/// The kind of failure (spec §7).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ErrorKind {
	#[display("required bytes were not available")]
	Eos,
	#[display("offset or count out of range")]
	Range,
	#[display("operation on a closed resource")]
	Closed,
	#[display("malformed data")]
	Format,
	#[display("operation canceled")]
	Cancellation,
	#[display("I/O failure")]
	Io,
	#[display("invalid argument")]
	Argument,
	#[display("invariant violation")]
	State,
}

/// The crate-wide error type.
#[derive(Debug, Display)]
#[display("{op}: {kind}")]
pub struct Error {
	op: OperationKind,
	kind: ErrorKind,
	detail: Option<String>,
	source: Option<Box<dyn error::Error + Send + Sync>>,
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		self.source.as_ref().map(|e| e.as_ref() as &(dyn error::Error + 'static))
	}
}

impl Error {
	pub fn new(op: OperationKind, kind: ErrorKind) -> Self {
		Self { op, kind, detail: None, source: None }
	}

	pub fn with_detail(op: OperationKind, kind: ErrorKind, detail: impl Into<String>) -> Self {
		Self { op, kind, detail: Some(detail.into()), source: None }
	}

	pub fn wrap(op: OperationKind, kind: ErrorKind, source: impl error::Error + Send + Sync + 'static) -> Self {
		Self { op, kind, detail: None, source: Some(Box::new(source)) }
	}

	pub fn op(&self) -> OperationKind { self.op }
	pub fn kind(&self) -> ErrorKind { self.kind }
	pub fn detail(&self) -> Option<&str> { self.detail.as_deref() }

	pub fn eos(op: OperationKind) -> Self { Self::new(op, ErrorKind::Eos) }
	pub fn range(op: OperationKind, detail: impl Into<String>) -> Self {
		Self::with_detail(op, ErrorKind::Range, detail)
	}
	pub fn closed(op: OperationKind) -> Self { Self::new(op, ErrorKind::Closed) }
	pub fn format(op: OperationKind, detail: impl Into<String>) -> Self {
		Self::with_detail(op, ErrorKind::Format, detail)
	}
	pub fn cancellation(op: OperationKind) -> Self { Self::new(op, ErrorKind::Cancellation) }
	pub fn state(op: OperationKind, detail: impl Into<String>) -> Self {
		Self::with_detail(op, ErrorKind::State, detail)
	}

	/// Convenience for argument errors that aren't tied to a specific engine
	/// operation (config validation, `Options` construction).
	pub fn argument(detail: impl Into<String>) -> Self {
		Self::with_detail(OperationKind::PoolClaim, ErrorKind::Argument, detail)
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		let kind = if e.kind() == io::ErrorKind::UnexpectedEof {
			ErrorKind::Eos
		} else {
			ErrorKind::Io
		};
		Self { op: OperationKind::StreamFill, kind, detail: None, source: Some(Box::new(e)) }
	}
}

/// A decimal or hexadecimal integer parse failure, carrying the partial value
/// accumulated so far and the offending byte (spec §4.3.2, boundary scenario C).
#[derive(ThisError, Debug)]
#[error("malformed number (partial={partial}, offending byte={offending:#04x})")]
pub struct NumberFormatError {
	pub partial: i128,
	pub offending: u8,
}

/// A UTF-8 decode failure at a known byte offset within a segmented source.
#[derive(ThisError, Debug)]
#[error("invalid UTF-8 at offset {offset}")]
pub struct OffsetUtf8Error {
	pub offset: usize,
}

impl OffsetUtf8Error {
	/// Builds an offset error from a `simdutf8` failure found while decoding
	/// a chunk that starts at logical position `base`.
	pub fn new(err: simdutf8::compat::Utf8Error, base: usize) -> Self {
		Self { offset: base + err.valid_up_to() }
	}
}

impl From<NumberFormatError> for Error {
	fn from(e: NumberFormatError) -> Self {
		Self::wrap(OperationKind::BufferRead, ErrorKind::Format, e)
	}
}

impl From<OffsetUtf8Error> for Error {
	fn from(e: OffsetUtf8Error) -> Self {
		Self::wrap(OperationKind::BufferRead, ErrorKind::Format, e)
	}
}
