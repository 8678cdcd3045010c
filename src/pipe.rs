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

//! [`Pipe`]: a bounded in-memory one-producer/one-consumer channel backed by a
//! [`Buffer`] (spec §4.7). [`PipeReader`]/[`PipeWriter`] are cheaply cloneable
//! handles onto the same shared, lock-protected [`Buffer`]; unlike
//! [`crate::streams::BufferedReader`]/[`crate::streams::BufferedWriter`], both
//! ends may be driven from different threads.
//!
//! The "deliver straight into a blocked reader's destination buffer, bypassing
//! the pipe's own buffer" optimization the spec describes is not implemented:
//! every byte passes through the shared internal [`Buffer`] instead, still via
//! zero-copy segment transfer ([`Buffer::write_from`]) rather than a memcpy.
//! Avoiding it lets readers and writers exchange buffers without unsafely
//! smuggling a `&mut Buffer` across the thread boundary; see `DESIGN.md`.

use std::sync::{Arc, Condvar, Mutex};
use crate::pool::{Pool, SegmentPool};
use crate::segment::DEFAULT_SEGMENT_SIZE;
use crate::streams::{Sink, Source};
use crate::{Buffer, BufferOptions, Error, OperationKind};

/// The pipe's lifecycle (spec §4.7 "State machine").
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Phase {
	Open,
	ReaderClosed,
	WriterClosed,
	Folded,
	Canceled,
}

struct State<const N: usize, P: Pool<N>> {
	buffer: Buffer<N, P>,
	max_buffer_size: usize,
	phase: Phase,
}

struct Shared<const N: usize, P: Pool<N>> {
	state: Mutex<State<N, P>>,
	delegate: Mutex<Option<Box<dyn Sink<N, P> + Send>>>,
	has_data: Condvar,
	has_space: Condvar,
}

/// A bounded in-memory channel backed by a [`Buffer`] (spec §4.7). Construct
/// with [`Pipe::with_pool`]/[`Pipe::new`], then split into a [`PipeReader`]
/// and [`PipeWriter`] with [`Pipe::reader`]/[`Pipe::writer`].
pub struct Pipe<const N: usize = DEFAULT_SEGMENT_SIZE, P: Pool<N> = Arc<SegmentPool<N>>> {
	shared: Arc<Shared<N, P>>,
}

impl<const N: usize, P: Pool<N>> Pipe<N, P> {
	pub fn with_pool(max_buffer_size: usize, pool: P) -> Self {
		Self::with_pool_and_options(max_buffer_size, pool, BufferOptions::default())
	}

	/// Like [`Pipe::with_pool`], but tunes the internal buffer's share/compact
	/// thresholds (spec §3 "configurable at engine initialization").
	pub fn with_pool_and_options(max_buffer_size: usize, pool: P, options: BufferOptions) -> Self {
		Self {
			shared: Arc::new(Shared {
				state: Mutex::new(State {
					buffer: Buffer::with_pool_and_options(pool, options),
					max_buffer_size,
					phase: Phase::Open,
				}),
				delegate: Mutex::new(None),
				has_data: Condvar::new(),
				has_space: Condvar::new(),
			}),
		}
	}

	/// A handle onto the consuming end. Multiple readers may be held, but the
	/// spec's single-producer/single-consumer contract assumes only one is
	/// driven at a time.
	pub fn reader(&self) -> PipeReader<N, P> { PipeReader { shared: self.shared.clone() } }

	/// A handle onto the producing end.
	pub fn writer(&self) -> PipeWriter<N, P> { PipeWriter { shared: self.shared.clone() } }

	/// Bytes currently held in the pipe's internal buffer, for tests and
	/// backpressure diagnostics.
	pub fn buffered_size(&self) -> usize {
		self.shared.state.lock().unwrap().buffer.byte_size()
	}

	/// Sets the canceled flag, clears the buffer, and wakes every waiter; both
	/// ends begin failing from this point on (spec §4.7 "Cancel").
	pub fn cancel(&self) {
		let mut state = self.shared.state.lock().unwrap();
		state.phase = Phase::Canceled;
		state.buffer.clear();
		drop(state);
		self.shared.has_data.notify_all();
		self.shared.has_space.notify_all();
	}

	/// Installs a downstream raw sink, draining any buffered bytes into it and
	/// dropping the reader side; from this point reads fail and writes pass
	/// through to `sink` (spec §4.7 "Fold").
	pub fn fold(&self, mut sink: impl Sink<N, P> + Send + 'static) -> Result<(), Error> {
		let mut state = self.shared.state.lock().unwrap();
		match state.phase {
			Phase::Canceled => return Err(Error::state(OperationKind::PipeFold, "pipe is canceled")),
			Phase::Folded => return Err(Error::state(OperationKind::PipeFold, "pipe is already folded")),
			_ => {}
		}
		let remaining = state.buffer.byte_size();
		if remaining > 0 {
			sink.write_from(&mut state.buffer, remaining)?;
		}
		state.phase = Phase::Folded;
		drop(state);
		*self.shared.delegate.lock().unwrap() = Some(Box::new(sink));
		self.shared.has_data.notify_all();
		self.shared.has_space.notify_all();
		Ok(())
	}
}

impl<const N: usize> Pipe<N, Arc<SegmentPool<N>>> {
	pub fn new(max_buffer_size: usize) -> Self {
		Self::with_pool(max_buffer_size, Arc::new(SegmentPool::new()))
	}
}

impl Pipe<DEFAULT_SEGMENT_SIZE, Arc<SegmentPool<DEFAULT_SEGMENT_SIZE>>> {
	/// A pipe backed by the process-wide default-size segment pool.
	pub fn shared(max_buffer_size: usize) -> Self {
		Self::with_pool(max_buffer_size, SegmentPool::shared())
	}
}

/// The consuming end of a [`Pipe`] (spec §4.7).
pub struct PipeReader<const N: usize, P: Pool<N>> {
	shared: Arc<Shared<N, P>>,
}

impl<const N: usize, P: Pool<N>> PipeReader<N, P> {
	/// Drains up to `byte_count` bytes into `dst`, blocking until at least one
	/// byte is available, the writer has closed (returns `-1`), or the pipe is
	/// canceled/folded (returns an error).
	pub fn read_at_most_to(&self, dst: &mut Buffer<N, P>, byte_count: usize) -> Result<isize, Error> {
		let mut state = self.shared.state.lock().unwrap();
		loop {
			match state.phase {
				Phase::Canceled => return Err(Error::state(OperationKind::PipeRead, "pipe is canceled")),
				Phase::Folded => return Err(Error::closed(OperationKind::PipeRead)),
				_ => {}
			}
			if state.buffer.byte_size() > 0 {
				let take = byte_count.min(state.buffer.byte_size());
				dst.write_from(&mut state.buffer, take)?;
				drop(state);
				self.shared.has_space.notify_all();
				return Ok(take as isize);
			}
			if state.phase == Phase::WriterClosed {
				return Ok(-1);
			}
			if state.phase == Phase::ReaderClosed {
				return Err(Error::closed(OperationKind::PipeRead));
			}
			state = self.shared.has_data.wait(state).unwrap();
		}
	}

	/// Closes the reader side. Subsequent writes fail; already-buffered bytes
	/// are dropped since nothing will ever read them.
	pub fn close(&self) {
		let mut state = self.shared.state.lock().unwrap();
		if state.phase == Phase::Open {
			state.phase = Phase::ReaderClosed;
			state.buffer.clear();
		}
		drop(state);
		self.shared.has_space.notify_all();
	}
}

impl<const N: usize, P: Pool<N>> Source<N, P> for PipeReader<N, P> {
	fn read_at_most_to(&mut self, sink: &mut Buffer<N, P>, byte_count: usize) -> Result<isize, Error> {
		PipeReader::read_at_most_to(self, sink, byte_count)
	}

	fn close(&mut self) -> Result<(), Error> {
		PipeReader::close(self);
		Ok(())
	}
}

impl<const N: usize, P: Pool<N>> Drop for PipeReader<N, P> {
	fn drop(&mut self) { self.close(); }
}

/// The producing end of a [`Pipe`] (spec §4.7).
pub struct PipeWriter<const N: usize, P: Pool<N>> {
	shared: Arc<Shared<N, P>>,
}

impl<const N: usize, P: Pool<N>> PipeWriter<N, P> {
	/// Writes exactly `byte_count` bytes from `src`, blocking while the
	/// pipe's internal buffer is at capacity. Once the pipe has been folded
	/// (spec §4.7 "Fold"), writes pass through to the installed delegate
	/// outside the pipe's lock.
	pub fn write_from(&self, src: &mut Buffer<N, P>, byte_count: usize) -> Result<(), Error> {
		let mut state = self.shared.state.lock().unwrap();
		match state.phase {
			Phase::Canceled => return Err(Error::state(OperationKind::PipeWrite, "pipe is canceled")),
			Phase::ReaderClosed => return Err(Error::closed(OperationKind::PipeWrite)),
			Phase::WriterClosed => return Err(Error::closed(OperationKind::PipeWrite)),
			Phase::Folded => {
				drop(state);
				let mut delegate = self.shared.delegate.lock().unwrap();
				let sink = delegate.as_mut().expect("folded pipe always has a delegate");
				return sink.write_from(src, byte_count);
			}
			Phase::Open => {}
		}

		let mut remaining = byte_count;
		while remaining > 0 {
			match state.phase {
				Phase::Canceled => return Err(Error::state(OperationKind::PipeWrite, "pipe is canceled")),
				Phase::ReaderClosed => return Err(Error::closed(OperationKind::PipeWrite)),
				Phase::Folded => {
					drop(state);
					let mut delegate = self.shared.delegate.lock().unwrap();
					let sink = delegate.as_mut().expect("folded pipe always has a delegate");
					return sink.write_from(src, remaining);
				}
				_ => {}
			}
			let room = state.max_buffer_size.saturating_sub(state.buffer.byte_size());
			if room == 0 {
				state = self.shared.has_space.wait(state).unwrap();
				continue;
			}
			let take = room.min(remaining);
			state.buffer.write_from(src, take)?;
			remaining -= take;
			self.shared.has_data.notify_all();
		}
		Ok(())
	}

	/// Closes the writer side. Buffered bytes remain drainable by the reader,
	/// which then observes end-of-stream once they're exhausted.
	pub fn close(&self) {
		let mut state = self.shared.state.lock().unwrap();
		if state.phase == Phase::Open {
			state.phase = Phase::WriterClosed;
		}
		drop(state);
		self.shared.has_data.notify_all();
	}

	pub fn flush(&self) -> Result<(), Error> {
		let mut state = self.shared.state.lock().unwrap();
		if state.phase == Phase::Folded {
			drop(state);
			return self.shared.delegate.lock().unwrap().as_mut().expect("folded").flush();
		}
		Ok(())
	}
}

impl<const N: usize, P: Pool<N>> Sink<N, P> for PipeWriter<N, P> {
	fn write_from(&mut self, source: &mut Buffer<N, P>, byte_count: usize) -> Result<(), Error> {
		PipeWriter::write_from(self, source, byte_count)
	}

	fn flush(&mut self) -> Result<(), Error> { PipeWriter::flush(self) }

	fn close(&mut self) -> Result<(), Error> {
		PipeWriter::close(self);
		Ok(())
	}
}

impl<const N: usize, P: Pool<N>> Drop for PipeWriter<N, P> {
	fn drop(&mut self) { self.close(); }
}
