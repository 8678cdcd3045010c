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

//! Collaborator contracts (spec §4.8) and buffered reader/writer wrappers
//! (spec §4.6) built on top of [`crate::Buffer`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use crate::pool::{Pool, SegmentPool};
use crate::segment::DEFAULT_SEGMENT_SIZE;
use crate::{Buffer, Error, ErrorKind, OperationKind};

/// A cooperative cancellation signal, checked at each iteration of
/// long-running loops (spec §4.8, §5). Cheaply cloneable; all clones share
/// one flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	pub fn new() -> Self { Self::default() }

	pub fn cancel(&self) { self.0.store(true, Ordering::Release); }

	pub fn is_canceled(&self) -> bool { self.0.load(Ordering::Acquire) }

	/// Returns a cancellation error if this token has been triggered.
	pub fn throw_if_reached(&self, op: OperationKind) -> Result<(), Error> {
		if self.is_canceled() {
			Err(Error::cancellation(op))
		} else {
			Ok(())
		}
	}
}

/// A raw byte source (spec §4.8): reads into a [`Buffer`], blocking as
/// needed. Implementations must not return `Ok(0)` except at end-of-stream,
/// where they return `Ok(-1)` instead (mirroring the collaborator contract's
/// `bytes_read | -1` sentinel).
pub trait Source<const N: usize, P: Pool<N>> {
	/// Reads at most `byte_count` bytes into `sink`. Returns the number of
	/// bytes read, or `-1` at end-of-stream.
	fn read_at_most_to(&mut self, sink: &mut Buffer<N, P>, byte_count: usize) -> Result<isize, Error>;

	/// Closes the source. Idempotent; closing twice has no effect.
	fn close(&mut self) -> Result<(), Error> { Ok(()) }
}

/// A raw byte sink (spec §4.8): drains exactly `byte_count` bytes from the
/// head of a [`Buffer`].
pub trait Sink<const N: usize, P: Pool<N>> {
	/// Consumes exactly `byte_count` bytes from the head of `source`.
	fn write_from(&mut self, source: &mut Buffer<N, P>, byte_count: usize) -> Result<(), Error>;

	/// Flushes any internally buffered bytes to their final target.
	fn flush(&mut self) -> Result<(), Error> { Ok(()) }

	/// Flushes and closes the sink. Idempotent.
	fn close(&mut self) -> Result<(), Error> { self.flush() }
}

impl<const N: usize, P: Pool<N>> Source<N, P> for &[u8] {
	fn read_at_most_to(&mut self, sink: &mut Buffer<N, P>, byte_count: usize) -> Result<isize, Error> {
		if self.is_empty() {
			return Ok(-1);
		}
		let take = byte_count.min(self.len());
		sink.write_bytes(&self[..take]);
		*self = &self[take..];
		Ok(take as isize)
	}
}

impl<const N: usize, P: Pool<N> + Clone + 'static> Sink<N, P> for Vec<u8> {
	fn write_from(&mut self, source: &mut Buffer<N, P>, byte_count: usize) -> Result<(), Error> {
		source.require(byte_count)?;
		let bs = source.read_byte_string(byte_count)?;
		self.extend_from_slice(bs.as_bytes());
		Ok(())
	}
}

/// Holds a target raw sink plus an owned [`Buffer`] (spec §4.6.1). Each
/// `write_*` pushes complete segments to the sink immediately; the partial
/// tail segment waits for [`BufferedWriter::emit`]/[`flush`](Self::flush).
pub struct BufferedWriter<const N: usize, P: Pool<N>, S: Sink<N, P>> {
	sink: S,
	buffer: Buffer<N, P>,
	closed: bool,
}

impl<const N: usize, P: Pool<N>, S: Sink<N, P>> BufferedWriter<N, P, S> {
	pub fn new(sink: S, pool: P) -> Self {
		Self { sink, buffer: Buffer::with_pool(pool), closed: false }
	}

	fn check_open(&self) -> Result<(), Error> {
		if self.closed {
			Err(Error::closed(OperationKind::StreamFlush))
		} else {
			Ok(())
		}
	}

	/// Appends bytes to the internal buffer, then emits whatever complete
	/// segments resulted.
	pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.check_open()?;
		self.buffer.write_bytes(bytes);
		self.emit()
	}

	/// Pushes every complete, unshared segment to the raw sink, leaving the
	/// still-writable tail buffered (spec §4.6.1 `emit_complete_segments`).
	pub fn emit(&mut self) -> Result<(), Error> {
		self.check_open()?;
		let complete = self.buffer.complete_segment_bytes();
		if complete > 0 {
			self.sink.write_from(&mut self.buffer, complete)?;
		}
		Ok(())
	}

	/// Drains every buffered byte to the raw sink, then flushes it.
	pub fn flush(&mut self) -> Result<(), Error> {
		self.check_open()?;
		let remaining = self.buffer.byte_size();
		if remaining > 0 {
			self.sink.write_from(&mut self.buffer, remaining)?;
		}
		self.sink.flush()
	}

	/// Drains once, closes the sink, and marks this writer closed. Closing
	/// twice has no effect.
	pub fn close(&mut self) -> Result<(), Error> {
		if self.closed {
			return Ok(());
		}
		let result = self.flush().and_then(|_| self.sink.close());
		self.closed = true;
		result
	}
}

impl<const N: usize, P: Pool<N>, S: Sink<N, P>> Drop for BufferedWriter<N, P, S> {
	fn drop(&mut self) { let _ = self.close(); }
}

/// Holds a source plus an owned [`Buffer`] (spec §4.6.2).
pub struct BufferedReader<const N: usize, P: Pool<N>, S: Source<N, P>> {
	source: S,
	buffer: Buffer<N, P>,
	closed: bool,
	exhausted: bool,
}

impl<const N: usize, P: Pool<N>, S: Source<N, P>> BufferedReader<N, P, S> {
	pub fn new(source: S, pool: P) -> Self {
		Self { source, buffer: Buffer::with_pool(pool), closed: false, exhausted: false }
	}

	pub fn buffer(&self) -> &Buffer<N, P> { &self.buffer }
	pub fn buffer_mut(&mut self) -> &mut Buffer<N, P> { &mut self.buffer }

	fn check_open(&self) -> Result<(), Error> {
		if self.closed {
			Err(Error::closed(OperationKind::StreamFill))
		} else {
			Ok(())
		}
	}

	/// Fills the buffer until it holds at least `n` bytes or the source is
	/// exhausted, pulling in chunks of at least one segment (spec §4.6.2).
	/// Returns the buffer's final size, which may be less than `n` at EOF.
	pub fn expect_size(&mut self, n: usize) -> Result<usize, Error> {
		self.check_open()?;
		while self.buffer.byte_size() < n && !self.exhausted {
			let want = (n - self.buffer.byte_size()).max(N);
			match self.source.read_at_most_to(&mut self.buffer, want)? {
				-1 => self.exhausted = true,
				_ => {}
			}
		}
		Ok(self.buffer.byte_size())
	}

	pub fn require(&mut self, n: usize) -> Result<(), Error> {
		if self.expect_size(n)? < n {
			Err(Error::eos(OperationKind::StreamFill))
		} else {
			Ok(())
		}
	}

	pub fn request(&mut self, n: usize) -> Result<bool, Error> {
		Ok(self.expect_size(n)? >= n)
	}

	pub fn read_byte(&mut self) -> Result<u8, Error> {
		self.require(1)?;
		self.buffer.read_byte()
	}

	pub fn read_byte_string(&mut self, n: usize) -> Result<crate::ReadBytes<N>, Error>
	where
		P: Clone + 'static,
	{
		self.require(n)?;
		self.buffer.read_byte_string(n)
	}

	pub fn close(&mut self) -> Result<(), Error> {
		if self.closed {
			return Ok(());
		}
		self.closed = true;
		self.buffer.clear();
		self.source.close()
	}
}

impl<const N: usize, P: Pool<N>, S: Source<N, P>> Drop for BufferedReader<N, P, S> {
	fn drop(&mut self) { let _ = self.close(); }
}

const ASYNC_READER_CAP: usize = 256 * 1024;

struct AsyncState<const N: usize, P: Pool<N>> {
	buffer: Buffer<N, P>,
	expected_size: usize,
	exhausted: bool,
	error: Option<Error>,
	shutdown: bool,
}

/// A [`BufferedReader`] variant that prefetches from its source on a
/// dedicated worker thread (spec §4.6.3), so the main thread's
/// `expect_size` rarely blocks on I/O directly.
pub struct AsyncReader<const N: usize, P: Pool<N> + 'static> {
	state: Arc<Mutex<AsyncState<N, P>>>,
	reached: Arc<Condvar>,
	resume: Arc<Condvar>,
	worker: Option<JoinHandle<()>>,
}

impl<const N: usize, P: Pool<N> + 'static> AsyncReader<N, P> {
	pub fn spawn<S>(mut source: S, pool: P) -> Self
	where
		S: Source<N, P> + Send + 'static,
	{
		let state = Arc::new(Mutex::new(AsyncState {
			buffer: Buffer::with_pool(pool),
			expected_size: 0,
			exhausted: false,
			error: None,
			shutdown: false,
		}));
		let reached = Arc::new(Condvar::new());
		let resume = Arc::new(Condvar::new());

		let worker_state = state.clone();
		let worker_reached = reached.clone();
		let worker_resume = resume.clone();
		let worker = std::thread::spawn(move || {
			loop {
				let mut guard = worker_state.lock().unwrap();
				while !guard.shutdown
					&& guard.buffer.byte_size() >= guard.expected_size
					&& guard.buffer.byte_size() < ASYNC_READER_CAP
					&& !guard.exhausted
				{
					guard = worker_resume.wait(guard).unwrap();
				}
				if guard.shutdown {
					return;
				}
				if guard.exhausted {
					worker_reached.notify_all();
					continue;
				}
				drop(guard);
				let mut guard = worker_state.lock().unwrap();
				let want = ASYNC_READER_CAP.saturating_sub(guard.buffer.byte_size()).max(N);
				match source.read_at_most_to(&mut guard.buffer, want) {
					Ok(-1) => guard.exhausted = true,
					Ok(_) => {}
					Err(e) => {
						guard.error = Some(e);
						guard.exhausted = true;
					}
				}
				worker_reached.notify_all();
			}
		});

		Self { state, reached, resume, worker: Some(worker) }
	}

	/// Waits until the buffer holds at least `n` bytes or the source is
	/// exhausted, returning the resulting size.
	pub fn expect_size(&self, n: usize) -> Result<usize, Error> {
		let mut guard = self.state.lock().unwrap();
		if guard.buffer.byte_size() >= n {
			return Ok(guard.buffer.byte_size());
		}
		guard.expected_size = n;
		self.resume.notify_all();
		while guard.buffer.byte_size() < n && !guard.exhausted {
			guard = self.reached.wait(guard).unwrap();
		}
		if let Some(err) = guard.error.take() {
			return Err(err);
		}
		Ok(guard.buffer.byte_size())
	}

	/// Drains `n` bytes from the prefetch buffer into `dst`, waiting for
	/// enough bytes to arrive first.
	pub fn read_into(&self, dst: &mut Buffer<N, P>, n: usize) -> Result<usize, Error> {
		let available = self.expect_size(n)?;
		let take = available.min(n);
		let mut guard = self.state.lock().unwrap();
		dst.write_from(&mut guard.buffer, take)?;
		self.resume.notify_all();
		Ok(take)
	}
}

impl<const N: usize, P: Pool<N> + 'static> Drop for AsyncReader<N, P> {
	fn drop(&mut self) {
		if let Ok(mut guard) = self.state.lock() {
			guard.shutdown = true;
		}
		self.resume.notify_all();
		if let Some(handle) = self.worker.take() {
			let _ = handle.join();
		}
	}
}

/// The process-wide default buffered writer/reader types, backed by the
/// shared default-size segment pool.
pub type DefaultBufferedWriter<S> =
	BufferedWriter<DEFAULT_SEGMENT_SIZE, Arc<SegmentPool<DEFAULT_SEGMENT_SIZE>>, S>;
pub type DefaultBufferedReader<S> =
	BufferedReader<DEFAULT_SEGMENT_SIZE, Arc<SegmentPool<DEFAULT_SEGMENT_SIZE>>, S>;

#[cfg(test)]
mod test {
	use super::*;
	use crate::pool::SegmentPool;

	#[test]
	fn buffered_writer_emits_complete_segments_only() {
		let mut out = Vec::new();
		{
			let pool: Arc<SegmentPool<8>> = Arc::new(SegmentPool::new());
			let mut writer: BufferedWriter<8, _, _> = BufferedWriter::new(Vec::<u8>::new(), pool);
			writer.write_bytes(b"abcdefghij").unwrap();
			writer.flush().unwrap();
			out = std::mem::take(&mut writer.sink);
		}
		assert_eq!(out, b"abcdefghij");
	}

	#[test]
	fn buffered_reader_expect_size_pulls_until_satisfied() {
		let pool: Arc<SegmentPool<4>> = Arc::new(SegmentPool::new());
		let data: &[u8] = b"hello world";
		let mut reader: BufferedReader<4, _, _> = BufferedReader::new(data, pool);
		let size = reader.expect_size(8).unwrap();
		assert!(size >= 8);
		let out = reader.read_byte_string(8).unwrap();
		assert_eq!(out.as_bytes(), b"hello wo");
	}

	#[test]
	fn cancellation_token_reports_after_cancel() {
		let token = CancellationToken::new();
		assert!(token.throw_if_reached(OperationKind::StreamFill).is_ok());
		token.cancel();
		assert!(token.throw_if_reached(OperationKind::StreamFill).is_err());
	}
}
