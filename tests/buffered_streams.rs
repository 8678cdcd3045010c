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

use std::sync::{Arc, Mutex};
use pretty_assertions::assert_eq;
use fluxio::pool::SegmentPool;
use fluxio::streams::{AsyncReader, BufferedReader, BufferedWriter, Sink};
use fluxio::{Buffer, Error};

struct VecSink(Arc<Mutex<Vec<u8>>>);

impl<const N: usize, P: fluxio::pool::Pool<N> + Clone + 'static> Sink<N, P> for VecSink {
	fn write_from(&mut self, source: &mut Buffer<N, P>, byte_count: usize) -> Result<(), Error> {
		let bs = source.read_byte_string(byte_count)?;
		self.0.lock().unwrap().extend_from_slice(bs.as_bytes());
		Ok(())
	}
}

#[test]
fn buffered_reader_reads_whole_source_in_segment_chunks() {
	let pool: Arc<SegmentPool<16>> = Arc::new(SegmentPool::new());
	let data = b"the quick brown fox jumps over the lazy dog".as_slice();
	let mut reader: BufferedReader<16, _, _> = BufferedReader::new(data, pool);
	let size = reader.expect_size(data.len()).unwrap();
	assert_eq!(size, data.len());
	let bs = reader.read_byte_string(data.len()).unwrap();
	assert_eq!(bs.as_bytes(), data);
}

#[test]
fn buffered_writer_round_trips_through_vec_sink() {
	let pool: Arc<SegmentPool<8>> = Arc::new(SegmentPool::new());
	let out = Arc::new(Mutex::new(Vec::new()));
	{
		let mut writer: BufferedWriter<8, _, _> = BufferedWriter::new(VecSink(out.clone()), pool);
		writer.write_bytes(b"hello, world! this spans multiple segments").unwrap();
		writer.close().unwrap();
	}
	assert_eq!(&*out.lock().unwrap(), b"hello, world! this spans multiple segments");
}

#[test]
fn async_reader_prefetches_in_background() {
	let pool: Arc<SegmentPool<4>> = Arc::new(SegmentPool::new());
	let data: &[u8] = b"prefetched payload of moderate length";
	let reader: AsyncReader<4, Arc<SegmentPool<4>>> = AsyncReader::spawn(data, pool);
	let size = reader.expect_size(data.len()).unwrap();
	assert_eq!(size, data.len());

	let mut dst = fluxio::Buffer::<4, Arc<SegmentPool<4>>>::with_pool(Arc::new(SegmentPool::new()));
	let n = reader.read_into(&mut dst, data.len()).unwrap();
	assert_eq!(n, data.len());
	assert_eq!(dst.read_byte_string(data.len()).unwrap().as_bytes(), data);
}
