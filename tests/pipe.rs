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

use std::sync::Arc;
use std::thread;
use pretty_assertions::assert_eq;
use fluxio::pool::SegmentPool;
use fluxio::streams::BufferedReader;
use fluxio::Pipe;

#[test]
fn pipe_feeds_a_buffered_reader_across_threads() {
	let pool: Arc<SegmentPool<16>> = Arc::new(SegmentPool::new());
	let pipe: Pipe<16, Arc<SegmentPool<16>>> = Pipe::with_pool(256, pool.clone());
	let writer = pipe.writer();
	let reader = pipe.reader();

	let producer_pool = pool.clone();
	let producer = thread::spawn(move || {
		let mut src = fluxio::Buffer::<16, Arc<SegmentPool<16>>>::with_pool(producer_pool);
		src.write_bytes(b"message delivered through a pipe");
		writer.write_from(&mut src, 33).unwrap();
	});

	let mut buffered: BufferedReader<16, _, _> = BufferedReader::new(reader, pool);
	let size = buffered.expect_size(33).unwrap();
	assert_eq!(size, 33);
	let bs = buffered.read_byte_string(33).unwrap();
	assert_eq!(bs.as_bytes(), b"message delivered through a pipe");

	producer.join().unwrap();
}
