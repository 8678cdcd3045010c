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

//! ## How it works
//!
//! Data is written to and read from reusable bits of memory called *segments*.
//! When a segment is consumed, it's returned to a *pool*. To write data, segments
//! are claimed from this pool. When the pool is exhausted, segments are created up
//! to a set limit. The pool is partitioned by thread (a hash of the thread's id
//! picks a partition), so the common claim/recycle path never contends a lock;
//! a global overflow partition catches segments a thread's own partition can't
//! hold.
//!
//! ### Segments
//!
//! Segments are reusable chunks of memory arranged in a ring buffer. Memory within
//! segments can either be owned by or shared between segments, avoiding expensive
//! mem-copy operations as much as possible. Shared memory is copy-on-write; it can
//! be read by multiple segments, only copying when written. Small amounts of data
//! under a set threshold (1024B by default) are not shared, as a tradeoff between
//! memory allocation performance and speed.
//!
//! The ring buffer behaves as a continuous byte deque. Bytes are read from one end
//! and written to the other, claiming new segments from the pool as it fills. Data
//! can have gaps where some segments are not filled or partially read, called *voids*.
//! Compacting these on every write could be costly, but keeping them is less space
//! efficient which would lead to more allocations. As void size reaches a threshold,
//! 4096B by default, all segments are compacted. This can also be triggered manually
//! with the `compact` function.
//!
//! Segments can be allocated when: 1) a buffer requests one but the pool has none
//! left, or 2) a shared segment is written to and must fork into its own array.

mod buffer;
mod error;
pub mod streams;
mod segment;
mod element;
pub mod pool;
mod util;
mod byte_str;
mod options;
mod pipe;
mod config;

pub use error::*;
pub use buffer::*;
pub use segment::{Segment, DEFAULT_SEGMENT_SIZE as SEGMENT_SIZE};
pub use byte_str::*;
pub use options::Options;
pub use pipe::{Pipe, PipeReader, PipeWriter};
pub use config::EngineConfig;
