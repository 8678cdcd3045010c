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

//! Environment-driven tuning for the pool partitions. Segment capacity itself is a
//! const generic (`Segment<const N: usize>`), fixed at compile time; `SEGMENT_SIZE`
//! only validates that the environment agrees with the compiled-in capacity instead
//! of resizing anything at runtime.

use std::env;
use once_cell::sync::Lazy;
use crate::{Error, ErrorKind};

const MAX_PARTITION_BYTES_DEFAULT: usize = 256 * 1024;
const MAX_POOL_BYTES_DEFAULT: usize = 4 * 1024 * 1024;

/// Runtime-tunable pool limits, read once from the environment.
#[derive(Copy, Clone, Debug)]
pub struct EngineConfig {
	pub max_partition_bytes: usize,
	pub max_pool_bytes: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			max_partition_bytes: MAX_PARTITION_BYTES_DEFAULT,
			max_pool_bytes: MAX_POOL_BYTES_DEFAULT,
		}
	}
}

fn read_usize_env(name: &str, default: usize) -> usize {
	env::var(name)
		.ok()
		.and_then(|v| v.parse().ok())
		.unwrap_or(default)
}

static CONFIG: Lazy<EngineConfig> = Lazy::new(|| EngineConfig {
	max_partition_bytes: read_usize_env("MAX_PARTITION_BYTES", MAX_PARTITION_BYTES_DEFAULT),
	max_pool_bytes: read_usize_env("MAX_POOL_BYTES", MAX_POOL_BYTES_DEFAULT),
});

impl EngineConfig {
	/// Returns the process-wide config, lazily read from the environment on first
	/// access.
	pub fn get() -> EngineConfig { *CONFIG }

	/// Validates that the `SEGMENT_SIZE` environment variable, if set, agrees with
	/// the compiled-in segment capacity `n`. A mismatch is an argument error rather
	/// than a silent resize, since segment capacity is fixed at compile time.
	pub fn validate_segment_size(n: usize) -> Result<(), Error> {
		match env::var("SEGMENT_SIZE").ok().and_then(|v| v.parse::<usize>().ok()) {
			Some(requested) if requested != n => Err(Error::argument(format!(
				"SEGMENT_SIZE={requested} does not match the compiled-in segment size {n}"
			))),
			_ => Ok(()),
		}
	}
}
