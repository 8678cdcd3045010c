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

use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

/// Hashes the current thread's id down to a partition index in `[0, partitions)`.
pub(crate) fn thread_partition(partitions: usize) -> usize {
	let mut hasher = DefaultHasher::new();
	std::thread::current().id().hash(&mut hasher);
	(hasher.finish() as usize) % partitions.max(1)
}
