// Copyright 2024 Kevin Ludwig
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

//! Backing-store abstraction the core filesystem engine is generic over.
//!
//! The concrete image mapper (in `fat16_store_mmap`) owns the mapping for the lifetime of the
//! mount; every other component only ever borrows bounded slices out of it through this trait.
//! Keeping the trait here (and the mmap-backed implementation in its own crate) mirrors the
//! interface/backend split the rest of this workspace uses for errors and the FAT engine, and
//! lets the core engine be exercised in tests against a plain `Vec<u8>` without a real file.

use fat16_err::Result;

pub trait ImageStore {
    /// Read-only view of the entire backing image.
    fn as_bytes(&self) -> &[u8];

    /// Mutable view of the entire backing image.
    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// Total size of the backing image in bytes.
    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush outstanding writes to the underlying medium. Called once, synchronously, on
    /// unmount.
    fn flush(&mut self) -> Result<()>;
}

/// A plain in-memory store, used by unit tests that don't need a real file on disk.
impl ImageStore for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
