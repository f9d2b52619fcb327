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

use std::fs::{File, OpenOptions};
use std::path::Path;

use fat16_err::Result;
use fat16_store::ImageStore;
use log::{error, warn};
use memmap2::MmapMut;

/// Owns the memory mapping of the backing image file for the lifetime of the mount.
///
/// Opens the image for read+write, creating and zero-sizing it to `disk_size` if absent, then
/// maps it with shared read+write semantics. `fresh` reports whether the image was just created,
/// so the caller knows whether to format it.
pub struct MmapStore {
    mmap: MmapMut,
    file: File,
}

impl MmapStore {
    pub fn open(path: &Path, disk_size: u64) -> Result<(Self, bool)> {
        let fresh = !path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_len(disk_size)?;

        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        if fresh {
            mmap.fill(0);
        }

        Ok((Self { mmap, file }, fresh))
    }

    /// Flush and unmap. Called once on unmount; failures are logged but do not stop the unmount.
    pub fn close(mut self) {
        if let Err(e) = self.flush() {
            error!("failed to sync image on unmount: {e}");
        }
        drop(self.mmap);
        if let Err(e) = self.file.sync_all() {
            warn!("failed to sync image file descriptor on unmount: {e}");
        }
    }
}

impl ImageStore for MmapStore {
    fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    fn flush(&mut self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }
}
