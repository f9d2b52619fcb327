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

//! On-disk format, cluster allocator, directory store, path resolver and file I/O engine for the
//! FAT16 userspace filesystem driver.
//!
//! The core type, [`FatFileSystem`], is generic over [`ImageStore`] so it can be driven by a real
//! memory-mapped image (`fat16_store_mmap::MmapStore`) or, in tests, by a plain `Vec<u8>`.

mod alloc;
mod dir;
pub mod dirent;
mod io;
mod ops;
mod resolve;
pub mod superblock;

use std::ops::Range;

use fat16_err::{FsError, Result};
use fat16_store::ImageStore;
use superblock::{Superblock, FAT_EOF, FAT_RESERVED_0, SUPERBLOCK_SIZE};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, IntoBytes};

pub use dirent::DirEntry;
pub use resolve::DirLocation;

/// Default backing-image size. Images of other sizes are valid but not portable between builds
/// with a different `CLUSTER_SIZE`.
pub const DISK_SIZE: u64 = 16 * 1024 * 1024;
/// Compile-time cluster size; images are not portable across builds using a different value.
pub const CLUSTER_SIZE: u32 = 4096;

pub struct FatFileSystem<S: ImageStore> {
    store: S,
    cluster_size: u32,
    total_clusters: u32,
    fat_offset: u64,
    root_dir_offset: u64,
    data_offset: u64,
}

impl<S: ImageStore> FatFileSystem<S> {
    /// Mount an image. If `fresh` is set the image is formatted first (see [`DISK_SIZE`] /
    /// [`CLUSTER_SIZE`]); otherwise the existing superblock is trusted and all layout fields are
    /// rebound from it.
    pub fn mount(mut store: S, fresh: bool) -> Result<Self> {
        if fresh {
            format(&mut store)?;
        }

        let sb = read_superblock(&store)?;
        let cluster_size = sb.cluster_size.get();
        let total_clusters = sb.total_clusters.get();
        let fat_offset = sb.fat_offset.get() as u64;
        let root_dir_offset = sb.root_dir_offset.get() as u64;
        let data_offset = sb.data_offset.get() as u64;

        if cluster_size == 0 || (data_offset as usize) > store.len() {
            log::error!("superblock layout does not fit inside the mapped image");
            return Err(FsError::Corrupt.into());
        }

        Ok(Self {
            store,
            cluster_size,
            total_clusters,
            fat_offset,
            root_dir_offset,
            data_offset,
        })
    }

    pub fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    pub fn total_clusters(&self) -> u32 {
        self.total_clusters
    }

    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn root_dir_range(&self) -> Range<usize> {
        self.root_dir_offset as usize..(self.root_dir_offset + self.cluster_size as u64) as usize
    }

    fn cluster_range(&self, cluster: u16) -> Range<usize> {
        let start = self.data_offset + (cluster as u64 - 2) * self.cluster_size as u64;
        start as usize..(start + self.cluster_size as u64) as usize
    }

    fn dir_range(&self, loc: DirLocation) -> Range<usize> {
        match loc {
            DirLocation::Root => self.root_dir_range(),
            DirLocation::Cluster(c) => self.cluster_range(c),
        }
    }

    fn dir_bytes(&self, loc: DirLocation) -> &[u8] {
        let range = self.dir_range(loc);
        &self.store.as_bytes()[range]
    }

    fn dir_bytes_mut(&mut self, loc: DirLocation) -> &mut [u8] {
        let range = self.dir_range(loc);
        &mut self.store.as_bytes_mut()[range]
    }

    fn entries_per_dir(&self) -> usize {
        self.cluster_size as usize / dirent::DIR_ENTRY_SIZE
    }
}

fn read_superblock<S: ImageStore>(store: &S) -> Result<Superblock> {
    let bytes = store
        .as_bytes()
        .get(..SUPERBLOCK_SIZE)
        .ok_or(FsError::Corrupt)?;
    let sb = Superblock::ref_from_bytes(bytes).map_err(|_| FsError::Corrupt)?;
    Ok(*sb)
}

/// Lay out superblock, FAT, root directory and data area across the (already zero-filled) image,
/// per §4.1: `total_clusters = (DISK_SIZE - size_of::<Superblock>()) / (cluster_size + 2)`.
fn format<S: ImageStore>(store: &mut S) -> Result<()> {
    let disk_size = store.len() as u64;
    let total_clusters =
        ((disk_size - SUPERBLOCK_SIZE as u64) / (CLUSTER_SIZE as u64 + 2)) as u32;
    let fat_offset = SUPERBLOCK_SIZE as u64;
    let root_dir_offset = fat_offset + total_clusters as u64 * 2;
    let data_offset = root_dir_offset + CLUSTER_SIZE as u64;

    if data_offset > disk_size {
        log::error!("image too small to hold even a single cluster");
        return Err(FsError::NoSpace.into());
    }

    {
        let sb_bytes = store
            .as_bytes_mut()
            .get_mut(..SUPERBLOCK_SIZE)
            .ok_or(FsError::Corrupt)?;
        let sb = Superblock::mut_from_bytes(sb_bytes).map_err(|_| FsError::Corrupt)?;
        sb.total_clusters = U32::new(total_clusters);
        sb.fat_offset = U32::new(fat_offset as u32);
        sb.root_dir_offset = U32::new(root_dir_offset as u32);
        sb.data_offset = U32::new(data_offset as u32);
        sb.cluster_size = U32::new(CLUSTER_SIZE);
    }

    {
        let fat_head = &mut store.as_bytes_mut()[fat_offset as usize..fat_offset as usize + 4];
        fat_head[0..2].copy_from_slice(&FAT_RESERVED_0.to_le_bytes());
        fat_head[2..4].copy_from_slice(&FAT_EOF.to_le_bytes());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn mounted_fresh() -> FatFileSystem<Vec<u8>> {
        let store = vec![0u8; DISK_SIZE as usize];
        FatFileSystem::mount(store, true).expect("fresh mount must succeed")
    }

    #[test]
    fn fresh_format_lays_out_fat0_and_fat1() {
        let fs = mounted_fresh();
        assert_eq!(fs.fat_entry(0).unwrap(), FAT_RESERVED_0);
        assert_eq!(fs.fat_entry(1).unwrap(), FAT_EOF);
        assert!(fs.total_clusters() > 0);
    }

    #[test]
    fn remount_rebinds_from_existing_superblock() {
        let fs = mounted_fresh();
        let (cluster_size, total_clusters) = (fs.cluster_size(), fs.total_clusters());
        let store = fs.into_store();

        let remounted = FatFileSystem::mount(store, false).unwrap();
        assert_eq!(remounted.cluster_size(), cluster_size);
        assert_eq!(remounted.total_clusters(), total_clusters);
    }
}
