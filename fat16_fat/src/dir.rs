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

use fat16_err::{FsError, Result};
use fat16_store::ImageStore;
use zerocopy::little_endian::{U16, U32};
use zerocopy::FromBytes;

use crate::dirent::{
    encode_8_3, DirEntry, ATTR_DIRECTORY, DOTDOT_EXT, DOTDOT_NAME, DOT_EXT, DOT_NAME,
    DIR_ENTRY_SIZE,
};
use crate::resolve::DirLocation;
use crate::FatFileSystem;

/// A directory entry's location: which cluster-sized directory block, and which 32-byte slot
/// within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntrySlot {
    pub loc: DirLocation,
    pub index: usize,
}

impl EntrySlot {
    fn byte_range(&self) -> std::ops::Range<usize> {
        let start = self.index * DIR_ENTRY_SIZE;
        start..start + DIR_ENTRY_SIZE
    }
}

impl<S: ImageStore> FatFileSystem<S> {
    pub(crate) fn entry_at(&self, slot: EntrySlot) -> DirEntry {
        let dir = self.dir_bytes(slot.loc);
        *DirEntry::ref_from_bytes(&dir[slot.byte_range()]).expect("entry slot is 32 bytes")
    }

    pub(crate) fn entry_at_mut(&mut self, slot: EntrySlot) -> &mut DirEntry {
        let dir = self.dir_bytes_mut(slot.loc);
        let range = slot.byte_range();
        DirEntry::mut_from_bytes(&mut dir[range]).expect("entry slot is 32 bytes")
    }

    /// Normalise `name` to 8.3 and scan every slot of `loc`, skipping tombstones, never-used
    /// slots and the volume label. Continues past a `0x00` slot rather than stopping there, per
    /// §3: "scans still cover the full block".
    pub(crate) fn find_entry(&self, loc: DirLocation, name: &str) -> Result<Option<EntrySlot>> {
        let Some((target_name, target_ext)) = encode_8_3(name) else {
            return Ok(None);
        };
        for index in 0..self.entries_per_dir() {
            let slot = EntrySlot { loc, index };
            let entry = self.entry_at(slot);
            if entry.is_free_slot() || entry.is_volume_label() {
                continue;
            }
            if entry.name == target_name && entry.ext == target_ext {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    pub(crate) fn find_free_slot(&self, loc: DirLocation) -> Result<EntrySlot> {
        for index in 0..self.entries_per_dir() {
            let slot = EntrySlot { loc, index };
            if self.entry_at(slot).is_free_slot() {
                return Ok(slot);
            }
        }
        Err(FsError::NoSpace.into())
    }

    pub(crate) fn insert_dir_entry(
        &mut self,
        loc: DirLocation,
        name: &str,
        attributes: u8,
        first_cluster: u16,
        file_size: u32,
    ) -> Result<EntrySlot> {
        let (name_bytes, ext_bytes) = encode_8_3(name).ok_or(FsError::InvalidArgument)?;
        let slot = self.find_free_slot(loc)?;
        let entry = self.entry_at_mut(slot);
        entry.zero();
        entry.name = name_bytes;
        entry.ext = ext_bytes;
        entry.attributes = attributes;
        entry.first_cluster = U16::new(first_cluster);
        entry.file_size = U32::new(file_size);
        Ok(slot)
    }

    pub(crate) fn tombstone_slot(&mut self, slot: EntrySlot) {
        self.entry_at_mut(slot).tombstone();
    }

    /// Live (non-tombstone, non-volume-label) entries of `loc`, excluding the raw `.`/`..`
    /// records (suppressed so callers don't see them twice alongside the synthesised pair).
    pub(crate) fn live_entries(&self, loc: DirLocation) -> Vec<(EntrySlot, DirEntry)> {
        let mut out = Vec::new();
        for index in 0..self.entries_per_dir() {
            let slot = EntrySlot { loc, index };
            let entry = self.entry_at(slot);
            if entry.is_free_slot() || entry.is_volume_label() {
                continue;
            }
            if is_dot_or_dotdot(&entry) {
                continue;
            }
            out.push((slot, entry));
        }
        out
    }

    /// `readdir`'s listing: `.` and `..` synthesised first, then every live entry with its
    /// on-disk 8.3 name decoded back to lowercase `name[.ext]`.
    pub fn readdir(&self, loc: DirLocation) -> Result<Vec<(String, DirEntry)>> {
        let mut out = Vec::with_capacity(self.entries_per_dir());
        out.push((".".to_string(), synthetic_dir_entry()));
        out.push(("..".to_string(), synthetic_dir_entry()));
        for (_, entry) in self.live_entries(loc) {
            out.push((entry.display_name(), entry));
        }
        Ok(out)
    }
}

fn is_dot_or_dotdot(entry: &DirEntry) -> bool {
    (entry.name == DOT_NAME && entry.ext == DOT_EXT)
        || (entry.name == DOTDOT_NAME && entry.ext == DOTDOT_EXT)
}

fn synthetic_dir_entry() -> DirEntry {
    DirEntry {
        name: DOT_NAME,
        ext: DOT_EXT,
        attributes: ATTR_DIRECTORY,
        reserved: [0; 10],
        mtime: U16::ZERO,
        mdate: U16::ZERO,
        first_cluster: U16::ZERO,
        file_size: U32::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mounted_fresh;

    #[test]
    fn fresh_root_readdir_is_dot_and_dotdot_only() {
        let fs = mounted_fresh();
        let listing = fs.readdir(DirLocation::Root).unwrap();
        let names: Vec<_> = listing.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec![".", ".."]);
    }

    #[test]
    fn insert_then_find_round_trips() {
        let mut fs = mounted_fresh();
        fs.insert_dir_entry(DirLocation::Root, "hello.txt", 0x20, 5, 0)
            .unwrap();
        let found = fs.find_entry(DirLocation::Root, "hello.txt").unwrap();
        assert!(found.is_some());
        let entry = fs.entry_at(found.unwrap());
        assert_eq!(entry.display_name(), "hello.txt");
        assert_eq!(entry.first_cluster.get(), 5);
    }

    #[test]
    fn tombstone_frees_the_slot_for_reuse() {
        let mut fs = mounted_fresh();
        let slot = fs
            .insert_dir_entry(DirLocation::Root, "x", 0x20, 2, 0)
            .unwrap();
        fs.tombstone_slot(slot);
        assert!(fs.find_entry(DirLocation::Root, "x").unwrap().is_none());
        let reused = fs.find_free_slot(DirLocation::Root).unwrap();
        assert_eq!(reused.index, slot.index);
    }

    #[test]
    fn filling_root_directory_returns_enospc_on_next_insert() {
        let mut fs = mounted_fresh();
        let capacity = fs.entries_per_dir();
        for i in 0..capacity {
            let name = format!("f{i}");
            fs.insert_dir_entry(DirLocation::Root, &name, 0x20, 2, 0)
                .unwrap();
        }
        assert!(fs
            .insert_dir_entry(DirLocation::Root, "overflow", 0x20, 2, 0)
            .is_err());
    }
}
