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

use crate::dirent::{ATTR_ARCHIVE, ATTR_DIRECTORY};
use crate::resolve::DirLocation;
use crate::FatFileSystem;

impl<S: ImageStore> FatFileSystem<S> {
    fn zero_cluster(&mut self, cluster: u16) {
        let range = self.cluster_range(cluster);
        self.store.as_bytes_mut()[range].fill(0);
    }

    pub fn create(&mut self, path: &str) -> Result<()> {
        let (parent, basename) = self.resolve_parent_and_basename(path)?;
        if self.find_entry(parent, basename)?.is_some() {
            return Err(FsError::AlreadyExists.into());
        }
        self.insert_dir_entry(
            parent,
            basename,
            ATTR_ARCHIVE,
            crate::superblock::FAT_EOF,
            0,
        )?;
        Ok(())
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (_, slot) = self.resolve(path)?;
        let entry = self.entry_at(slot);
        if entry.is_directory() {
            return Err(FsError::IsADirectory.into());
        }
        let first_cluster = entry.first_cluster.get();
        if first_cluster != crate::superblock::FAT_EOF {
            self.free_chain(first_cluster)?;
        }
        self.tombstone_slot(slot);
        Ok(())
    }

    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let (parent, basename) = self.resolve_parent_and_basename(path)?;
        if self.find_entry(parent, basename)?.is_some() {
            return Err(FsError::AlreadyExists.into());
        }

        let new_cluster = self.allocate()?;
        if let Err(e) = self.insert_dir_entry(parent, basename, ATTR_DIRECTORY, new_cluster, 0) {
            // Roll back the allocation: no directory entry ended up referencing it.
            let _ = self.free_chain(new_cluster);
            return Err(e);
        }

        self.zero_cluster(new_cluster);
        let loc = DirLocation::Cluster(new_cluster);
        self.insert_dir_entry(loc, ".", ATTR_DIRECTORY, new_cluster, 0)?;
        self.insert_dir_entry(
            loc,
            "..",
            ATTR_DIRECTORY,
            parent.as_parent_cluster_value(),
            0,
        )?;
        Ok(())
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if path == "/" {
            return Err(FsError::Busy.into());
        }
        let (_, slot) = self.resolve(path)?;
        let entry = self.entry_at(slot);
        if !entry.is_directory() {
            return Err(FsError::NotADirectory.into());
        }
        let cluster = entry.first_cluster.get();
        let loc = DirLocation::Cluster(cluster);
        if !self.live_entries(loc).is_empty() {
            return Err(FsError::NotEmpty.into());
        }

        self.free_chain(cluster)?;
        self.tombstone_slot(slot);
        Ok(())
    }

    /// `readdir` by path, resolving `/` to the root directory itself.
    pub fn readdir_path(&self, path: &str) -> Result<Vec<(String, crate::DirEntry)>> {
        let loc = if path == "/" {
            DirLocation::Root
        } else {
            let (_, slot) = self.resolve(path)?;
            let entry = self.entry_at(slot);
            if !entry.is_directory() {
                return Err(FsError::NotADirectory.into());
            }
            DirLocation::Cluster(entry.first_cluster.get())
        };
        self.readdir(loc)
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::mounted_fresh;

    #[test]
    fn mkdir_creates_dot_and_dotdot() {
        let mut fs = mounted_fresh();
        fs.mkdir("/a").unwrap();
        let listing = fs.readdir_path("/a").unwrap();
        let names: Vec<_> = listing.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec![".", ".."]);
    }

    #[test]
    fn create_write_read_nested_file() {
        let mut fs = mounted_fresh();
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();
        fs.create("/a/b/c.txt").unwrap();
        fs.write("/a/b/c.txt", 0, b"hello").unwrap();
        let mut buf = [0u8; 5];
        fs.read("/a/b/c.txt", 0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(fs.stat("/a/b/c.txt").unwrap().size, 5);
    }

    #[test]
    fn create_then_unlink_then_recreate_reuses_lowest_slot_and_cluster() {
        let mut fs = mounted_fresh();
        fs.create("/x").unwrap();
        let (_, slot1) = fs.resolve("/x").unwrap();
        fs.unlink("/x").unwrap();
        fs.create("/x").unwrap();
        let (_, slot2) = fs.resolve("/x").unwrap();
        assert_eq!(slot1.index, slot2.index);
    }

    #[test]
    fn mkdir_nonempty_rmdir_fails_then_succeeds_after_unlink() {
        let mut fs = mounted_fresh();
        fs.mkdir("/d").unwrap();
        fs.create("/d/f").unwrap();
        assert!(fs.rmdir("/d").is_err());
        fs.unlink("/d/f").unwrap();
        fs.rmdir("/d").unwrap();
        assert!(fs.resolve("/d").is_err());
    }

    #[test]
    fn rmdir_root_is_busy() {
        let mut fs = mounted_fresh();
        assert!(fs.rmdir("/").is_err());
    }

    #[test]
    fn mkdir_root_path_is_invalid() {
        let mut fs = mounted_fresh();
        assert!(fs.mkdir("/").is_err());
    }
}
