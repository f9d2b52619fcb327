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
use zerocopy::little_endian::U32;

use crate::superblock::{FAT_EOF, FAT_FREE};
use crate::FatFileSystem;

/// What `stat`/`getattr` need from an entry, independent of its on-disk representation.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub is_dir: bool,
    pub size: u64,
}

impl<S: ImageStore> FatFileSystem<S> {
    pub fn stat(&self, path: &str) -> Result<Stat> {
        if path == "/" {
            return Ok(Stat {
                is_dir: true,
                size: 0,
            });
        }
        let (_, slot) = self.resolve(path)?;
        let entry = self.entry_at(slot);
        Ok(Stat {
            is_dir: entry.is_directory(),
            size: entry.file_size.get() as u64,
        })
    }

    /// Read up to `buf.len()` bytes of `path` starting at `offset`. Returns the number of bytes
    /// actually copied: 0 at or past end-of-file, less than requested if the chain ends early.
    pub fn read(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let (_, slot) = self.resolve(path)?;
        let entry = self.entry_at(slot);
        if entry.is_directory() {
            return Err(FsError::IsADirectory.into());
        }

        let file_size = entry.file_size.get() as u64;
        if offset >= file_size || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min((file_size - offset) as usize);

        let cluster_size = self.cluster_size as u64;
        let skip = (offset / cluster_size) as usize;
        let Some(mut cluster) = self.nth_cluster(entry.first_cluster.get(), skip)? else {
            return Ok(0);
        };

        let mut copied = 0usize;
        let mut intra = (offset % cluster_size) as usize;
        let mut steps = 0u32;
        loop {
            let range = self.cluster_range(cluster);
            let src = &self.store.as_bytes()[range];
            let chunk = (cluster_size as usize - intra).min(want - copied);
            buf[copied..copied + chunk].copy_from_slice(&src[intra..intra + chunk]);
            copied += chunk;
            intra = 0;
            if copied >= want {
                break;
            }
            steps += 1;
            if steps >= self.total_clusters {
                log::error!("read walk exceeded total_clusters; treating chain as corrupt");
                return Err(FsError::Corrupt.into());
            }
            match self.fat_entry(cluster)? {
                FAT_FREE | FAT_EOF => break,
                next => cluster = next,
            }
        }
        Ok(copied)
    }

    /// Write `buf` to `path` at `offset`, extending the cluster chain as needed. Returns the
    /// number of bytes actually copied, which is less than `buf.len()` if the allocator ran out
    /// of clusters partway through extension (§4.5/§7: the already-allocated clusters remain
    /// linked to the file, no rollback).
    pub fn write(&mut self, path: &str, offset: u64, buf: &[u8]) -> Result<usize> {
        let (_, slot) = self.resolve(path)?;
        let entry = self.entry_at(slot);
        if entry.is_directory() {
            return Err(FsError::IsADirectory.into());
        }

        let cluster_size = self.cluster_size as u64;
        let mut first_cluster = entry.first_cluster.get();
        let mut current_length = if first_cluster == FAT_EOF {
            0usize
        } else {
            self.chain_length(first_cluster)?
        };

        let total_extent = offset + buf.len() as u64;
        let required_clusters = if total_extent == 0 {
            0
        } else {
            ((total_extent + cluster_size - 1) / cluster_size) as usize
        };

        let mut tail = if current_length == 0 {
            None
        } else {
            self.nth_cluster(first_cluster, current_length - 1)?
        };

        while current_length < required_clusters {
            let grown = match tail {
                None => self.allocate(),
                Some(t) => self.extend(t),
            };
            match grown {
                Ok(c) => {
                    if tail.is_none() {
                        first_cluster = c;
                    }
                    tail = Some(c);
                    current_length += 1;
                }
                Err(_) => break,
            }
        }

        if first_cluster != entry.first_cluster.get() {
            self.entry_at_mut(slot).first_cluster =
                zerocopy::little_endian::U16::new(first_cluster);
        }

        let available = current_length as u64 * cluster_size;
        let writable = if offset >= available {
            0
        } else {
            ((available - offset).min(buf.len() as u64)) as usize
        };

        if writable > 0 {
            let skip = (offset / cluster_size) as usize;
            let mut cluster = self
                .nth_cluster(first_cluster, skip)?
                .expect("chain was just grown to cover offset");
            let mut intra = (offset % cluster_size) as usize;
            let mut written = 0usize;
            let mut steps = 0u32;
            loop {
                let range = self.cluster_range(cluster);
                let chunk = (cluster_size as usize - intra).min(writable - written);
                self.store.as_bytes_mut()[range][intra..intra + chunk]
                    .copy_from_slice(&buf[written..written + chunk]);
                written += chunk;
                intra = 0;
                if written >= writable {
                    break;
                }
                steps += 1;
                if steps >= self.total_clusters {
                    log::error!("write walk exceeded total_clusters; treating chain as corrupt");
                    return Err(FsError::Corrupt.into());
                }
                cluster = self.fat_entry(cluster)?;
            }
        }

        let new_size = (offset + writable as u64).max(entry.file_size.get() as u64);
        self.entry_at_mut(slot).file_size = U32::new(new_size as u32);

        Ok(writable)
    }

    /// Known limitation carried over from the source design (§9): only updates the recorded
    /// size, never frees clusters on shrink nor pre-allocates on grow.
    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let (_, slot) = self.resolve(path)?;
        let entry = self.entry_at(slot);
        if entry.is_directory() {
            return Err(FsError::IsADirectory.into());
        }
        self.entry_at_mut(slot).file_size = U32::new(size as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::mounted_fresh;
    use crate::DirLocation;

    #[test]
    fn write_then_read_round_trips_within_one_cluster() {
        let mut fs = mounted_fresh();
        fs.insert_dir_entry(DirLocation::Root, "hello.txt", 0x20, 0xFFFF, 0)
            .unwrap();
        let n = fs.write("/hello.txt", 0, b"hello").unwrap();
        assert_eq!(n, 5);
        let mut buf = [0u8; 5];
        let read = fs.read("/hello.txt", 0, &mut buf).unwrap();
        assert_eq!(read, 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(fs.stat("/hello.txt").unwrap().size, 5);
    }

    #[test]
    fn write_spanning_two_clusters_uses_two_clusters() {
        let mut fs = mounted_fresh();
        fs.insert_dir_entry(DirLocation::Root, "big.bin", 0x20, 0xFFFF, 0)
            .unwrap();
        let cluster_size = fs.cluster_size() as usize;
        let data = vec![0xABu8; cluster_size + 1];
        let n = fs.write("/big.bin", 0, &data).unwrap();
        assert_eq!(n, data.len());

        let mut buf = vec![0u8; data.len()];
        let read = fs.read("/big.bin", 0, &mut buf).unwrap();
        assert_eq!(read, data.len());
        assert_eq!(buf, data);

        let (_, slot) = fs.resolve("/big.bin").unwrap();
        let first_cluster = fs.entry_at(slot).first_cluster.get();
        assert_eq!(fs.chain_length(first_cluster).unwrap(), 2);
    }

    #[test]
    fn exact_cluster_size_write_uses_one_cluster() {
        let mut fs = mounted_fresh();
        fs.insert_dir_entry(DirLocation::Root, "exact.bin", 0x20, 0xFFFF, 0)
            .unwrap();
        let cluster_size = fs.cluster_size() as usize;
        let data = vec![0x11u8; cluster_size];
        fs.write("/exact.bin", 0, &data).unwrap();

        let (_, slot) = fs.resolve("/exact.bin").unwrap();
        let first_cluster = fs.entry_at(slot).first_cluster.get();
        assert_eq!(fs.chain_length(first_cluster).unwrap(), 1);
    }

    #[test]
    fn read_at_eof_returns_zero() {
        let mut fs = mounted_fresh();
        fs.insert_dir_entry(DirLocation::Root, "a", 0x20, 0xFFFF, 0)
            .unwrap();
        fs.write("/a", 0, b"abc").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(fs.read("/a", 3, &mut buf).unwrap(), 0);
    }
}
