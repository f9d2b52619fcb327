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
use log::error;

use crate::superblock::{FAT_EOF, FAT_FREE, FIRST_DATA_CLUSTER};
use crate::FatFileSystem;

impl<S: ImageStore> FatFileSystem<S> {
    fn fat_entry_range(&self, cluster: u16) -> std::ops::Range<usize> {
        let off = self.fat_offset as usize + cluster as usize * 2;
        off..off + 2
    }

    pub(crate) fn fat_entry(&self, cluster: u16) -> Result<u16> {
        if cluster as u32 >= self.total_clusters {
            return Err(FsError::Corrupt.into());
        }
        let range = self.fat_entry_range(cluster);
        let bytes = &self.store.as_bytes()[range];
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn set_fat_entry(&mut self, cluster: u16, value: u16) -> Result<()> {
        if cluster as u32 >= self.total_clusters {
            return Err(FsError::Corrupt.into());
        }
        let range = self.fat_entry_range(cluster);
        self.store.as_bytes_mut()[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Linear scan from cluster 2 for the first FREE slot; marks it EOF and returns it.
    pub(crate) fn allocate(&mut self) -> Result<u16> {
        for cluster in FIRST_DATA_CLUSTER..self.total_clusters as u16 {
            if self.fat_entry(cluster)? == FAT_FREE {
                self.set_fat_entry(cluster, FAT_EOF)?;
                return Ok(cluster);
            }
        }
        Err(FsError::NoSpace.into())
    }

    /// Allocate a new cluster and link it onto the end of `tail`'s chain.
    pub(crate) fn extend(&mut self, tail: u16) -> Result<u16> {
        let new = self.allocate()?;
        self.set_fat_entry(tail, new)?;
        Ok(new)
    }

    /// Walk the chain starting at `head`, freeing every cluster. Bounded by `total_clusters` to
    /// defend against a cyclic (corrupt) chain.
    pub(crate) fn free_chain(&mut self, head: u16) -> Result<()> {
        let mut cluster = head;
        let mut steps = 0u32;
        while is_chain_cluster(cluster) {
            if steps >= self.total_clusters {
                error!("cluster chain exceeded total_clusters while freeing; treating as corrupt");
                return Err(FsError::Corrupt.into());
            }
            let next = self.fat_entry(cluster)?;
            self.set_fat_entry(cluster, FAT_FREE)?;
            cluster = next;
            steps += 1;
        }
        Ok(())
    }

    /// Number of clusters in the chain starting at `head`, bounded the same way as
    /// [`FatFileSystem::free_chain`].
    pub(crate) fn chain_length(&self, head: u16) -> Result<usize> {
        let mut cluster = head;
        let mut len = 0usize;
        while is_chain_cluster(cluster) {
            if len as u32 >= self.total_clusters {
                error!("cluster chain exceeded total_clusters while walking; treating as corrupt");
                return Err(FsError::Corrupt.into());
            }
            cluster = self.fat_entry(cluster)?;
            len += 1;
        }
        Ok(len)
    }

    /// The `n`-th cluster (0-based) in the chain starting at `head`, or `None` if the chain ends
    /// first.
    pub(crate) fn nth_cluster(&self, head: u16, n: usize) -> Result<Option<u16>> {
        let mut cluster = head;
        for _ in 0..n {
            if !is_chain_cluster(cluster) {
                return Ok(None);
            }
            cluster = self.fat_entry(cluster)?;
        }
        Ok(if is_chain_cluster(cluster) {
            Some(cluster)
        } else {
            None
        })
    }
}

fn is_chain_cluster(value: u16) -> bool {
    value != FAT_FREE && value != FAT_EOF
}

#[cfg(test)]
mod tests {
    use crate::tests::mounted_fresh;

    #[test]
    fn allocate_then_free_restores_fat_exactly() {
        let mut fs = mounted_fresh();
        let before = fs.fat_entry(2).unwrap();
        let c = fs.allocate().unwrap();
        assert_eq!(c, 2);
        assert_ne!(fs.fat_entry(2).unwrap(), before);
        fs.free_chain(c).unwrap();
        assert_eq!(fs.fat_entry(2).unwrap(), before);
    }

    #[test]
    fn allocation_is_lowest_index_first() {
        let mut fs = mounted_fresh();
        let a = fs.allocate().unwrap();
        let b = fs.allocate().unwrap();
        assert_eq!(a, 2);
        assert_eq!(b, 3);
    }

    #[test]
    fn extend_links_tail_to_new_cluster() {
        let mut fs = mounted_fresh();
        let head = fs.allocate().unwrap();
        let next = fs.extend(head).unwrap();
        assert_eq!(fs.fat_entry(head).unwrap(), next);
        assert_eq!(fs.chain_length(head).unwrap(), 2);
    }

    #[test]
    fn exhausting_all_clusters_returns_enospc() {
        let mut fs = mounted_fresh();
        let total = fs.total_clusters();
        for _ in 2..total {
            fs.allocate().unwrap();
        }
        assert!(fs.allocate().is_err());
    }
}
