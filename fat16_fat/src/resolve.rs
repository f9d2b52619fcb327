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

use crate::dir::EntrySlot;
use crate::FatFileSystem;

/// A directory location, tagged rather than expressed as a magic cluster integer: the root
/// directory lives in its own region outside the data area and is not itself a FAT cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirLocation {
    Root,
    Cluster(u16),
}

impl DirLocation {
    /// The value stored in a `..` entry's `first_cluster` field: 0 for "parent is root".
    pub(crate) fn as_parent_cluster_value(self) -> u16 {
        match self {
            DirLocation::Root => 0,
            DirLocation::Cluster(c) => c,
        }
    }

    /// Inverse of [`DirLocation::as_parent_cluster_value`]: a stored `first_cluster` of 0 means
    /// root, per §4.4.
    pub(crate) fn from_cluster_value(value: u16) -> DirLocation {
        if value == 0 {
            DirLocation::Root
        } else {
            DirLocation::Cluster(value)
        }
    }
}

impl<S: ImageStore> FatFileSystem<S> {
    fn dir_from_cluster(&self, value: u16) -> DirLocation {
        DirLocation::from_cluster_value(value)
    }

    /// Resolve an absolute path to `(parent directory, target entry slot)`.
    ///
    /// `/` is not resolvable this way (it has no parent and no entry of its own) — callers that
    /// need the root directory itself should special-case it before calling `resolve`.
    pub(crate) fn resolve(&self, path: &str) -> Result<(DirLocation, EntrySlot)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(FsError::InvalidArgument.into());
        }

        let mut current = DirLocation::Root;
        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            let found = self.find_entry(current, segment)?;
            if i == last {
                return match found {
                    Some(slot) => Ok((current, slot)),
                    None => Err(FsError::NotFound.into()),
                };
            }
            match found {
                None => return Err(FsError::NotFound.into()),
                Some(slot) => {
                    let entry = self.entry_at(slot);
                    if !entry.is_directory() {
                        return Err(FsError::NotADirectory.into());
                    }
                    current = self.dir_from_cluster(entry.first_cluster.get());
                }
            }
        }
        unreachable!("segments is non-empty, loop always returns")
    }

    /// Resolve the parent directory of `path` and split off the basename, without requiring the
    /// basename to already exist. Used by `create`/`mkdir`, which must not rely on a partial
    /// resolution of the (possibly nonexistent) target — see §9.
    pub(crate) fn resolve_parent_and_basename<'p>(
        &self,
        path: &'p str,
    ) -> Result<(DirLocation, &'p str)> {
        let trimmed = path.trim_end_matches('/');
        let (parent_path, basename) = match trimmed.rfind('/') {
            Some(pos) => (&trimmed[..=pos], &trimmed[pos + 1..]),
            None => ("/", trimmed),
        };
        if basename.is_empty() {
            return Err(FsError::InvalidArgument.into());
        }

        let parent = if parent_path == "/" {
            DirLocation::Root
        } else {
            let (_, slot) = self.resolve(parent_path.trim_end_matches('/'))?;
            let entry = self.entry_at(slot);
            if !entry.is_directory() {
                return Err(FsError::NotADirectory.into());
            }
            self.dir_from_cluster(entry.first_cluster.get())
        };
        Ok((parent, basename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mounted_fresh;

    #[test]
    fn resolve_root_child_not_found() {
        let fs = mounted_fresh();
        assert!(fs.resolve("/nope").is_err());
    }

    #[test]
    fn resolve_parent_and_basename_rejects_missing_parent() {
        let fs = mounted_fresh();
        // Neither "/a" nor "/a/b" have been created, so the parent can't be resolved.
        assert!(fs.resolve_parent_and_basename("/a/b/c.txt").is_err());
    }

    #[test]
    fn resolve_parent_and_basename_root_level() {
        let fs = mounted_fresh();
        let (parent, base) = fs.resolve_parent_and_basename("/x").unwrap();
        assert_eq!(parent, DirLocation::Root);
        assert_eq!(base, "x");
    }
}
