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

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fuser::FUSE_ROOT_ID;

/// FUSE addresses files by inode number; the core engine addresses them by path. This table is
/// the (tiny, in-memory) bijection between the two, populated lazily as paths are looked up —
/// the on-disk format itself has no inode concept to borrow one from.
pub struct Inodes {
    paths: HashMap<u64, PathBuf>,
    ids: HashMap<PathBuf, u64>,
    next: u64,
}

impl Default for Inodes {
    fn default() -> Self {
        let mut paths = HashMap::new();
        let mut ids = HashMap::new();
        paths.insert(FUSE_ROOT_ID, PathBuf::from("/"));
        ids.insert(PathBuf::from("/"), FUSE_ROOT_ID);
        Self {
            paths,
            ids,
            next: FUSE_ROOT_ID + 1,
        }
    }
}

impl Inodes {
    pub fn path_of(&self, ino: u64) -> Option<&Path> {
        self.paths.get(&ino).map(PathBuf::as_path)
    }

    /// Look up (or mint) the inode for `path`, remembering the mapping for later `read`/`write`/
    /// `getattr` calls that only carry the inode.
    pub fn ino_for(&mut self, path: &Path) -> u64 {
        if let Some(&ino) = self.ids.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.to_path_buf());
        self.ids.insert(path.to_path_buf(), ino);
        ino
    }

    /// Drop the mapping for a removed path so a later `create`/`mkdir` of the same name mints a
    /// fresh inode rather than resurrecting stale attributes.
    pub fn forget_path(&mut self, path: &Path) {
        if let Some(ino) = self.ids.remove(path) {
            self.paths.remove(&ino);
        }
    }
}

pub fn child_path(parent: &Path, name: &std::ffi::OsStr) -> PathBuf {
    if parent == Path::new("/") {
        Path::new("/").join(name)
    } else {
        parent.join(name)
    }
}
