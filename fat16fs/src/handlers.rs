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

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use fat16_fat::{DirEntry, FatFileSystem};
use fat16_store_mmap::MmapStore;
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyWrite, Request,
};

use crate::inodes::{child_path, Inodes};

const TTL: Duration = Duration::from_secs(1);

/// `fuser::Filesystem` adapter: translates ino-based upcalls to the path-based core engine and
/// errors to negative-POSIX-errno replies. Every handler runs under `fs`'s lock, the one coarse
/// exclusive section called for by the concurrency model (§5) — `fuser` may itself dispatch from
/// a worker thread, but filesystem state is never touched from two handlers at once.
pub struct Fat16Fuse {
    fs: Mutex<Option<FatFileSystem<MmapStore>>>,
    inodes: Mutex<Inodes>,
}

impl Fat16Fuse {
    pub fn new(fs: FatFileSystem<MmapStore>) -> Self {
        Self {
            fs: Mutex::new(Some(fs)),
            inodes: Mutex::new(Inodes::default()),
        }
    }

    fn attr_for(&self, ino: u64, is_dir: bool, size: u64, req: &Request) -> FileAttr {
        let now = SystemTime::now();
        let kind = if is_dir {
            FileType::Directory
        } else {
            FileType::RegularFile
        };
        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind,
            perm: if is_dir { 0o755 } else { 0o644 },
            nlink: if is_dir { 2 } else { 1 },
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

impl Filesystem for Fat16Fuse {
    fn destroy(&mut self) {
        if let Some(fs) = self.fs.lock().unwrap().take() {
            fs.into_store().close();
        }
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let mut inodes = self.inodes.lock().unwrap();
        let Some(parent_path) = inodes.path_of(parent).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = child_path(&parent_path, name);
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let guard = self.fs.lock().unwrap();
        let fs = guard.as_ref().expect("filesystem mounted");
        match fs.stat(path_str) {
            Ok(stat) => {
                let ino = inodes.ino_for(&path);
                reply.entry(&TTL, &self.attr_for(ino, stat.is_dir, stat.size, req), 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let inodes = self.inodes.lock().unwrap();
        let Some(path) = inodes.path_of(ino).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let guard = self.fs.lock().unwrap();
        let fs = guard.as_ref().expect("filesystem mounted");
        match fs.stat(path.to_str().unwrap_or("/")) {
            Ok(stat) => reply.attr(&TTL, &self.attr_for(ino, stat.is_dir, stat.size, req)),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let inodes = self.inodes.lock().unwrap();
        let Some(path) = inodes.path_of(ino).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path_str = path.to_str().unwrap_or("/");

        let mut guard = self.fs.lock().unwrap();
        let fs = guard.as_mut().expect("filesystem mounted");

        // `truncate`: update the recorded size. `utimens` with no size change is a no-op beyond
        // resolving the path (§4.7) — the existence check below (`stat`) gives ENOENT for free.
        if let Some(sz) = size {
            if let Err(e) = fs.truncate(path_str, sz) {
                reply.error(e.to_errno());
                return;
            }
        }

        match fs.stat(path_str) {
            Ok(stat) => reply.attr(&TTL, &self.attr_for(ino, stat.is_dir, stat.size, req)),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let mut inodes = self.inodes.lock().unwrap();
        let Some(parent_path) = inodes.path_of(parent).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = child_path(&parent_path, name);
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let mut guard = self.fs.lock().unwrap();
        let fs = guard.as_mut().expect("filesystem mounted");
        if let Err(e) = fs.mkdir(path_str) {
            reply.error(e.to_errno());
            return;
        }
        let ino = inodes.ino_for(&path);
        reply.entry(&TTL, &self.attr_for(ino, true, 0, req), 0);
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut inodes = self.inodes.lock().unwrap();
        let Some(parent_path) = inodes.path_of(parent).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = child_path(&parent_path, name);
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let mut guard = self.fs.lock().unwrap();
        let fs = guard.as_mut().expect("filesystem mounted");
        match fs.rmdir(path_str) {
            Ok(()) => {
                inodes.forget_path(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut inodes = self.inodes.lock().unwrap();
        let Some(parent_path) = inodes.path_of(parent).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = child_path(&parent_path, name);
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let mut guard = self.fs.lock().unwrap();
        let fs = guard.as_mut().expect("filesystem mounted");
        match fs.unlink(path_str) {
            Ok(()) => {
                inodes.forget_path(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let mut inodes = self.inodes.lock().unwrap();
        let Some(parent_path) = inodes.path_of(parent).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = child_path(&parent_path, name);
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let mut guard = self.fs.lock().unwrap();
        let fs = guard.as_mut().expect("filesystem mounted");
        if let Err(e) = fs.create(path_str) {
            reply.error(e.to_errno());
            return;
        }
        let ino = inodes.ino_for(&path);
        reply.created(&TTL, &self.attr_for(ino, false, 0, req), 0, 0, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let inodes = self.inodes.lock().unwrap();
        let Some(path) = inodes.path_of(ino).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let guard = self.fs.lock().unwrap();
        let fs = guard.as_ref().expect("filesystem mounted");
        let mut buf = vec![0u8; size as usize];
        match fs.read(path_str, offset.max(0) as u64, &mut buf) {
            Ok(n) => reply.data(&buf[..n]),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let inodes = self.inodes.lock().unwrap();
        let Some(path) = inodes.path_of(ino).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let mut guard = self.fs.lock().unwrap();
        let fs = guard.as_mut().expect("filesystem mounted");
        match fs.write(path_str, offset.max(0) as u64, data) {
            Ok(n) => reply.written(n as u32),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let mut inodes = self.inodes.lock().unwrap();
        let Some(path) = inodes.path_of(ino).map(Path::to_path_buf) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path_str) = path.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let guard = self.fs.lock().unwrap();
        let fs = guard.as_ref().expect("filesystem mounted");
        let listing: Vec<(String, DirEntry)> = match fs.readdir_path(path_str) {
            Ok(l) => l,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        drop(guard);

        let parent_path = path.parent().unwrap_or(Path::new("/")).to_path_buf();
        for (i, (name, entry)) in listing.into_iter().enumerate().skip(offset as usize) {
            let child_ino = match name.as_str() {
                "." => ino,
                ".." => inodes.ino_for(&parent_path),
                _ => inodes.ino_for(&child_path(&path, OsStr::new(&name))),
            };
            let kind = if entry.is_directory() {
                FileType::Directory
            } else {
                FileType::RegularFile
            };
            if reply.add(child_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }
}
