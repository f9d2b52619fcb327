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

use std::mem::size_of;

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Header at offset 0 of the image, recording cluster size and the absolute offsets of the FAT,
/// root-directory and data regions. All fields little-endian `u32`.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Superblock {
    pub total_clusters: U32,
    pub fat_offset: U32,
    pub root_dir_offset: U32,
    pub data_offset: U32,
    pub cluster_size: U32,
}

pub const SUPERBLOCK_SIZE: usize = size_of::<Superblock>();

/// Reserved cluster numbers; data clusters start at 2.
pub const FIRST_DATA_CLUSTER: u16 = 2;
/// FAT[0] media-descriptor sentinel.
pub const FAT_RESERVED_0: u16 = 0xFFF8;
/// End-of-chain marker, also FAT[1]'s reserved value.
pub const FAT_EOF: u16 = 0xFFFF;
/// A cluster not yet allocated to any chain.
pub const FAT_FREE: u16 = 0x0000;
