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

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

/// First-byte marker meaning "this slot has never been occupied".
pub const NAME_FREE: u8 = 0x00;
/// First-byte marker meaning "this slot held a live entry that was removed".
pub const NAME_DELETED: u8 = 0xE5;

pub const DIR_ENTRY_SIZE: usize = 32;

/// 32-byte packed on-disk directory entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DirEntry {
    pub name: [u8; 8],
    pub ext: [u8; 3],
    pub attributes: u8,
    pub reserved: [u8; 10],
    pub mtime: U16,
    pub mdate: U16,
    pub first_cluster: U16,
    pub file_size: U32,
}

const _: () = assert!(size_of::<DirEntry>() == DIR_ENTRY_SIZE);

impl DirEntry {
    pub fn is_free_slot(&self) -> bool {
        matches!(self.name[0], NAME_FREE | NAME_DELETED)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes & ATTR_VOLUME != 0
    }

    pub fn tombstone(&mut self) {
        self.name[0] = NAME_DELETED;
    }

    pub fn zero(&mut self) {
        *self = DirEntry {
            name: [0; 8],
            ext: [0; 3],
            attributes: 0,
            reserved: [0; 10],
            mtime: U16::ZERO,
            mdate: U16::ZERO,
            first_cluster: U16::ZERO,
            file_size: U32::ZERO,
        };
    }

    /// Decode the stored 8.3 name back to a lowercase `name[.ext]` display form, as `readdir`
    /// shows it.
    pub fn display_name(&self) -> String {
        let stem = trim_trailing_spaces(&self.name);
        let ext = trim_trailing_spaces(&self.ext);
        let mut out = String::with_capacity(12);
        for &b in stem {
            out.push((b as char).to_ascii_lowercase());
        }
        if !ext.is_empty() {
            out.push('.');
            for &b in ext {
                out.push((b as char).to_ascii_lowercase());
            }
        }
        out
    }
}

fn trim_trailing_spaces(s: &[u8]) -> &[u8] {
    let end = s.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    &s[..end]
}

/// Encode a source filename into the FAT 8.3 `(name, ext)` pair: split at the last `.`, uppercase,
/// truncate to 8/3 chars, space-pad. ASCII only.
pub fn encode_8_3(input: &str) -> Option<([u8; 8], [u8; 3])> {
    if input == "." {
        return Some((DOT_NAME, DOT_EXT));
    }
    if input == ".." {
        return Some((DOTDOT_NAME, DOTDOT_EXT));
    }
    if input.is_empty() || !input.is_ascii() {
        return None;
    }
    let (stem, ext) = match input.rfind('.') {
        Some(pos) if pos > 0 => (&input[..pos], &input[pos + 1..]),
        _ => (input, ""),
    };
    if stem.is_empty() {
        return None;
    }

    let mut name = [b' '; 8];
    for (i, b) in stem.bytes().take(8).enumerate() {
        name[i] = b.to_ascii_uppercase();
    }
    let mut ext_bytes = [b' '; 3];
    for (i, b) in ext.bytes().take(3).enumerate() {
        ext_bytes[i] = b.to_ascii_uppercase();
    }
    Some((name, ext_bytes))
}

/// The literal on-disk `.` entry name/ext: `". "` / `"   "`.
pub const DOT_NAME: [u8; 8] = *b".       ";
pub const DOT_EXT: [u8; 3] = *b"   ";
/// The literal on-disk `..` entry name/ext: `".. "` / `"   "`.
pub const DOTDOT_NAME: [u8; 8] = *b"..      ";
pub const DOTDOT_EXT: [u8; 3] = *b"   ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_8_3_upcases_and_pads() {
        let (name, ext) = encode_8_3("hello.txt").unwrap();
        assert_eq!(&name, b"HELLO   ");
        assert_eq!(&ext, b"TXT");
    }

    #[test]
    fn encode_8_3_truncates_long_stem_and_extension() {
        let (name, ext) = encode_8_3("verylongname.jpeg").unwrap();
        assert_eq!(&name, b"VERYLONG");
        assert_eq!(&ext, b"JPE");
    }

    #[test]
    fn encode_8_3_handles_no_extension() {
        let (name, ext) = encode_8_3("README").unwrap();
        assert_eq!(&name, b"README  ");
        assert_eq!(&ext, b"   ");
    }

    #[test]
    fn encode_8_3_special_cases_dot_and_dotdot() {
        assert_eq!(encode_8_3(".").unwrap(), (DOT_NAME, DOT_EXT));
        assert_eq!(encode_8_3("..").unwrap(), (DOTDOT_NAME, DOTDOT_EXT));
    }

    #[test]
    fn encode_8_3_rejects_empty_and_non_ascii() {
        assert!(encode_8_3("").is_none());
        assert!(encode_8_3("café").is_none());
    }

    #[test]
    fn display_name_round_trips_through_encode() {
        let (name, ext) = encode_8_3("report.doc").unwrap();
        let mut entry = DirEntry {
            name,
            ext,
            attributes: 0,
            reserved: [0; 10],
            mtime: U16::ZERO,
            mdate: U16::ZERO,
            first_cluster: U16::ZERO,
            file_size: U32::ZERO,
        };
        assert_eq!(entry.display_name(), "report.doc");
        entry.tombstone();
        assert!(entry.is_free_slot());
    }
}
