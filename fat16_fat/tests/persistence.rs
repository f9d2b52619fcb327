use std::io::{Read, Write};

use fat16_fat::{FatFileSystem, DISK_SIZE};
use tempfile::NamedTempFile;

/// Round-trips a formatted image through a real file on disk (not just an in-memory `Vec<u8>`),
/// the way a freshly-created driver image would survive an unmount/remount cycle.
#[test]
fn image_survives_a_round_trip_through_a_real_file() {
    let mut tmp = NamedTempFile::new().expect("create temp file");

    {
        let store = vec![0u8; DISK_SIZE as usize];
        let mut fs = FatFileSystem::mount(store, true).expect("fresh mount");
        fs.mkdir("/docs").unwrap();
        fs.create("/docs/readme.txt").unwrap();
        fs.write("/docs/readme.txt", 0, b"persisted").unwrap();
        let bytes = fs.into_store();
        tmp.write_all(&bytes).expect("write image to disk");
    }

    let mut reloaded = Vec::new();
    std::fs::File::open(tmp.path())
        .unwrap()
        .read_to_end(&mut reloaded)
        .unwrap();

    let fs = FatFileSystem::mount(reloaded, false).expect("remount from persisted bytes");
    let mut buf = [0u8; 9];
    assert_eq!(fs.read("/docs/readme.txt", 0, &mut buf).unwrap(), 9);
    assert_eq!(&buf, b"persisted");
    assert!(fs.stat("/docs").unwrap().is_dir);
}
