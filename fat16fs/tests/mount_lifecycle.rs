use fat16_fat::{FatFileSystem, DISK_SIZE};
use fat16_store_mmap::MmapStore;

/// Exercises the real memory-mapped store end to end: format on first open, write through the
/// mapping, close (flush + unmap), then reopen the same path and confirm the data is still
/// there — the scenario `fat16fs`'s `main.rs` drives on every mount/unmount.
#[test]
fn mmap_backed_image_persists_across_close_and_reopen() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let image_path = dir.path().join("disk.img");

    {
        let (store, fresh) = MmapStore::open(&image_path, DISK_SIZE).expect("create image");
        assert!(fresh, "image did not exist yet, so open() must report fresh");
        let mut fs = FatFileSystem::mount(store, true).expect("format fresh image");

        fs.mkdir("/a").unwrap();
        fs.create("/a/note.txt").unwrap();
        fs.write("/a/note.txt", 0, b"hello from disk").unwrap();
        fs.flush().unwrap();

        fs.into_store().close();
    }

    {
        let (store, fresh) = MmapStore::open(&image_path, DISK_SIZE).expect("reopen image");
        assert!(!fresh, "image already existed on disk");
        let fs = FatFileSystem::mount(store, false).expect("remount existing image");

        let mut buf = [0u8; 16];
        let n = fs.read("/a/note.txt", 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello from disk");
        assert!(fs.stat("/a").unwrap().is_dir);
    }
}

/// A corrupt (all-zero, never-formatted) image must be reported as corrupt rather than
/// misread — `data_offset` computed from a zeroed superblock would fit inside the file by
/// coincidence, so the explicit layout check in `FatFileSystem::mount` is what catches this.
#[test]
fn mounting_an_unformatted_image_without_fresh_fails() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let image_path = dir.path().join("blank.img");
    std::fs::write(&image_path, vec![0u8; DISK_SIZE as usize]).unwrap();

    let (store, fresh) = MmapStore::open(&image_path, DISK_SIZE).expect("open existing blank image");
    assert!(!fresh);
    assert!(FatFileSystem::mount(store, false).is_err());
}
