//! Stream tests against the Windows COM runtime.
//!
//! Memory streams need no fixtures; the file stream test writes into the
//! system temp directory and removes its file afterwards.
//!
//! Run with: cargo test --test stream_test -- --nocapture

#![cfg(windows)]

use std::path::PathBuf;

use comscope::com::status::S_FALSE;
use comscope::config::ComApartment;
use comscope::stream::{CommitFlags, ComStream, SeekOrigin, StorageMode};

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("comscope-{}-{name}", std::process::id()))
}

#[test]
fn test_memory_stream_read_write() {
    println!("\n=== Test: Memory Stream ===");
    let _apartment = ComApartment::single_threaded().unwrap();

    let stream = ComStream::create_on_memory(Some(b"seed")).unwrap();
    assert_eq!(stream.position().unwrap(), 0);
    assert_eq!(stream.size().unwrap(), 4);

    stream.seek(0, SeekOrigin::End).unwrap();
    assert_eq!(stream.write(b" data").unwrap(), 5);
    assert_eq!(stream.position().unwrap(), 9);
    println!("  [OK] wrote past the seed");

    stream.set_position(0).unwrap();
    let mut buf = [0u8; 16];
    let read = stream.read_hr(&mut buf);
    assert_eq!(read.hr(), S_FALSE, "short read should report S_FALSE");
    let read = read.value().unwrap();
    assert_eq!(&buf[..read], b"seed data");
    println!("  [OK] read back {} bytes", read);
}

#[test]
fn test_read_all_restores_position() {
    let _apartment = ComApartment::single_threaded().unwrap();

    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let stream = ComStream::create_on_memory(Some(&payload)).unwrap();
    stream.set_position(1234).unwrap();

    let all = stream.read_all().unwrap();
    assert_eq!(all, payload, "read_all should span several buffers");
    assert_eq!(stream.position().unwrap(), 1234);
}

#[test]
fn test_size_clone_and_copy() {
    let _apartment = ComApartment::single_threaded().unwrap();

    let source = ComStream::create_on_memory(Some(b"0123456789")).unwrap();
    source.set_size(6).unwrap();
    assert_eq!(source.size().unwrap(), 6);

    let clone = source.try_clone().unwrap();
    clone.seek(2, SeekOrigin::Current).unwrap();
    assert_eq!(clone.position().unwrap(), 2);
    assert_eq!(source.position().unwrap(), 0, "clones keep their own position");

    let dest = ComStream::create_on_memory(None).unwrap();
    let (read, written) = clone.copy_to(&dest, 100).unwrap();
    assert_eq!((read, written), (4, 4));
    assert_eq!(dest.read_all().unwrap(), b"2345");
}

#[test]
fn test_stat_names_file_stream() {
    println!("\n=== Test: File Stream ===");
    let _apartment = ComApartment::single_threaded().unwrap();
    let path = temp_file("stat.bin");

    {
        let stream = ComStream::create_on_file(&path, StorageMode::WRITE | StorageMode::CREATE, true).unwrap();
        stream.write(b"persisted").unwrap();
        stream.commit(CommitFlags::DEFAULT).unwrap();
    }

    let stream = ComStream::open_file(&path).unwrap();
    let stat = stream.stat(true).unwrap();
    assert_eq!(stat.size, 9);
    assert_eq!(stat.kind, 2);
    let name = stat.name.clone().unwrap_or_default();
    assert!(name.ends_with("stat.bin"), "unexpected stat name {name:?}");
    println!("  [OK] stat name {name}");

    let nameless = stream.stat(false).unwrap();
    assert!(nameless.name.is_none());
    assert_eq!(stream.read_all().unwrap(), b"persisted");

    let json = serde_json::to_value(&stat).unwrap();
    assert_eq!(json["size"], 9);

    drop(stream);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_open_missing_file_fails() {
    let _apartment = ComApartment::single_threaded().unwrap();
    let result = ComStream::open_file_hr(&temp_file("missing.bin"));
    assert!(!result.success());
    assert!(ComStream::open_file(&temp_file("missing.bin")).is_err());
}
