//! Storage medium, clipboard format and data object tests against the
//! Windows OLE runtime.
//!
//! The clipboard test only reads; it never replaces what is on the
//! clipboard.
//!
//! Run with: cargo test --test dataobj_test -- --nocapture

#![cfg(windows)]

use comscope::clipformat::{ClipboardFormat, FormatEtc, MediumType};
use comscope::config::ComApartment;
use comscope::dataobj::{DataDirection, DataObject, StorageMedium};
use comscope::globalmem::GlobalMemory;
use comscope::stream::{ComStream, SeekOrigin};

#[test]
fn test_global_medium_bytes() {
    println!("\n=== Test: HGLOBAL Medium ===");

    let memory = GlobalMemory::from_bytes(b"medium payload").value().unwrap();
    let medium = StorageMedium::from_global(memory);
    assert_eq!(medium.media(), MediumType::HGLOBAL);
    assert!(medium.global_handle().is_some());
    assert!(medium.stream().is_none());
    assert!(medium.file_name().is_none());

    let bytes = medium.bytes().unwrap();
    assert_eq!(&bytes[..14], b"medium payload");
    println!("  [OK] {} bytes under lock", bytes.len());
}

#[test]
fn test_stream_medium_bytes() {
    let _apartment = ComApartment::single_threaded().unwrap();

    let stream = ComStream::create_on_memory(Some(b"streamed")).unwrap();
    stream.seek(3, SeekOrigin::Start).unwrap();
    let medium = StorageMedium::from_stream(&stream);
    assert_eq!(medium.media(), MediumType::ISTREAM);
    assert!(medium.global_handle().is_none());

    assert_eq!(medium.bytes().unwrap(), b"streamed");
    assert_eq!(stream.position().unwrap(), 3, "reading the medium keeps the position");

    drop(medium);
    assert_eq!(stream.read_all().unwrap(), b"streamed", "the medium held its own reference");
}

#[test]
fn test_registered_format_names() {
    println!("\n=== Test: Registered Clipboard Format ===");

    let name = format!("comscope.test.{}", std::process::id());
    let format = ClipboardFormat::register(&name).unwrap();
    assert!(format.is_registered());
    assert_eq!(ClipboardFormat::register(&name).unwrap(), format, "registering twice returns the same id");
    assert_eq!(format.name().unwrap(), name);
    assert_eq!(format.describe(), name);
    println!("  [OK] {name} is {}", format.0);

    assert!(ClipboardFormat::TEXT.name().is_err(), "predefined formats have no registered name");
    assert_eq!(ClipboardFormat::TEXT.describe(), "CF_TEXT");
}

#[test]
fn test_clipboard_snapshot_enumerates() {
    println!("\n=== Test: Clipboard Snapshot ===");
    let _apartment = ComApartment::ole().unwrap();

    let clipboard = DataObject::clipboard().unwrap();
    let formats = clipboard.formats(DataDirection::Get).unwrap();
    for format in &formats {
        assert!(!format.media.is_null(), "{} offered without media", format.format);
    }
    println!("  [OK] {} formats on the clipboard", formats.len());

    let unused = ClipboardFormat::register(&format!("comscope.unused.{}", std::process::id())).unwrap();
    let offered = clipboard.query_get_data_hr(&FormatEtc::simple(unused));
    assert!(!offered.value_or_none().unwrap_or(false), "nobody renders a fresh format");
    assert!(clipboard.get_data(&FormatEtc::simple(unused)).is_err());
}
