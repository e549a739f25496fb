//! Value container tests against the Windows COM runtime: PROPVARIANT,
//! VARIANT, SAFEARRAY, global memory and task memory.
//!
//! Run with: cargo test --test value_test -- --nocapture

#![cfg(windows)]

use comscope::com::status::{DISP_E_TYPEMISMATCH, E_INVALIDARG};
use comscope::config::ComApartment;
use comscope::filetime::FileTime;
use comscope::globalmem::{GlobalFlags, GlobalMemory, GlobalMemoryLock};
use comscope::mem::TaskMem;
use comscope::propvariant::PropVariant;
use comscope::safearray::SafeArray;
use comscope::variant::Variant;
use comscope::vartype::VarType;
use comscope::Guid;

#[test]
fn test_propvariant_round_trip() {
    println!("\n=== Test: PropVariant Round Trip ===");

    assert_eq!(PropVariant::from_i8(-8).get_i8().unwrap(), -8);
    assert_eq!(PropVariant::from_u8(200).get_u8().unwrap(), 200);
    assert_eq!(PropVariant::from_i16(-1600).get_i16().unwrap(), -1600);
    assert_eq!(PropVariant::from_u16(60000).get_u16().unwrap(), 60000);
    assert_eq!(PropVariant::from_i32(i32::MIN).get_i32().unwrap(), i32::MIN);
    assert_eq!(PropVariant::from_u32(u32::MAX).get_u32().unwrap(), u32::MAX);
    assert_eq!(PropVariant::from_i64(-1 << 40).get_i64().unwrap(), -1 << 40);
    assert_eq!(PropVariant::from_u64(1 << 63).get_u64().unwrap(), 1 << 63);
    assert_eq!(PropVariant::from_f32(1.5).get_f32().unwrap(), 1.5);
    assert_eq!(PropVariant::from_f64(-2.25).get_f64().unwrap(), -2.25);
    assert!(PropVariant::from_bool(true).get_bool().unwrap());
    assert!(!PropVariant::from_bool(false).get_bool().unwrap());
    println!("  [OK] scalars");

    let text = PropVariant::from_wide_str("zürich ✓").unwrap();
    assert_eq!(text.var_type(), VarType::VT_LPWSTR);
    assert_eq!(text.get_wide_str().unwrap(), "zürich ✓");

    let time = FileTime::from_parts(0x1234_5678, 0x01d9_0000);
    assert_eq!(PropVariant::from_filetime(time).get_filetime().unwrap(), time);

    let clsid: Guid = "{0002E005-0000-0000-C000-000000000046}".parse().unwrap();
    assert_eq!(PropVariant::from_clsid(clsid).unwrap().get_clsid().unwrap(), clsid);
    println!("  [OK] string, filetime, clsid");
}

#[test]
fn test_propvariant_type_checks_and_conversion() {
    let value = PropVariant::from_i32(42);
    let err = value.get_u32().unwrap_err();
    assert_eq!(err.hr(), DISP_E_TYPEMISMATCH);

    assert_eq!(value.to_text().unwrap(), "42");
    let converted = value.change_type(VarType::VT_R8).unwrap();
    assert_eq!(converted.get_f64().unwrap(), 42.0);

    let copy = value.try_clone().unwrap();
    assert_eq!(copy.get_i32().unwrap(), 42);

    let empty = PropVariant::new();
    assert!(empty.is_empty());
    assert_eq!(empty.element_count(), 0);
}

#[test]
fn test_propvariant_raw_ownership() {
    let raw = PropVariant::from_wide_str("handed over").unwrap().into_raw();
    // The string payload moves with the raw value and is cleared once.
    let owned = unsafe { PropVariant::from_raw(raw) };
    assert_eq!(owned.get_wide_str().unwrap(), "handed over");
}

#[test]
fn test_variant_round_trip() {
    println!("\n=== Test: Variant Round Trip ===");

    assert_eq!(Variant::from_i8(-8).get_i8().unwrap(), -8);
    assert_eq!(Variant::from_u8(200).get_u8().unwrap(), 200);
    assert_eq!(Variant::from_i16(-1600).get_i16().unwrap(), -1600);
    assert_eq!(Variant::from_u16(60000).get_u16().unwrap(), 60000);
    assert_eq!(Variant::from_i32(i32::MIN).get_i32().unwrap(), i32::MIN);
    assert_eq!(Variant::from_u32(u32::MAX).get_u32().unwrap(), u32::MAX);
    assert_eq!(Variant::from_i64(-1 << 40).get_i64().unwrap(), -1 << 40);
    assert_eq!(Variant::from_u64(1 << 63).get_u64().unwrap(), 1 << 63);
    assert_eq!(Variant::from_f32(1.5).get_f32().unwrap(), 1.5);
    assert_eq!(Variant::from_f64(-2.25).get_f64().unwrap(), -2.25);
    assert!(Variant::from_bool(true).get_bool().unwrap());
    println!("  [OK] scalars");

    let text = Variant::from_bstr("zürich ✓");
    assert_eq!(text.var_type(), VarType::VT_BSTR);
    assert_eq!(text.get_bstr().unwrap(), "zürich ✓");
    let copy = text.try_clone().unwrap();
    drop(text);
    assert_eq!(copy.get_bstr().unwrap(), "zürich ✓", "copies own their string");
    println!("  [OK] bstr and copy");
}

#[test]
fn test_variant_type_checks_and_conversion() {
    let value = Variant::from_bstr("1250");
    assert_eq!(value.get_i32().unwrap_err().hr(), DISP_E_TYPEMISMATCH);

    let number = value.change_type(VarType::VT_I4).unwrap();
    assert_eq!(number.get_i32().unwrap(), 1250);
    assert_eq!(value.get_bstr().unwrap(), "1250", "the source is left untouched");
    assert_eq!(Variant::from_i32(-7).to_text().unwrap(), "-7");

    assert!(Variant::from_bstr("not a number").change_type(VarType::VT_I4).is_err());

    let empty = Variant::new();
    assert!(empty.is_empty() && !empty.is_null());
    let null = Variant::null();
    assert!(null.is_null() && !null.is_empty());
    assert!(!null.is_array() && !null.is_vector());
}

#[test]
fn test_variant_holds_safearray() {
    let _apartment = ComApartment::single_threaded().unwrap();

    let value = Variant::from_safearray(SafeArray::from_slice(&[4i32, 5, 6]).unwrap()).unwrap();
    assert!(value.is_array());
    assert_eq!(value.var_type(), VarType(VarType::VT_ARRAY.0 | VarType::VT_I4.0));
    assert_eq!(value.element_type(), VarType::VT_I4);

    let copy = value.to_safearray().unwrap();
    assert_eq!(copy.to_vec::<i32>().unwrap(), [4, 5, 6]);
    assert_eq!(Variant::from_i32(1).to_safearray().unwrap_err().hr(), DISP_E_TYPEMISMATCH);
}

#[test]
fn test_propvariant_string_vector() {
    let value = PropVariant::from_strings(&["alpha", "", "gamma"]).unwrap();
    assert_eq!(value.var_type(), VarType::VT_LPWSTR.vector_of());
    assert_eq!(value.element_count(), 3);
    assert_eq!(value.to_strings().unwrap(), ["alpha", "", "gamma"]);

    let single = PropVariant::from_u32(7);
    assert_eq!(single.to_strings().unwrap(), ["7"]);
}

#[test]
fn test_safearray_nested_locks() {
    println!("\n=== Test: SafeArray Locks ===");
    let _apartment = ComApartment::single_threaded().unwrap();

    let array = SafeArray::from_slice(&[1i32, 2, 3]).unwrap();
    assert_eq!(array.var_type().unwrap(), VarType::VT_I4);
    {
        let _outer = array.lock().unwrap();
        let _inner = array.lock().unwrap();
        let mut data = array.access_data().unwrap();
        data.as_mut_slice::<i32>().unwrap()[1] = 20;
        assert!(data.as_slice::<u8>().is_err(), "element type should be checked");
    }
    println!("  [OK] nested locks released");

    // A destroy would fail with a lock still held.
    assert_eq!(array.to_vec::<i32>().unwrap(), [1, 20, 3]);
    let clone = array.try_clone().unwrap();
    drop(array);
    assert_eq!(clone.to_vec::<i32>().unwrap(), [1, 20, 3]);
}

#[test]
fn test_safearray_shape() {
    let _apartment = ComApartment::single_threaded().unwrap();

    let array = SafeArray::create_array(VarType::VT_R8, &[2, 3, 4], Some(&[0, 1, -1])).unwrap();
    assert_eq!(array.dims(), 3);
    assert_eq!(array.element_size(), 8);
    assert_eq!(array.len().unwrap(), 24);
    assert_eq!(array.bounds().unwrap(), [(0, 1), (1, 3), (-1, 2)]);

    let err = SafeArray::create_array_hr(VarType::VT_R8, &[2, 3], Some(&[0])).hr();
    assert_eq!(err, E_INVALIDARG);

    let empty = SafeArray::from_slice::<i32>(&[]).unwrap();
    assert_eq!(empty.len().unwrap(), 0);
    assert!(empty.to_vec::<i32>().unwrap().is_empty());
    assert!(SafeArray::from_strings::<&str>(&[]).unwrap().to_strings().unwrap().is_empty());

    let vector = SafeArray::create_vector(VarType::VT_UI1, 5, 1).unwrap();
    assert_eq!((vector.lbound(1).unwrap(), vector.ubound(1).unwrap()), (1, 5));
    vector.clear_data().unwrap();
}

#[test]
fn test_safearray_strings() {
    let _apartment = ComApartment::single_threaded().unwrap();
    let array = SafeArray::from_strings(&["one", "two"]).unwrap();
    assert_eq!(array.var_type().unwrap(), VarType::VT_BSTR);
    assert_eq!(array.to_strings().unwrap(), ["one", "two"]);
}

#[test]
fn test_global_memory_lock() {
    println!("\n=== Test: Global Memory ===");

    let block = GlobalMemory::from_bytes(b"clipboard").value().unwrap();
    assert!(block.size() >= 9);
    {
        let mut lock = block.lock().unwrap();
        lock.as_mut_slice()[0] = b'C';
    }
    assert_eq!(&block.to_vec().unwrap()[..9], b"Clipboard");

    let zeroed = GlobalMemory::alloc(GlobalFlags::Handle, 16).value().unwrap();
    assert!(zeroed.lock().unwrap().as_slice().iter().all(|&b| b == 0));
    println!("  [OK] lock, write, unlock");

    // `block` outlives the call, so the handle stays valid.
    let head = unsafe { GlobalMemoryLock::with(block.handle(), |bytes| bytes[..5].to_vec()) }.unwrap();
    assert_eq!(head, b"Clipb");
}

#[test]
fn test_task_memory_string() {
    let block = TaskMem::<u16>::alloc_wide_str("task string").value().unwrap();
    assert!(!block.is_null());
    assert_eq!(block.to_string_lossy(), "task string");
}
