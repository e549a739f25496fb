//! Portable tests for the result convention, scoped release and narrowing.
//!
//! These run on every platform; they exercise the public API only.
//!
//! Run with: cargo test --test convention_test -- --nocapture

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};

use comscope::com::status::{E_FAIL, E_NOINTERFACE, E_OUTOFMEMORY, S_FALSE, S_OK};
use comscope::{acquire, narrow, with_scoped, ComError, ComResult, ExternalResource, HResult, Narrow, Scoped, ScopedBatch};

struct Block<'a> {
    name: &'static str,
    log: &'a RefCell<Vec<String>>,
}

impl<'a> Block<'a> {
    fn alloc(name: &'static str, log: &'a RefCell<Vec<String>>) -> ComResult<Self> {
        log.borrow_mut().push(format!("alloc {name}"));
        ComResult::ok(Self { name, log })
    }
}

impl ExternalResource for Block<'_> {
    fn release(&mut self) {
        self.log.borrow_mut().push(format!("free {}", self.name));
    }
}

#[test]
fn test_result_scenarios() {
    println!("\n=== Test: Result Scenarios ===");

    let ok = ComResult::new(HResult(0), 42);
    assert!(ok.success(), "status 0 should be a success");
    assert_eq!(ok.value().ok(), Some(42));
    println!("  [OK] status 0 carries 42");

    let failed = ComResult::new(HResult(-2147467259), None::<u32>);
    assert!(!failed.success(), "negative status should be a failure");
    let err = failed.value().expect_err("value of a failed result should raise");
    assert_eq!(err.hr(), E_FAIL);
    assert!(err.to_string().contains("0x80004005"));
    println!("  [OK] generic failure raises with {}", err.hr());
}

#[test]
fn test_success_follows_sign_bit() {
    for code in [0, 1, 2, 0x7fff_ffff] {
        let result = ComResult::new(HResult(code), ());
        assert!(result.success(), "{code:#x} should succeed");
        assert!(result.value().is_ok());
    }
    for code in [-1, i32::MIN, -2147024809] {
        let result = ComResult::new(HResult(code), ());
        assert!(!result.success(), "{code:#x} should fail");
        assert!(result.value().is_err());
    }
}

#[test]
fn test_value_unchecked_matches_value() {
    let a = ComResult::new(S_FALSE, String::from("partial"));
    let b = a.clone();
    assert!(a.success());
    let unchecked = unsafe { a.value_unchecked() };
    assert_eq!(Some(unchecked), b.value().ok());
}

fn nested_blocks(log: &RefCell<Vec<String>>) -> Result<(), ComError> {
    let _a = acquire(|| Block::alloc("A", log))?;
    let _b = acquire(|| Block::alloc("B", log))?;
    E_OUTOFMEMORY.check()?;
    Ok(())
}

#[test]
fn test_nested_blocks_release_in_reverse() {
    println!("\n=== Test: Nested Scoped Blocks ===");

    let log = RefCell::new(Vec::new());
    let err = nested_blocks(&log).expect_err("body should fail after B");
    assert_eq!(err.hr(), E_OUTOFMEMORY);
    assert_eq!(*log.borrow(), ["alloc A", "alloc B", "free B", "free A"]);
    println!("  [OK] released B then A once each");
}

#[test]
fn test_nested_blocks_release_on_panic() {
    let log = RefCell::new(Vec::new());
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _a = Scoped::new(Block { name: "A", log: &log });
        with_scoped(Block { name: "B", log: &log }, |_| panic!("body raised"));
    }));
    assert!(outcome.is_err());
    assert_eq!(*log.borrow(), ["free B", "free A"]);
}

#[test]
fn test_batch_releases_every_element() {
    let log = RefCell::new(Vec::new());
    {
        let mut batch = ScopedBatch::with_capacity(3);
        for name in ["x", "y", "z"] {
            batch.push(Block { name, log: &log });
        }
        assert_eq!(batch.len(), 3);
    }
    assert_eq!(*log.borrow(), ["free z", "free y", "free x"]);
}

struct Handle {
    capabilities: &'static [&'static str],
}

struct Reader;

impl Narrow<Reader> for Handle {
    fn narrow(&self) -> Result<Reader, ComError> {
        if self.capabilities.contains(&"read") {
            Ok(Reader)
        } else {
            Err(ComError::new(E_NOINTERFACE))
        }
    }
}

#[test]
fn test_narrowing() {
    println!("\n=== Test: Narrowing ===");

    assert!(matches!(narrow::<Handle, Reader>(None), Ok(None)));
    println!("  [OK] null handle narrows to null");

    let plain = Handle { capabilities: &[] };
    let err = narrow::<_, Reader>(Some(&plain)).err().map(|e| e.hr());
    assert_eq!(err, Some(E_NOINTERFACE));
    println!("  [OK] missing capability is E_NOINTERFACE");

    let reader = Handle { capabilities: &["read"] };
    assert!(matches!(narrow::<_, Reader>(Some(&reader)), Ok(Some(Reader))));
}

#[test]
fn test_hresult_serde_is_transparent() {
    let json = serde_json::to_string(&S_OK).unwrap();
    assert_eq!(json, "0");
    let hr: HResult = serde_json::from_str("-2147467259").unwrap();
    assert_eq!(hr, E_FAIL);
}
