//! Component category manager tests against the Windows COM runtime.
//!
//! The tests read the categories registered on the machine and pick their
//! subjects from what they find, so they need no fixtures.
//!
//! Run with: cargo test --test comcat_test -- --nocapture

#![cfg(windows)]

use comscope::com::status::{S_FALSE, S_OK};
use comscope::comcat::{CategoryInfo, CategoryInformation};
use comscope::config::ComApartment;
use comscope::Guid;

/// A category id nothing registers.
const UNKNOWN_CATEGORY: Guid = Guid::from_u128(0x6a3f_0d2e_51c4_4b7a_9e0f_c0a5_c0de_0001);

/// Returns the first registered category that at least one class implements.
fn populated_category(manager: &CategoryInformation) -> Option<(CategoryInfo, Guid)> {
    manager.categories(0).unwrap().into_iter().find_map(|info| {
        let classes = manager.classes_of_categories(Some(&[info.catid]), &[]).unwrap();
        let clsid = classes.iter().unwrap().next()?.unwrap();
        Some((info, clsid))
    })
}

#[test]
fn test_category_enumeration_terminates() {
    println!("\n=== Test: Category Enumeration ===");
    let _apartment = ComApartment::single_threaded().unwrap();

    let manager = CategoryInformation::create().unwrap();
    let enumerator = manager.enum_categories(0).unwrap();
    let first_pass = enumerator.to_vec().unwrap();
    assert!(!first_pass.is_empty(), "Windows registers component categories");
    assert_eq!(enumerator.iter().unwrap().count(), first_pass.len(), "a second pass starts over");

    let mut iter = enumerator.iter().unwrap();
    for _ in 0..first_pass.len() {
        assert!(iter.next().is_some());
    }
    assert!(iter.next().is_none());
    assert!(iter.next().is_none(), "the iterator stays finished");
    println!("  [OK] {} categories", first_pass.len());
}

#[test]
fn test_category_description_matches_enumeration() {
    let _apartment = ComApartment::single_threaded().unwrap();

    let manager = CategoryInformation::create().unwrap();
    let info = manager
        .categories(0)
        .unwrap()
        .into_iter()
        .find(|info| !info.description.is_empty())
        .unwrap();
    assert_eq!(manager.category_description(info.catid, info.lcid).unwrap(), info.description);
    assert!(manager.category_description(UNKNOWN_CATEGORY, info.lcid).is_err());
}

#[test]
fn test_classes_of_any_category() {
    println!("\n=== Test: Classes Of Any Category ===");
    let _apartment = ComApartment::single_threaded().unwrap();

    let manager = CategoryInformation::create().unwrap();
    let all = manager.classes_of_categories(None, &[]).unwrap().to_vec().unwrap();
    assert!(!all.is_empty(), "an unrestricted query lists registered classes");

    let Some((info, clsid)) = populated_category(&manager) else {
        panic!("no category has an implementing class");
    };
    let members = manager.classes_of_categories(Some(&[info.catid]), &[]).unwrap().to_vec().unwrap();
    assert!(members.contains(&clsid));
    assert!(members.len() <= all.len());
    println!("  [OK] {} of {} classes implement {}", members.len(), all.len(), info.description);

    let none = manager.classes_of_categories(Some(&[UNKNOWN_CATEGORY]), &[]).unwrap().to_vec().unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_is_class_of_categories_reports_s_false() {
    println!("\n=== Test: Class Membership ===");
    let _apartment = ComApartment::single_threaded().unwrap();

    let manager = CategoryInformation::create().unwrap();
    let Some((info, clsid)) = populated_category(&manager) else {
        panic!("no category has an implementing class");
    };

    let member = manager.is_class_of_categories_hr(clsid, Some(&[info.catid]), &[]);
    assert_eq!(member.hr(), S_OK);
    assert!(member.value().unwrap());

    let outsider = manager.is_class_of_categories_hr(clsid, Some(&[UNKNOWN_CATEGORY]), &[]);
    assert_eq!(outsider.hr(), S_FALSE, "a non-member is S_FALSE, not a failure");
    assert!(!outsider.value().unwrap());
    println!("  [OK] {clsid} is in {} and not in {UNKNOWN_CATEGORY}", info.catid);

    let implemented = manager.impl_categories_of_class(clsid).unwrap().to_vec().unwrap();
    assert!(implemented.contains(&info.catid));
    assert!(manager.req_categories_of_class(clsid).unwrap().to_vec().is_ok());
}
