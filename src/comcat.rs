//! Provides read access to the component category manager.
//!
//! # Examples
//! ```no_run
//! use comscope::comcat::CategoryInformation;
//! use comscope::config::ComApartment;
//!
//! let _apartment = ComApartment::single_threaded()?;
//! let manager = CategoryInformation::create()?;
//! for info in manager.categories(0)? {
//!     println!("{} {}", info.catid, info.description);
//! }
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::ffi::c_void;

use serde::{Deserialize, Serialize};
use windows::core::{IUnknown, Interface, GUID};
use windows::Win32::System::Com::*;

use crate::com::result::{count_u32, next_one, ComError, ComResult};
use crate::com::status::{HResult, E_FAIL, S_OK};
use crate::guid::Guid;
use crate::mem::take_task_string;

/// `CLSID_StdComponentCategoriesMgr`.
pub const CLSID_STD_COMPONENT_CATEGORIES_MGR: Guid = Guid::from_u128(0x0002e005_0000_0000_c000_000000000046);

/// One registered component category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub catid: Guid,
    pub lcid: u32,
    pub description: String,
}

impl From<&CATEGORYINFO> for CategoryInfo {
    fn from(raw: &CATEGORYINFO) -> Self {
        let len = raw.szDescription.iter().position(|&c| c == 0).unwrap_or(raw.szDescription.len());
        Self {
            catid: Guid::from(raw.catid),
            lcid: raw.lcid,
            description: String::from_utf16_lossy(&raw.szDescription[..len]),
        }
    }
}

// ---------------------------------------------------------------------------
// Enumerators
// ---------------------------------------------------------------------------

/// Wraps an `IEnumGUID`.
#[derive(Clone, Debug)]
pub struct GuidEnumerator {
    inner: IEnumGUID,
}

impl GuidEnumerator {
    pub fn new(inner: IEnumGUID) -> Self {
        Self { inner }
    }

    /// Resets the enumerator and iterates from the first element.
    ///
    /// # Errors
    /// Returns the failure of `IEnumGUID::Reset`.
    pub fn iter(&self) -> crate::Result<GuidIter<'_>> {
        unsafe { self.inner.Reset() }.map_err(ComError::from)?;
        Ok(GuidIter {
            inner: &self.inner,
            done: false,
        })
    }

    /// # Errors
    /// Returns the reset failure or the first `Next` failure.
    pub fn to_vec(&self) -> crate::Result<Vec<Guid>> {
        self.iter()?.collect()
    }

    /// Clones the enumerator at its current position.
    pub fn try_clone_hr(&self) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.Clone() }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IEnumGUID::Clone`.
    pub fn try_clone(&self) -> crate::Result<Self> {
        self.try_clone_hr().value()
    }
}

/// Iterates over an `IEnumGUID`; a failure is yielded once and ends it.
pub struct GuidIter<'a> {
    inner: &'a IEnumGUID,
    done: bool,
}

impl Iterator for GuidIter<'_> {
    type Item = crate::Result<Guid>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let inner = self.inner;
        let item = next_one(GUID::zeroed(), |slot, fetched| {
            unsafe { inner.Next(slot, Some(fetched as *mut u32)) }.into()
        });
        match item {
            Ok(Some(guid)) => Some(Ok(Guid::from(guid))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Wraps an `IEnumCATEGORYINFO`.
#[derive(Clone, Debug)]
pub struct CategoryInfoEnumerator {
    inner: IEnumCATEGORYINFO,
}

impl CategoryInfoEnumerator {
    pub fn new(inner: IEnumCATEGORYINFO) -> Self {
        Self { inner }
    }

    /// Resets the enumerator and iterates from the first element.
    ///
    /// # Errors
    /// Returns the failure of `IEnumCATEGORYINFO::Reset`.
    pub fn iter(&self) -> crate::Result<CategoryInfoIter<'_>> {
        unsafe { self.inner.Reset() }.map_err(ComError::from)?;
        Ok(CategoryInfoIter {
            inner: &self.inner,
            done: false,
        })
    }

    /// # Errors
    /// Returns the reset failure or the first `Next` failure.
    pub fn to_vec(&self) -> crate::Result<Vec<CategoryInfo>> {
        self.iter()?.collect()
    }

    /// Clones the enumerator at its current position.
    pub fn try_clone_hr(&self) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.Clone() }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IEnumCATEGORYINFO::Clone`.
    pub fn try_clone(&self) -> crate::Result<Self> {
        self.try_clone_hr().value()
    }
}

/// Iterates over an `IEnumCATEGORYINFO`.
pub struct CategoryInfoIter<'a> {
    inner: &'a IEnumCATEGORYINFO,
    done: bool,
}

impl Iterator for CategoryInfoIter<'_> {
    type Item = crate::Result<CategoryInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let inner = self.inner;
        let item = next_one(unsafe { std::mem::zeroed::<CATEGORYINFO>() }, |slot, fetched| {
            // The generated method hides the S_FALSE end marker.
            unsafe {
                (Interface::vtable(inner).Next)(Interface::as_raw(inner), 1, slot.as_mut_ptr(), fetched as *mut u32)
            }
            .into()
        });
        match item {
            Ok(Some(raw)) => Some(Ok(CategoryInfo::from(&raw))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CategoryInformation
// ---------------------------------------------------------------------------

fn guid_array(ids: &[Guid]) -> Vec<GUID> {
    ids.iter().copied().map(GUID::from).collect()
}

/// Count and pointer for a category list. `None` is passed as a count of
/// `u32::MAX` with no array, which the manager reads as "any category".
fn category_list(ids: Option<&[GUID]>) -> crate::Result<(u32, *const GUID)> {
    match ids {
        None => Ok((u32::MAX, std::ptr::null())),
        Some([]) => Ok((0, std::ptr::null())),
        Some(ids) => Ok((count_u32(ids.len())?, ids.as_ptr())),
    }
}

/// Wraps `ICatInformation`.
#[derive(Clone, Debug)]
pub struct CategoryInformation {
    inner: ICatInformation,
}

impl CategoryInformation {
    /// Wraps an existing category manager.
    pub fn new(inner: ICatInformation) -> Self {
        Self { inner }
    }

    /// Creates the standard component category manager.
    pub fn create_hr() -> ComResult<Self> {
        let clsid = GUID::from(CLSID_STD_COMPONENT_CATEGORIES_MGR);
        ComResult::from(unsafe { CoCreateInstance::<_, ICatInformation>(&clsid, None::<&IUnknown>, CLSCTX_INPROC_SERVER) })
            .map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CoCreateInstance`.
    pub fn create() -> crate::Result<Self> {
        Self::create_hr().value()
    }

    /// Enumerates the registered categories with descriptions for `lcid`.
    pub fn enum_categories_hr(&self, lcid: u32) -> ComResult<CategoryInfoEnumerator> {
        ComResult::from(unsafe { self.inner.EnumCategories(lcid) }).map(CategoryInfoEnumerator::new)
    }

    /// # Errors
    /// Returns the failure of `ICatInformation::EnumCategories`.
    pub fn enum_categories(&self, lcid: u32) -> crate::Result<CategoryInfoEnumerator> {
        self.enum_categories_hr(lcid).value()
    }

    /// Collects every registered category.
    ///
    /// # Errors
    /// Returns the first enumeration failure.
    pub fn categories(&self, lcid: u32) -> crate::Result<Vec<CategoryInfo>> {
        self.enum_categories(lcid)?.to_vec()
    }

    /// Returns the description of `catid` for `lcid`.
    pub fn category_description_hr(&self, catid: Guid, lcid: u32) -> ComResult<String> {
        let catid = GUID::from(catid);
        ComResult::from(unsafe { self.inner.GetCategoryDesc(&catid, lcid) })
            .map(|desc| unsafe { take_task_string(desc) })
    }

    /// # Errors
    /// Returns `CAT_E_CATIDNOEXIST` or `CAT_E_NODESCRIPTION` from
    /// `ICatInformation::GetCategoryDesc`.
    pub fn category_description(&self, catid: Guid, lcid: u32) -> crate::Result<String> {
        self.category_description_hr(catid, lcid).value()
    }

    /// Enumerates classes implementing every category in `implemented` and
    /// requiring only categories in `required`. `None` for `implemented`
    /// matches every class.
    pub fn classes_of_categories_hr(&self, implemented: Option<&[Guid]>, required: &[Guid]) -> ComResult<GuidEnumerator> {
        let implemented = implemented.map(guid_array);
        let required = guid_array(required);
        let lists = category_list(implemented.as_deref())
            .and_then(|imp| Ok((imp, category_list(Some(required.as_slice()))?)));
        let ((impl_count, impl_ptr), (req_count, req_ptr)) = match lists {
            Ok(lists) => lists,
            Err(err) => return ComResult::failed(err.hr()),
        };
        let mut raw: *mut c_void = std::ptr::null_mut();
        // The generated method takes slices and cannot pass the "any" count.
        let hr: HResult = unsafe {
            (Interface::vtable(&self.inner).EnumClassesOfCategories)(
                Interface::as_raw(&self.inner),
                impl_count,
                impl_ptr,
                req_count,
                req_ptr,
                &mut raw,
            )
        }
        .into();
        if hr.is_failure() {
            return ComResult::failed(hr);
        }
        if raw.is_null() {
            return ComResult::failed(E_FAIL);
        }
        ComResult::new(hr, GuidEnumerator::new(unsafe { IEnumGUID::from_raw(raw) }))
    }

    /// # Errors
    /// Returns the failure of `ICatInformation::EnumClassesOfCategories`.
    pub fn classes_of_categories(&self, implemented: Option<&[Guid]>, required: &[Guid]) -> crate::Result<GuidEnumerator> {
        self.classes_of_categories_hr(implemented, required).value()
    }

    /// Tests one class against the same filter as
    /// [`CategoryInformation::classes_of_categories`]. `S_OK` means
    /// `clsid` matches, `S_FALSE` not.
    pub fn is_class_of_categories_hr(
        &self,
        clsid: Guid,
        implemented: Option<&[Guid]>,
        required: &[Guid],
    ) -> ComResult<bool> {
        let clsid = GUID::from(clsid);
        let implemented = implemented.map(guid_array);
        let required = guid_array(required);
        let lists = category_list(implemented.as_deref())
            .and_then(|imp| Ok((imp, category_list(Some(required.as_slice()))?)));
        let ((impl_count, impl_ptr), (req_count, req_ptr)) = match lists {
            Ok(lists) => lists,
            Err(err) => return ComResult::failed(err.hr()),
        };
        let hr: HResult = unsafe {
            (Interface::vtable(&self.inner).IsClassOfCategories)(
                Interface::as_raw(&self.inner),
                &clsid,
                impl_count,
                impl_ptr,
                req_count,
                req_ptr,
            )
        }
        .into();
        ComResult::new(hr, hr == S_OK)
    }

    /// # Errors
    /// Returns the failure of `ICatInformation::IsClassOfCategories`.
    pub fn is_class_of_categories(&self, clsid: Guid, implemented: Option<&[Guid]>, required: &[Guid]) -> crate::Result<bool> {
        self.is_class_of_categories_hr(clsid, implemented, required).value()
    }

    /// Enumerates the categories `clsid` implements.
    pub fn impl_categories_of_class_hr(&self, clsid: Guid) -> ComResult<GuidEnumerator> {
        let clsid = GUID::from(clsid);
        ComResult::from(unsafe { self.inner.EnumImplCategoriesOfClass(&clsid) }).map(GuidEnumerator::new)
    }

    /// # Errors
    /// Returns the failure of `ICatInformation::EnumImplCategoriesOfClass`.
    pub fn impl_categories_of_class(&self, clsid: Guid) -> crate::Result<GuidEnumerator> {
        self.impl_categories_of_class_hr(clsid).value()
    }

    /// Enumerates the categories a container needs to host `clsid`.
    pub fn req_categories_of_class_hr(&self, clsid: Guid) -> ComResult<GuidEnumerator> {
        let clsid = GUID::from(clsid);
        ComResult::from(unsafe { self.inner.EnumReqCategoriesOfClass(&clsid) }).map(GuidEnumerator::new)
    }

    /// # Errors
    /// Returns the failure of `ICatInformation::EnumReqCategoriesOfClass`.
    pub fn req_categories_of_class(&self, clsid: Guid) -> crate::Result<GuidEnumerator> {
        self.req_categories_of_class_hr(clsid).value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_info_from_raw() {
        let mut raw: CATEGORYINFO = unsafe { std::mem::zeroed() };
        raw.catid = GUID::from_u128(0x40fc6ed5_2438_11cf_a3db_080036f12502);
        raw.lcid = 0x409;
        for (dst, src) in raw.szDescription.iter_mut().zip("Controls".encode_utf16()) {
            *dst = src;
        }
        let info = CategoryInfo::from(&raw);
        assert_eq!(info.description, "Controls");
        assert_eq!(info.lcid, 0x409);
        assert_eq!(info.catid, Guid::from_u128(0x40fc6ed5_2438_11cf_a3db_080036f12502));
    }

    #[test]
    fn test_category_list_counts() {
        let (count, ptr) = category_list(None).unwrap();
        assert_eq!(count, u32::MAX);
        assert!(ptr.is_null());

        let (count, ptr) = category_list(Some(&[][..])).unwrap();
        assert_eq!(count, 0);
        assert!(ptr.is_null());

        let ids = [GUID::from_u128(1), GUID::from_u128(2)];
        let (count, ptr) = category_list(Some(&ids[..])).unwrap();
        assert_eq!(count, 2);
        assert_eq!(ptr, ids.as_ptr());
    }
}
