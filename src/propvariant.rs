//! Provides `PropVariant`, an owned `PROPVARIANT` with typed constructors and
//! getters.
//!
//! Getters check the exact `VARTYPE`; no coercion happens. Use
//! [`PropVariant::change_type`] to convert first. Heap payloads (wide strings,
//! CLSIDs, string vectors) live in task memory and are freed by
//! `PropVariantClear` on drop.
//!
//! # Examples
//! ```no_run
//! use comscope::propvariant::PropVariant;
//! use comscope::vartype::VarType;
//!
//! let value = PropVariant::from_i32(42);
//! assert_eq!(value.var_type(), VarType::VT_I4);
//! assert_eq!(value.get_i32()?, 42);
//! assert!(value.get_u32().is_err());
//! assert_eq!(value.to_text()?, "42");
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::fmt;

use windows::core::{GUID, PWSTR};
use windows::Win32::Foundation::*;
use windows::Win32::System::Com::StructuredStorage::*;

use crate::com::result::{count_u32, ComError, ComResult};
use crate::com::scoped::{Scoped, ScopedBatch};
use crate::com::status::{HResult, DISP_E_TYPEMISMATCH, E_POINTER};
use crate::filetime::FileTime;
use crate::guid::Guid;
use crate::mem::{take_task_string, TaskMem};
use crate::vartype::VarType;

/// Represents an owned `PROPVARIANT`.
pub struct PropVariant {
    inner: PROPVARIANT,
}

macro_rules! scalar_accessors {
    ($($from:ident, $get:ident, $ty:ty, $vt:ident, $field:ident;)*) => {
        $(
            #[doc = concat!("Builds a `", stringify!($vt), "` value.")]
            pub fn $from(value: $ty) -> Self {
                Self::with_value(VarType::$vt, |data| data.$field = value)
            }

            #[doc = concat!("Reads a `", stringify!($vt), "` value.")]
            ///
            /// # Errors
            /// Returns `DISP_E_TYPEMISMATCH` for any other type.
            pub fn $get(&self) -> crate::Result<$ty> {
                self.expect_type(VarType::$vt)?;
                Ok(unsafe { self.fields().Anonymous.$field })
            }
        )*
    };
}

impl PropVariant {
    /// Creates a `VT_EMPTY` value.
    pub fn new() -> Self {
        Self {
            inner: PROPVARIANT::default(),
        }
    }

    /// Takes ownership of a raw value.
    ///
    /// # Safety
    /// `inner` must be a valid `PROPVARIANT` whose payload nobody else
    /// clears; it is passed to `PropVariantClear` on drop.
    pub unsafe fn from_raw(inner: PROPVARIANT) -> Self {
        Self { inner }
    }

    /// Borrows the raw value, for passing to calls that read a `PROPVARIANT`.
    pub fn as_raw(&self) -> &PROPVARIANT {
        &self.inner
    }

    /// Gives up ownership; the caller becomes responsible for clearing.
    pub fn into_raw(self) -> PROPVARIANT {
        let this = std::mem::ManuallyDrop::new(self);
        unsafe { std::ptr::read(&this.inner) }
    }

    fn with_value(vt: VarType, set: impl FnOnce(&mut PROPVARIANT_0_0_0)) -> Self {
        let mut inner = PROPVARIANT::default();
        unsafe {
            let fields = &mut inner.Anonymous.Anonymous;
            fields.vt = vt.into();
            set(&mut fields.Anonymous);
        }
        Self { inner }
    }

    fn fields(&self) -> &PROPVARIANT_0_0 {
        unsafe { &self.inner.Anonymous.Anonymous }
    }

    fn expect_type(&self, vt: VarType) -> crate::Result<()> {
        if self.var_type() == vt {
            Ok(())
        } else {
            Err(ComError::new(DISP_E_TYPEMISMATCH))
        }
    }

    /// Returns the full `VARTYPE`, modifier bits included.
    pub fn var_type(&self) -> VarType {
        self.fields().vt.into()
    }

    pub fn is_empty(&self) -> bool {
        self.var_type() == VarType::VT_EMPTY
    }

    /// `VT_NULL`, the SQL-style null. Distinct from `VT_EMPTY`.
    pub fn is_null(&self) -> bool {
        self.var_type() == VarType::VT_NULL
    }

    scalar_accessors! {
        from_i8, get_i8, i8, VT_I1, cVal;
        from_u8, get_u8, u8, VT_UI1, bVal;
        from_i16, get_i16, i16, VT_I2, iVal;
        from_u16, get_u16, u16, VT_UI2, uiVal;
        from_i32, get_i32, i32, VT_I4, lVal;
        from_u32, get_u32, u32, VT_UI4, ulVal;
        from_i64, get_i64, i64, VT_I8, hVal;
        from_u64, get_u64, u64, VT_UI8, uhVal;
        from_f32, get_f32, f32, VT_R4, fltVal;
        from_f64, get_f64, f64, VT_R8, dblVal;
    }

    /// Builds a `VT_BOOL` value.
    pub fn from_bool(value: bool) -> Self {
        Self::with_value(VarType::VT_BOOL, |data| {
            data.boolVal = if value { VARIANT_TRUE } else { VARIANT_FALSE };
        })
    }

    /// Reads a `VT_BOOL` value. Any non-zero value is `true`.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` for any other type.
    pub fn get_bool(&self) -> crate::Result<bool> {
        self.expect_type(VarType::VT_BOOL)?;
        Ok(unsafe { self.fields().Anonymous.boolVal }.0 != 0)
    }

    /// Builds a `VT_LPWSTR` value holding a task-allocated copy of `value`.
    ///
    /// # Errors
    /// Returns `E_OUTOFMEMORY` when the copy cannot be allocated.
    pub fn from_wide_str(value: &str) -> crate::Result<Self> {
        let block = TaskMem::<u16>::alloc_wide_str(value).value()?;
        let ptr = block.detach().into_raw();
        Ok(Self::with_value(VarType::VT_LPWSTR, |data| data.pwszVal = PWSTR(ptr)))
    }

    /// Reads a `VT_LPWSTR` value. A null string reads as `""`.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` for any other type.
    pub fn get_wide_str(&self) -> crate::Result<String> {
        self.expect_type(VarType::VT_LPWSTR)?;
        let s = unsafe { self.fields().Anonymous.pwszVal };
        if s.is_null() {
            return Ok(String::new());
        }
        Ok(String::from_utf16_lossy(unsafe { s.as_wide() }))
    }

    /// Builds a `VT_FILETIME` value.
    pub fn from_filetime(value: FileTime) -> Self {
        Self::with_value(VarType::VT_FILETIME, |data| data.filetime = value.into())
    }

    /// Reads a `VT_FILETIME` value.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` for any other type.
    pub fn get_filetime(&self) -> crate::Result<FileTime> {
        self.expect_type(VarType::VT_FILETIME)?;
        Ok(unsafe { self.fields().Anonymous.filetime }.into())
    }

    /// Builds a `VT_CLSID` value holding a task-allocated copy of `value`.
    ///
    /// # Errors
    /// Returns `E_OUTOFMEMORY` when the copy cannot be allocated.
    pub fn from_clsid(value: Guid) -> crate::Result<Self> {
        let block = TaskMem::<GUID>::alloc_bytes(std::mem::size_of::<GUID>()).value()?;
        unsafe { block.as_ptr().write(value.into()) };
        let ptr = block.detach().into_raw();
        Ok(Self::with_value(VarType::VT_CLSID, |data| data.puuid = ptr))
    }

    /// Reads a `VT_CLSID` value.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` for any other type and `E_POINTER` for
    /// a null payload.
    pub fn get_clsid(&self) -> crate::Result<Guid> {
        self.expect_type(VarType::VT_CLSID)?;
        let ptr = unsafe { self.fields().Anonymous.puuid };
        if ptr.is_null() {
            return Err(ComError::new(E_POINTER));
        }
        Ok(unsafe { *ptr }.into())
    }

    /// Builds a `VT_VECTOR | VT_LPWSTR` value.
    ///
    /// # Errors
    /// Returns `E_OUTOFMEMORY` when an allocation fails. Everything
    /// allocated up to that point is freed.
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> crate::Result<Self> {
        let count = count_u32(values.len())?;
        let array = TaskMem::<PWSTR>::alloc_bytes(values.len().max(1) * std::mem::size_of::<PWSTR>()).value()?;
        let mut strings = ScopedBatch::with_capacity(values.len());
        for value in values {
            strings.push_scoped(TaskMem::<u16>::alloc_wide_str(value.as_ref()).value()?);
        }
        for (i, s) in strings.iter().enumerate() {
            unsafe { array.as_ptr().add(i).write(PWSTR(s.as_ptr())) };
        }
        strings.detach_all();
        let elements = array.detach().into_raw();
        Ok(Self::with_value(VarType::VT_LPWSTR.vector_of(), |data| {
            data.calpwstr = CALPWSTR {
                cElems: count,
                pElems: elements,
            };
        }))
    }

    /// Formats the value as text through `PropVariantToStringAlloc`.
    pub fn to_text_hr(&self) -> ComResult<String> {
        ComResult::from(unsafe { PropVariantToStringAlloc(&self.inner) })
            .map(|s| unsafe { take_task_string(s) })
    }

    /// Formats the value as text.
    ///
    /// # Errors
    /// Returns the conversion failure, such as `DISP_E_TYPEMISMATCH`.
    pub fn to_text(&self) -> crate::Result<String> {
        self.to_text_hr().value()
    }

    /// Converts to another type, leaving `self` untouched.
    pub fn change_type_hr(&self, vt: VarType) -> ComResult<PropVariant> {
        let mut converted = PropVariant::new();
        let result = unsafe { PropVariantChangeType(&mut converted.inner, &self.inner, PVCHF_DEFAULT, vt.into()) };
        ComResult::from(result).map(|()| converted)
    }

    /// Converts to another type, leaving `self` untouched.
    ///
    /// # Errors
    /// Returns the conversion failure.
    pub fn change_type(&self, vt: VarType) -> crate::Result<PropVariant> {
        self.change_type_hr(vt).value()
    }

    /// Returns the number of elements: 1 for scalars, the length for
    /// vectors and arrays, 0 for `VT_EMPTY`.
    pub fn element_count(&self) -> u32 {
        unsafe { PropVariantGetElementCount(&self.inner) }
    }

    /// Converts every element to text.
    ///
    /// Each returned string is a separate task allocation; all of them and
    /// the array holding them are freed before this returns.
    pub fn to_strings_hr(&self) -> ComResult<Vec<String>> {
        let mut elements: *mut PWSTR = std::ptr::null_mut();
        let mut count = 0u32;
        let result = unsafe { PropVariantToStringVectorAlloc(&self.inner, &mut elements, &mut count) };
        if let Err(err) = result {
            return ComResult::failed(HResult::from(err.code()));
        }
        let array = Scoped::new(unsafe { TaskMem::from_raw(elements) });
        let mut strings = ScopedBatch::with_capacity(count as usize);
        for i in 0..count as usize {
            strings.push(unsafe { TaskMem::from_pwstr(*array.as_ptr().add(i)) });
        }
        ComResult::ok(strings.iter().map(|s| s.to_string_lossy()).collect())
    }

    /// Converts every element to text.
    ///
    /// # Errors
    /// Returns the conversion failure.
    pub fn to_strings(&self) -> crate::Result<Vec<String>> {
        self.to_strings_hr().value()
    }

    /// Deep-copies the value.
    pub fn try_clone_hr(&self) -> ComResult<PropVariant> {
        let mut copy = PropVariant::new();
        let result = unsafe { PropVariantCopy(&mut copy.inner, &self.inner) };
        ComResult::from(result).map(|()| copy)
    }

    /// Deep-copies the value.
    ///
    /// # Errors
    /// Returns the failure of `PropVariantCopy`.
    pub fn try_clone(&self) -> crate::Result<PropVariant> {
        self.try_clone_hr().value()
    }
}

impl Default for PropVariant {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PropVariant {
    fn drop(&mut self) {
        if let Err(err) = unsafe { PropVariantClear(&mut self.inner) } {
            tracing::warn!(hr = %HResult::from(err.code()), "PropVariantClear failed");
        }
    }
}

impl fmt::Debug for PropVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text_hr().value_or_none() {
            Some(text) => write!(f, "PropVariant({}, {:?})", self.var_type(), text),
            None => write!(f, "PropVariant({})", self.var_type()),
        }
    }
}
