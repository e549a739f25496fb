//! Provides `SafeArray`, an owned `SAFEARRAY*`, and the two scoped ways of
//! reaching its elements.
//!
//! [`SafeArray::lock`] holds a lock count for as long as the guard lives;
//! [`SafeArray::access_data`] additionally exposes the element storage.
//! Both guards nest and release in reverse order. When the lock or access
//! call fails there is nothing to release and the guard is never built.
//!
//! # Examples
//! ```no_run
//! use comscope::safearray::SafeArray;
//!
//! let array = SafeArray::from_slice(&[1i32, 2, 3])?;
//! {
//!     let _outer = array.lock()?;
//!     let _inner = array.lock()?;
//! }
//! assert_eq!(array.to_vec::<i32>()?, vec![1, 2, 3]);
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::ffi::c_void;

use windows::core::BSTR;
use windows::Win32::System::Com::*;
use windows::Win32::System::Ole::*;

use crate::com::result::{count_u32, ComError, ComResult};
use crate::com::scoped::{ExternalResource, Scoped};
use crate::com::status::{HResult, DISP_E_TYPEMISMATCH, E_INVALIDARG, E_OUTOFMEMORY, E_POINTER};
use crate::vartype::VarType;

/// Fixed-size element types that can be copied in and out of a safe array.
pub trait SafeArrayElement: Copy + sealed::Sealed {
    const VAR_TYPE: VarType;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! safe_array_element {
    ($($ty:ty => $vt:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl SafeArrayElement for $ty {
                const VAR_TYPE: VarType = VarType::$vt;
            }
        )*
    };
}

safe_array_element! {
    i8 => VT_I1,
    u8 => VT_UI1,
    i16 => VT_I2,
    u16 => VT_UI2,
    i32 => VT_I4,
    u32 => VT_UI4,
    i64 => VT_I8,
    u64 => VT_UI8,
    f32 => VT_R4,
    f64 => VT_R8,
}

/// Represents an owned `SAFEARRAY*`, destroyed on drop.
pub struct SafeArray {
    raw: *mut SAFEARRAY,
}

impl SafeArray {
    /// Creates a one-dimensional array of `elements` zeroed elements.
    pub fn create_vector_hr(vt: VarType, elements: u32, lbound: i32) -> ComResult<Self> {
        let raw = unsafe { SafeArrayCreateVector(vt.into(), lbound, elements) };
        Self::created(raw)
    }

    /// Creates a one-dimensional array of `elements` zeroed elements.
    ///
    /// # Errors
    /// Returns `E_OUTOFMEMORY` when the array cannot be created.
    pub fn create_vector(vt: VarType, elements: u32, lbound: i32) -> crate::Result<Self> {
        Self::create_vector_hr(vt, elements, lbound).value()
    }

    /// Creates a multi-dimensional array. `lbounds` defaults to all zeros
    /// and must have one entry per dimension when given.
    pub fn create_array_hr(vt: VarType, elements: &[u32], lbounds: Option<&[i32]>) -> ComResult<Self> {
        if elements.is_empty() || lbounds.is_some_and(|lb| lb.len() != elements.len()) {
            return ComResult::failed(E_INVALIDARG);
        }
        let bounds: Vec<SAFEARRAYBOUND> = elements
            .iter()
            .enumerate()
            .map(|(i, &count)| SAFEARRAYBOUND {
                cElements: count,
                lLbound: lbounds.map_or(0, |lb| lb[i]),
            })
            .collect();
        let raw = unsafe { SafeArrayCreate(vt.into(), bounds.len() as u32, bounds.as_ptr()) };
        Self::created(raw)
    }

    /// Creates a multi-dimensional array.
    ///
    /// # Errors
    /// Returns `E_INVALIDARG` when `lbounds` does not match `elements`, and
    /// `E_OUTOFMEMORY` when the array cannot be created.
    pub fn create_array(vt: VarType, elements: &[u32], lbounds: Option<&[i32]>) -> crate::Result<Self> {
        Self::create_array_hr(vt, elements, lbounds).value()
    }

    fn created(raw: *mut SAFEARRAY) -> ComResult<Self> {
        if raw.is_null() {
            ComResult::failed(E_OUTOFMEMORY)
        } else {
            ComResult::ok(Self { raw })
        }
    }

    /// Takes ownership of an array returned by an external call.
    ///
    /// # Safety
    /// `raw` must be a live array that nobody else destroys.
    pub unsafe fn from_raw(raw: *mut SAFEARRAY) -> Option<Self> {
        (!raw.is_null()).then_some(Self { raw })
    }

    /// Returns the array pointer without giving up ownership.
    pub fn as_raw(&self) -> *mut SAFEARRAY {
        self.raw
    }

    /// Gives up ownership; the caller becomes responsible for destroying.
    pub fn into_raw(self) -> *mut SAFEARRAY {
        let raw = self.raw;
        std::mem::forget(self);
        raw
    }

    /// Returns the number of dimensions.
    pub fn dims(&self) -> u32 {
        unsafe { SafeArrayGetDim(self.raw) }
    }

    /// Returns the size of one element in bytes.
    pub fn element_size(&self) -> usize {
        unsafe { SafeArrayGetElemsize(self.raw) as usize }
    }

    /// Returns the lower bound of dimension `dim` (1-based).
    pub fn lbound_hr(&self, dim: u32) -> ComResult<i32> {
        unsafe { SafeArrayGetLBound(self.raw, dim) }.into()
    }

    /// # Errors
    /// Returns `DISP_E_BADINDEX` for a dimension out of range.
    pub fn lbound(&self, dim: u32) -> crate::Result<i32> {
        self.lbound_hr(dim).value()
    }

    /// Returns the upper bound (inclusive) of dimension `dim` (1-based).
    pub fn ubound_hr(&self, dim: u32) -> ComResult<i32> {
        unsafe { SafeArrayGetUBound(self.raw, dim) }.into()
    }

    /// # Errors
    /// Returns `DISP_E_BADINDEX` for a dimension out of range.
    pub fn ubound(&self, dim: u32) -> crate::Result<i32> {
        self.ubound_hr(dim).value()
    }

    /// Returns `(lower, upper)` for every dimension, outermost first.
    ///
    /// # Errors
    /// Propagates a bound query failure.
    pub fn bounds(&self) -> crate::Result<Vec<(i32, i32)>> {
        (1..=self.dims())
            .map(|dim| Ok((self.lbound(dim)?, self.ubound(dim)?)))
            .collect()
    }

    /// Returns the total element count across all dimensions.
    ///
    /// # Errors
    /// Propagates a bound query failure.
    pub fn len(&self) -> crate::Result<usize> {
        Ok(self
            .bounds()?
            .into_iter()
            .map(|(lower, upper)| (i64::from(upper) - i64::from(lower) + 1).max(0) as usize)
            .product())
    }

    /// # Errors
    /// Propagates a bound query failure.
    pub fn is_empty(&self) -> crate::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the element type recorded in the array.
    pub fn var_type_hr(&self) -> ComResult<VarType> {
        ComResult::from(unsafe { SafeArrayGetVartype(self.raw) }).map(VarType::from)
    }

    /// # Errors
    /// Returns the failure of `SafeArrayGetVartype`.
    pub fn var_type(&self) -> crate::Result<VarType> {
        self.var_type_hr().value()
    }

    /// Increments the lock count; the guard decrements it.
    pub fn lock_hr(&self) -> ComResult<Scoped<SafeArrayLock<'_>>> {
        match unsafe { SafeArrayLock(self.raw) } {
            Ok(()) => ComResult::ok(Scoped::new(SafeArrayLock { array: self })),
            Err(err) => ComResult::failed(HResult::from(err.code())),
        }
    }

    /// Increments the lock count; the guard decrements it.
    ///
    /// # Errors
    /// Returns the failure of `SafeArrayLock`. No unlock is due then.
    pub fn lock(&self) -> crate::Result<Scoped<SafeArrayLock<'_>>> {
        self.lock_hr().value()
    }

    /// Locks the array and exposes its element storage until the guard drops.
    pub fn access_data_hr(&self) -> ComResult<Scoped<SafeArrayData<'_>>> {
        let len = match self.len() {
            Ok(len) => len,
            Err(err) => return ComResult::failed(err.hr()),
        };
        let mut data: *mut c_void = std::ptr::null_mut();
        if let Err(err) = unsafe { SafeArrayAccessData(self.raw, &mut data) } {
            return ComResult::failed(HResult::from(err.code()));
        }
        let data = Scoped::new(SafeArrayData {
            array: self,
            ptr: data.cast(),
            byte_len: len * self.element_size(),
        });
        if data.ptr.is_null() && data.byte_len != 0 {
            return ComResult::failed(E_POINTER);
        }
        ComResult::ok(data)
    }

    /// Locks the array and exposes its element storage until the guard drops.
    ///
    /// # Errors
    /// Returns the failure of `SafeArrayAccessData`. No unaccess is due then.
    pub fn access_data(&self) -> crate::Result<Scoped<SafeArrayData<'_>>> {
        self.access_data_hr().value()
    }

    /// Deep-copies the array and its elements.
    pub fn try_clone_hr(&self) -> ComResult<Self> {
        ComResult::from(unsafe { SafeArrayCopy(self.raw) }).and_then(Self::created)
    }

    /// # Errors
    /// Returns the failure of `SafeArrayCopy`.
    pub fn try_clone(&self) -> crate::Result<Self> {
        self.try_clone_hr().value()
    }

    /// Frees every element (strings, interfaces) and zeroes the storage.
    pub fn clear_data_hr(&self) -> ComResult<()> {
        unsafe { SafeArrayDestroyData(self.raw) }.into()
    }

    /// # Errors
    /// Returns the failure of `SafeArrayDestroyData`, such as
    /// `DISP_E_ARRAYISLOCKED` while a guard is alive.
    pub fn clear_data(&self) -> crate::Result<()> {
        self.clear_data_hr().value()
    }

    /// Creates a zero-based vector holding a copy of `items`.
    ///
    /// # Errors
    /// Returns the creation or access failure.
    pub fn from_slice<T: SafeArrayElement>(items: &[T]) -> crate::Result<Self> {
        let array = Self::create_vector(T::VAR_TYPE, count_u32(items.len())?, 0)?;
        {
            let mut data = array.access_data()?;
            data.as_mut_slice::<T>()?.copy_from_slice(items);
        }
        Ok(array)
    }

    /// Creates a zero-based `VT_BSTR` vector holding a copy of `items`.
    ///
    /// # Errors
    /// Returns the creation or access failure.
    pub fn from_strings<S: AsRef<str>>(items: &[S]) -> crate::Result<Self> {
        let array = Self::create_vector(VarType::VT_BSTR, count_u32(items.len())?, 0)?;
        {
            let data = array.access_data()?;
            let slots = data.ptr.cast::<BSTR>();
            for (i, item) in items.iter().enumerate() {
                // Slots start out null; the array owns what is written here.
                unsafe { slots.add(i).write(BSTR::from(item.as_ref())) };
            }
        }
        Ok(array)
    }

    /// Copies every element out.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` when the array does not hold `T`.
    pub fn to_vec<T: SafeArrayElement>(&self) -> crate::Result<Vec<T>> {
        let data = self.access_data()?;
        Ok(data.as_slice::<T>()?.to_vec())
    }

    /// Copies every `VT_BSTR` element out. Null elements read as `""`.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` when the array does not hold strings.
    pub fn to_strings(&self) -> crate::Result<Vec<String>> {
        if self.var_type()? != VarType::VT_BSTR {
            return Err(ComError::new(DISP_E_TYPEMISMATCH));
        }
        let data = self.access_data()?;
        let count = data.byte_len / std::mem::size_of::<BSTR>();
        if count == 0 {
            return Ok(Vec::new());
        }
        // Borrowed view; the array keeps ownership of every BSTR.
        let strings = unsafe { std::slice::from_raw_parts(data.ptr.cast::<BSTR>(), count) };
        Ok(strings.iter().map(BSTR::to_string).collect())
    }
}

impl Drop for SafeArray {
    fn drop(&mut self) {
        if let Err(err) = unsafe { SafeArrayDestroy(self.raw) } {
            tracing::warn!(hr = %HResult::from(err.code()), "SafeArrayDestroy failed");
        }
    }
}

impl std::fmt::Debug for SafeArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeArray")
            .field("var_type", &self.var_type_hr().value_or_none())
            .field("bounds", &self.bounds().ok())
            .finish()
    }
}

/// Represents one held `SafeArrayLock`.
pub struct SafeArrayLock<'a> {
    array: &'a SafeArray,
}

impl ExternalResource for SafeArrayLock<'_> {
    fn release(&mut self) {
        if let Err(err) = unsafe { SafeArrayUnlock(self.array.raw) } {
            tracing::warn!(hr = %HResult::from(err.code()), "SafeArrayUnlock failed");
        }
    }
}

/// Represents one held `SafeArrayAccessData`, exposing the element storage.
pub struct SafeArrayData<'a> {
    array: &'a SafeArray,
    ptr: *mut u8,
    byte_len: usize,
}

impl SafeArrayData<'_> {
    /// The element storage as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        if self.byte_len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.byte_len) }
    }

    /// Mutable raw view of the element storage.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        if self.byte_len == 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.byte_len) }
    }

    /// Views the storage as `T`s.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` when the array does not hold `T`.
    pub fn as_slice<T: SafeArrayElement>(&self) -> crate::Result<&[T]> {
        let count = self.typed_len::<T>()?;
        if count == 0 {
            return Ok(&[]);
        }
        Ok(unsafe { std::slice::from_raw_parts(self.ptr.cast::<T>(), count) })
    }

    /// Views the storage as mutable `T`s.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` when the array does not hold `T`.
    pub fn as_mut_slice<T: SafeArrayElement>(&mut self) -> crate::Result<&mut [T]> {
        let count = self.typed_len::<T>()?;
        if count == 0 {
            return Ok(&mut []);
        }
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr.cast::<T>(), count) })
    }

    fn typed_len<T: SafeArrayElement>(&self) -> crate::Result<usize> {
        let vt = self.array.var_type()?;
        if vt != T::VAR_TYPE || self.array.element_size() != std::mem::size_of::<T>() {
            return Err(ComError::new(DISP_E_TYPEMISMATCH));
        }
        Ok(self.byte_len / std::mem::size_of::<T>())
    }
}

impl ExternalResource for SafeArrayData<'_> {
    fn release(&mut self) {
        if let Err(err) = unsafe { SafeArrayUnaccessData(self.array.raw) } {
            tracing::warn!(hr = %HResult::from(err.code()), "SafeArrayUnaccessData failed");
        }
    }
}
