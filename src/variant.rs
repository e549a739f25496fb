//! Provides `Variant`, an owned automation `VARIANT`.
//!
//! The automation counterpart of [`crate::propvariant::PropVariant`]:
//! strings are `BSTR`s and arrays are `SAFEARRAY`s. Getters check the exact
//! `VARTYPE`; [`Variant::change_type`] converts with the automation rules.
//! `VariantClear` runs on drop.
//!
//! # Examples
//! ```no_run
//! use comscope::variant::Variant;
//! use comscope::vartype::VarType;
//!
//! let value = Variant::from_bstr("1250");
//! let number = value.change_type(VarType::VT_I4)?;
//! assert_eq!(number.get_i32()?, 1250);
//! assert_eq!(Variant::from_i32(-7).to_text()?, "-7");
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::fmt;
use std::mem::ManuallyDrop;

use windows::core::BSTR;
use windows::Win32::Foundation::*;
use windows::Win32::System::Ole::SafeArrayCopy;
use windows::Win32::System::Variant::*;

use crate::com::result::{ComError, ComResult};
use crate::com::status::{HResult, DISP_E_TYPEMISMATCH, E_POINTER};
use crate::mem::take_task_string;
use crate::safearray::SafeArray;
use crate::vartype::VarType;

/// Represents an owned `VARIANT`.
pub struct Variant {
    inner: VARIANT,
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

impl Variant {
    /// Creates a `VT_EMPTY` value.
    pub fn new() -> Self {
        Self {
            inner: VARIANT::default(),
        }
    }

    /// Takes ownership of a raw value.
    ///
    /// # Safety
    /// `inner` must be a valid `VARIANT` whose payload nobody else clears.
    pub unsafe fn from_raw(inner: VARIANT) -> Self {
        Self { inner }
    }

    /// Borrows the raw value, still owned.
    pub fn as_raw(&self) -> &VARIANT {
        &self.inner
    }

    /// Gives up ownership; the caller becomes responsible for clearing.
    pub fn into_raw(self) -> VARIANT {
        let this = ManuallyDrop::new(self);
        unsafe { std::ptr::read(&this.inner) }
    }

    fn with_value(vt: VarType, set: impl FnOnce(&mut VARIANT_0_0_0)) -> Self {
        let mut inner = VARIANT::default();
        unsafe {
            let fields = &mut inner.Anonymous.Anonymous;
            fields.vt = vt.into();
            set(&mut fields.Anonymous);
        }
        Self { inner }
    }

    fn fields(&self) -> &VARIANT_0_0 {
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

    /// Returns the type with `VT_ARRAY`/`VT_BYREF` removed.
    pub fn element_type(&self) -> VarType {
        self.var_type().element()
    }

    pub fn is_array(&self) -> bool {
        self.var_type().is_array()
    }

    /// Always `false` for well-formed values; `VT_VECTOR` is a
    /// `PROPVARIANT`-only modifier.
    pub fn is_vector(&self) -> bool {
        self.var_type().is_vector()
    }

    pub fn is_empty(&self) -> bool {
        self.var_type() == VarType::VT_EMPTY
    }

    pub fn is_null(&self) -> bool {
        self.var_type() == VarType::VT_NULL
    }

    /// Creates a `VT_NULL` value.
    pub fn null() -> Self {
        Self::with_value(VarType::VT_NULL, |_| {})
    }

    scalar_accessors! {
        from_i8, get_i8, i8, VT_I1, cVal;
        from_u8, get_u8, u8, VT_UI1, bVal;
        from_i16, get_i16, i16, VT_I2, iVal;
        from_u16, get_u16, u16, VT_UI2, uiVal;
        from_i32, get_i32, i32, VT_I4, lVal;
        from_u32, get_u32, u32, VT_UI4, ulVal;
        from_i64, get_i64, i64, VT_I8, llVal;
        from_u64, get_u64, u64, VT_UI8, ullVal;
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

    /// Builds a `VT_BSTR` value owning a copy of `value`.
    pub fn from_bstr(value: &str) -> Self {
        Self::with_value(VarType::VT_BSTR, |data| data.bstrVal = ManuallyDrop::new(BSTR::from(value)))
    }

    /// Reads a `VT_BSTR` value. A null string reads as `""`.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` for any other type.
    pub fn get_bstr(&self) -> crate::Result<String> {
        self.expect_type(VarType::VT_BSTR)?;
        let s: &BSTR = unsafe { &self.fields().Anonymous.bstrVal };
        Ok(s.to_string())
    }

    /// Moves `array` into a `VT_ARRAY | element` value.
    ///
    /// # Errors
    /// Returns the failure reading the element type of `array`.
    pub fn from_safearray(array: SafeArray) -> crate::Result<Self> {
        let vt = VarType(array.var_type()?.0 | VarType::VT_ARRAY.0);
        let raw = array.into_raw();
        Ok(Self::with_value(vt, |data| data.parray = raw))
    }

    /// Deep-copies the array of a `VT_ARRAY` value.
    ///
    /// # Errors
    /// Returns `DISP_E_TYPEMISMATCH` for a non-array value, `E_POINTER` for
    /// a null array, or the failure of `SafeArrayCopy`.
    pub fn to_safearray(&self) -> crate::Result<SafeArray> {
        if !self.is_array() || self.var_type().is_byref() {
            return Err(ComError::new(DISP_E_TYPEMISMATCH));
        }
        let raw = unsafe { self.fields().Anonymous.parray };
        if raw.is_null() {
            return Err(ComError::new(E_POINTER));
        }
        let copy = unsafe { SafeArrayCopy(raw) }.map_err(ComError::from)?;
        unsafe { SafeArray::from_raw(copy) }.ok_or_else(|| ComError::new(E_POINTER))
    }

    /// Converts to another type, leaving `self` untouched.
    pub fn change_type_hr(&self, vt: VarType) -> ComResult<Variant> {
        let mut converted = Variant::new();
        let result = unsafe { VariantChangeType(&mut converted.inner, &self.inner, VAR_CHANGE_FLAGS(0), vt.into()) };
        ComResult::from(result).map(|()| converted)
    }

    /// Converts to another type, leaving `self` untouched.
    ///
    /// # Errors
    /// Returns the conversion failure, such as `DISP_E_TYPEMISMATCH` or
    /// `DISP_E_OVERFLOW`.
    pub fn change_type(&self, vt: VarType) -> crate::Result<Variant> {
        self.change_type_hr(vt).value()
    }

    /// Formats the value as text through `VariantToStringAlloc`.
    pub fn to_text_hr(&self) -> ComResult<String> {
        ComResult::from(unsafe { VariantToStringAlloc(&self.inner) }).map(|s| unsafe { take_task_string(s) })
    }

    /// # Errors
    /// Returns the conversion failure.
    pub fn to_text(&self) -> crate::Result<String> {
        self.to_text_hr().value()
    }

    /// Deep-copies the value.
    pub fn try_clone_hr(&self) -> ComResult<Variant> {
        let mut copy = Variant::new();
        let result = unsafe { VariantCopy(&mut copy.inner, &self.inner) };
        ComResult::from(result).map(|()| copy)
    }

    /// # Errors
    /// Returns the failure of `VariantCopy`.
    pub fn try_clone(&self) -> crate::Result<Variant> {
        self.try_clone_hr().value()
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        if let Err(err) = unsafe { VariantClear(&mut self.inner) } {
            tracing::warn!(hr = %HResult::from(err.code()), "VariantClear failed");
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text_hr().value_or_none() {
            Some(text) => write!(f, "Variant({}, {:?})", self.var_type(), text),
            None => write!(f, "Variant({})", self.var_type()),
        }
    }
}
