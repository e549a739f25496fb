//! Provides `VarType`, the type tag shared by `VARIANT`, `PROPVARIANT` and
//! `SAFEARRAY` elements.
//!
//! The low 12 bits name the element type; `VT_VECTOR`, `VT_ARRAY` and
//! `VT_BYREF` are modifier bits on top.
//!
//! # Examples
//! ```
//! use comscope::vartype::VarType;
//!
//! let vt = VarType(VarType::VT_VECTOR.0 | VarType::VT_LPWSTR.0);
//! assert!(vt.is_vector());
//! assert_eq!(vt.element(), VarType::VT_LPWSTR);
//! assert_eq!(vt.to_string(), "VT_VECTOR|VT_LPWSTR");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Represents a `VARTYPE` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarType(pub u16);

impl VarType {
    pub const VT_EMPTY: VarType = VarType(0);
    pub const VT_NULL: VarType = VarType(1);
    pub const VT_I2: VarType = VarType(2);
    pub const VT_I4: VarType = VarType(3);
    pub const VT_R4: VarType = VarType(4);
    pub const VT_R8: VarType = VarType(5);
    pub const VT_CY: VarType = VarType(6);
    pub const VT_DATE: VarType = VarType(7);
    pub const VT_BSTR: VarType = VarType(8);
    pub const VT_DISPATCH: VarType = VarType(9);
    pub const VT_ERROR: VarType = VarType(10);
    pub const VT_BOOL: VarType = VarType(11);
    pub const VT_VARIANT: VarType = VarType(12);
    pub const VT_UNKNOWN: VarType = VarType(13);
    pub const VT_DECIMAL: VarType = VarType(14);
    pub const VT_I1: VarType = VarType(16);
    pub const VT_UI1: VarType = VarType(17);
    pub const VT_UI2: VarType = VarType(18);
    pub const VT_UI4: VarType = VarType(19);
    pub const VT_I8: VarType = VarType(20);
    pub const VT_UI8: VarType = VarType(21);
    pub const VT_INT: VarType = VarType(22);
    pub const VT_UINT: VarType = VarType(23);
    pub const VT_VOID: VarType = VarType(24);
    pub const VT_HRESULT: VarType = VarType(25);
    pub const VT_PTR: VarType = VarType(26);
    pub const VT_SAFEARRAY: VarType = VarType(27);
    pub const VT_CARRAY: VarType = VarType(28);
    pub const VT_USERDEFINED: VarType = VarType(29);
    pub const VT_LPSTR: VarType = VarType(30);
    pub const VT_LPWSTR: VarType = VarType(31);
    pub const VT_RECORD: VarType = VarType(36);
    pub const VT_INT_PTR: VarType = VarType(37);
    pub const VT_UINT_PTR: VarType = VarType(38);
    pub const VT_FILETIME: VarType = VarType(64);
    pub const VT_BLOB: VarType = VarType(65);
    pub const VT_STREAM: VarType = VarType(66);
    pub const VT_STORAGE: VarType = VarType(67);
    pub const VT_STREAMED_OBJECT: VarType = VarType(68);
    pub const VT_STORED_OBJECT: VarType = VarType(69);
    pub const VT_BLOB_OBJECT: VarType = VarType(70);
    pub const VT_CF: VarType = VarType(71);
    pub const VT_CLSID: VarType = VarType(72);
    pub const VT_VERSIONED_STREAM: VarType = VarType(73);
    pub const VT_BSTR_BLOB: VarType = VarType(0x0FFF);
    pub const VT_VECTOR: VarType = VarType(0x1000);
    pub const VT_ARRAY: VarType = VarType(0x2000);
    pub const VT_BYREF: VarType = VarType(0x4000);
    pub const VT_RESERVED: VarType = VarType(0x8000);
    pub const VT_ILLEGAL: VarType = VarType(0xFFFF);
    pub const VT_TYPEMASK: VarType = VarType(0x0FFF);

    /// Returns the element type with the modifier bits removed.
    pub const fn element(self) -> VarType {
        VarType(self.0 & Self::VT_TYPEMASK.0)
    }

    pub const fn is_vector(self) -> bool {
        self.0 & Self::VT_VECTOR.0 != 0
    }

    pub const fn is_array(self) -> bool {
        self.0 & Self::VT_ARRAY.0 != 0
    }

    pub const fn is_byref(self) -> bool {
        self.0 & Self::VT_BYREF.0 != 0
    }

    /// Returns `VT_VECTOR | self`.
    pub const fn vector_of(self) -> VarType {
        VarType(self.0 | Self::VT_VECTOR.0)
    }

    /// Returns the size of one element for fixed-size element types.
    pub const fn fixed_size(self) -> Option<usize> {
        Some(match self.element() {
            Self::VT_I1 | Self::VT_UI1 => 1,
            Self::VT_I2 | Self::VT_UI2 | Self::VT_BOOL => 2,
            Self::VT_I4 | Self::VT_UI4 | Self::VT_INT | Self::VT_UINT | Self::VT_R4 | Self::VT_ERROR => 4,
            Self::VT_I8 | Self::VT_UI8 | Self::VT_R8 | Self::VT_CY | Self::VT_DATE | Self::VT_FILETIME => 8,
            Self::VT_CLSID | Self::VT_DECIMAL => 16,
            _ => return None,
        })
    }

    /// Returns the `VT_*` name of the element type, if it has one.
    pub fn element_name(self) -> Option<&'static str> {
        Some(match self.element() {
            Self::VT_EMPTY => "VT_EMPTY",
            Self::VT_NULL => "VT_NULL",
            Self::VT_I2 => "VT_I2",
            Self::VT_I4 => "VT_I4",
            Self::VT_R4 => "VT_R4",
            Self::VT_R8 => "VT_R8",
            Self::VT_CY => "VT_CY",
            Self::VT_DATE => "VT_DATE",
            Self::VT_BSTR => "VT_BSTR",
            Self::VT_DISPATCH => "VT_DISPATCH",
            Self::VT_ERROR => "VT_ERROR",
            Self::VT_BOOL => "VT_BOOL",
            Self::VT_VARIANT => "VT_VARIANT",
            Self::VT_UNKNOWN => "VT_UNKNOWN",
            Self::VT_DECIMAL => "VT_DECIMAL",
            Self::VT_I1 => "VT_I1",
            Self::VT_UI1 => "VT_UI1",
            Self::VT_UI2 => "VT_UI2",
            Self::VT_UI4 => "VT_UI4",
            Self::VT_I8 => "VT_I8",
            Self::VT_UI8 => "VT_UI8",
            Self::VT_INT => "VT_INT",
            Self::VT_UINT => "VT_UINT",
            Self::VT_VOID => "VT_VOID",
            Self::VT_HRESULT => "VT_HRESULT",
            Self::VT_PTR => "VT_PTR",
            Self::VT_SAFEARRAY => "VT_SAFEARRAY",
            Self::VT_CARRAY => "VT_CARRAY",
            Self::VT_USERDEFINED => "VT_USERDEFINED",
            Self::VT_LPSTR => "VT_LPSTR",
            Self::VT_LPWSTR => "VT_LPWSTR",
            Self::VT_RECORD => "VT_RECORD",
            Self::VT_INT_PTR => "VT_INT_PTR",
            Self::VT_UINT_PTR => "VT_UINT_PTR",
            Self::VT_FILETIME => "VT_FILETIME",
            Self::VT_BLOB => "VT_BLOB",
            Self::VT_STREAM => "VT_STREAM",
            Self::VT_STORAGE => "VT_STORAGE",
            Self::VT_STREAMED_OBJECT => "VT_STREAMED_OBJECT",
            Self::VT_STORED_OBJECT => "VT_STORED_OBJECT",
            Self::VT_BLOB_OBJECT => "VT_BLOB_OBJECT",
            Self::VT_CF => "VT_CF",
            Self::VT_CLSID => "VT_CLSID",
            Self::VT_VERSIONED_STREAM => "VT_VERSIONED_STREAM",
            Self::VT_BSTR_BLOB => "VT_BSTR_BLOB",
            _ => return None,
        })
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Self::VT_BYREF, "VT_BYREF|"),
            (Self::VT_ARRAY, "VT_ARRAY|"),
            (Self::VT_VECTOR, "VT_VECTOR|"),
        ] {
            if self.0 & flag.0 != 0 {
                f.write_str(name)?;
            }
        }
        match self.element_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "VT_0x{:03X}", self.element().0),
        }
    }
}

#[cfg(windows)]
impl From<windows::Win32::System::Variant::VARENUM> for VarType {
    fn from(vt: windows::Win32::System::Variant::VARENUM) -> Self {
        Self(vt.0)
    }
}

#[cfg(windows)]
impl From<VarType> for windows::Win32::System::Variant::VARENUM {
    fn from(vt: VarType) -> Self {
        windows::Win32::System::Variant::VARENUM(vt.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_bits() {
        let vt = VarType(VarType::VT_ARRAY.0 | VarType::VT_I4.0);
        assert!(vt.is_array());
        assert!(!vt.is_vector());
        assert!(!vt.is_byref());
        assert_eq!(vt.element(), VarType::VT_I4);
        assert_eq!(VarType::VT_LPWSTR.vector_of().0, 0x101F);
    }

    #[test]
    fn test_fixed_size() {
        assert_eq!(VarType::VT_UI1.fixed_size(), Some(1));
        assert_eq!(VarType::VT_BOOL.fixed_size(), Some(2));
        assert_eq!(VarType::VT_I4.vector_of().fixed_size(), Some(4));
        assert_eq!(VarType::VT_FILETIME.fixed_size(), Some(8));
        assert_eq!(VarType::VT_CLSID.fixed_size(), Some(16));
        assert_eq!(VarType::VT_BSTR.fixed_size(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(VarType::VT_EMPTY.to_string(), "VT_EMPTY");
        assert_eq!(
            VarType(VarType::VT_BYREF.0 | VarType::VT_ARRAY.0 | VarType::VT_VARIANT.0).to_string(),
            "VT_BYREF|VT_ARRAY|VT_VARIANT"
        );
        assert_eq!(VarType(0x0050).to_string(), "VT_0x050");
    }
}
