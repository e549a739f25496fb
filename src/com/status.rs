//! Provides the `HResult` status code and the well-known codes this crate
//! inspects by value.
//!
//! A status code is a signed 32-bit integer. The sign bit alone decides
//! success: `S_FALSE` and other positive codes are successes with
//! qualifications, every negative code is a failure.
//!
//! # Examples
//! ```
//! use comscope::com::status::{HResult, E_FAIL, S_FALSE};
//!
//! assert!(S_FALSE.is_success());
//! assert!(E_FAIL.is_failure());
//! assert_eq!(HResult::from_u32(0x8000_4005), E_FAIL);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::com::result::ComError;

/// Represents a COM status code (`HRESULT`).
///
/// # Examples
/// ```
/// use comscope::com::status::HResult;
///
/// let hr = HResult(-2147467259);
/// assert!(hr.is_failure());
/// assert_eq!(hr.to_string(), "0x80004005");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HResult(pub i32);

impl HResult {
    /// Reinterprets an unsigned literal such as `0x8007_0002` as a status code.
    ///
    /// # Examples
    /// ```
    /// use comscope::com::status::HResult;
    ///
    /// assert_eq!(HResult::from_u32(0x887A_0002).0, -0x7785_FFFE);
    /// ```
    pub const fn from_u32(code: u32) -> Self {
        Self(code as i32)
    }

    /// Builds the failure code wrapping a Win32 error number (`HRESULT_FROM_WIN32`).
    ///
    /// # Examples
    /// ```
    /// use comscope::com::status::HResult;
    ///
    /// // ERROR_FILE_NOT_FOUND
    /// assert_eq!(HResult::from_win32(2), HResult::from_u32(0x8007_0002));
    /// ```
    pub const fn from_win32(error: u32) -> Self {
        if error as i32 <= 0 {
            Self(error as i32)
        } else {
            Self(((error & 0x0000_FFFF) | (FACILITY_WIN32 << 16) | 0x8000_0000) as i32)
        }
    }

    /// Returns `true` when the sign bit is clear.
    pub const fn is_success(self) -> bool {
        self.0 >= 0
    }

    /// Returns `true` when the sign bit is set.
    pub const fn is_failure(self) -> bool {
        self.0 < 0
    }

    /// Returns the facility field (bits 16..=26).
    pub const fn facility(self) -> u32 {
        ((self.0 as u32) >> 16) & 0x1FFF
    }

    /// Returns the low 16 bits, which carry the facility-specific code.
    pub const fn code(self) -> u32 {
        (self.0 as u32) & 0xFFFF
    }

    /// Returns the code as its unsigned bit pattern.
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    /// Converts the code into `Ok(())` for successes and `Err` otherwise.
    ///
    /// # Errors
    /// Returns a [`ComError`] carrying `self` when the code is a failure.
    ///
    /// # Examples
    /// ```
    /// use comscope::com::status::{E_NOTIMPL, S_FALSE};
    ///
    /// assert!(S_FALSE.check().is_ok());
    /// assert_eq!(E_NOTIMPL.check().unwrap_err().hr(), E_NOTIMPL);
    /// ```
    pub fn check(self) -> Result<(), ComError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ComError::new(self))
        }
    }

    /// Returns `self` if it is a failure, otherwise `fallback`.
    ///
    /// Used where an external layer reports failure through a channel that
    /// can also carry a success code.
    pub const fn failure_or(self, fallback: HResult) -> HResult {
        if self.is_failure() {
            self
        } else {
            fallback
        }
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "HResult({name} 0x{:08X})", self.0 as u32),
            None => write!(f, "HResult(0x{:08X})", self.0 as u32),
        }
    }
}

impl From<i32> for HResult {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<HResult> for i32 {
    fn from(hr: HResult) -> Self {
        hr.0
    }
}

#[cfg(windows)]
impl From<windows::core::HRESULT> for HResult {
    fn from(hr: windows::core::HRESULT) -> Self {
        Self(hr.0)
    }
}

#[cfg(windows)]
impl From<HResult> for windows::core::HRESULT {
    fn from(hr: HResult) -> Self {
        windows::core::HRESULT(hr.0)
    }
}

const FACILITY_WIN32: u32 = 7;

pub const S_OK: HResult = HResult(0);
pub const S_FALSE: HResult = HResult(1);
pub const E_NOTIMPL: HResult = HResult::from_u32(0x8000_4001);
pub const E_NOINTERFACE: HResult = HResult::from_u32(0x8000_4002);
pub const E_POINTER: HResult = HResult::from_u32(0x8000_4003);
pub const E_FAIL: HResult = HResult::from_u32(0x8000_4005);
pub const E_UNEXPECTED: HResult = HResult::from_u32(0x8000_FFFF);
pub const E_OUTOFMEMORY: HResult = HResult::from_u32(0x8007_000E);
pub const E_INVALIDARG: HResult = HResult::from_u32(0x8007_0057);
pub const DISP_E_TYPEMISMATCH: HResult = HResult::from_u32(0x8002_0005);
pub const RPC_E_CHANGED_MODE: HResult = HResult::from_u32(0x8001_0106);
pub const DV_E_FORMATETC: HResult = HResult::from_u32(0x8004_0064);
pub const DV_E_TYMED: HResult = HResult::from_u32(0x8004_0069);
/// The object's canonical format equals the one asked about.
pub const DATA_S_SAMEFORMATETC: HResult = HResult::from_u32(0x0004_0130);

impl HResult {
    fn name(self) -> Option<&'static str> {
        Some(match self {
            S_OK => "S_OK",
            S_FALSE => "S_FALSE",
            E_NOTIMPL => "E_NOTIMPL",
            E_NOINTERFACE => "E_NOINTERFACE",
            E_POINTER => "E_POINTER",
            E_FAIL => "E_FAIL",
            E_UNEXPECTED => "E_UNEXPECTED",
            E_OUTOFMEMORY => "E_OUTOFMEMORY",
            E_INVALIDARG => "E_INVALIDARG",
            DISP_E_TYPEMISMATCH => "DISP_E_TYPEMISMATCH",
            RPC_E_CHANGED_MODE => "RPC_E_CHANGED_MODE",
            DV_E_FORMATETC => "DV_E_FORMATETC",
            DV_E_TYMED => "DV_E_TYMED",
            DATA_S_SAMEFORMATETC => "DATA_S_SAMEFORMATETC",
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_bit_decides_success() {
        for code in [0, 1, 2, 0x0004_0000, i32::MAX] {
            assert!(HResult(code).is_success(), "{code} should be success");
        }
        for code in [-1, i32::MIN, E_FAIL.0, E_NOINTERFACE.0] {
            assert!(HResult(code).is_failure(), "{code} should be failure");
        }
    }

    #[test]
    fn test_fields() {
        let hr = HResult::from_u32(0x8007_0005);
        assert_eq!(hr.facility(), 7);
        assert_eq!(hr.code(), 5);
        assert_eq!(E_FAIL.as_u32(), 0x8000_4005);
    }

    #[test]
    fn test_from_win32() {
        assert_eq!(HResult::from_win32(0), S_OK);
        assert_eq!(HResult::from_win32(14), E_OUTOFMEMORY);
    }

    #[test]
    fn test_display_and_debug() {
        assert_eq!(E_FAIL.to_string(), "0x80004005");
        assert_eq!(format!("{:?}", S_FALSE), "HResult(S_FALSE 0x00000001)");
        assert_eq!(format!("{:?}", HResult(0x1234)), "HResult(0x00001234)");
        assert_eq!(format!("{:?}", DV_E_TYMED), "HResult(DV_E_TYMED 0x80040069)");
        assert!(DATA_S_SAMEFORMATETC.is_success());
    }

    #[test]
    fn test_failure_or() {
        assert_eq!(S_OK.failure_or(E_FAIL), E_FAIL);
        assert_eq!(E_POINTER.failure_or(E_FAIL), E_POINTER);
    }
}
