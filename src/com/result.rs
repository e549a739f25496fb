//! Provides `ComResult`, the status-tagged return value of every fallible
//! wrapper call, and `ComError`, the single error kind it unwraps into.
//!
//! Each operation has one canonical form returning [`ComResult`] (named
//! `*_hr` on the wrappers) and a thin unwrapping form returning
//! [`crate::Result`]. The unwrapping form is always `self.op_hr().value()`.
//!
//! # Examples
//! ```
//! use comscope::com::result::ComResult;
//! use comscope::com::status::{HResult, S_OK};
//!
//! let ok = ComResult::new(S_OK, 42);
//! assert!(ok.success());
//! assert_eq!(ok.value().unwrap(), 42);
//!
//! let failed = ComResult::new(HResult(-2147467259), ());
//! assert!(!failed.success());
//! assert!(failed.value().is_err());
//! ```

use std::fmt;

use crate::com::status::{HResult, E_FAIL, E_INVALIDARG, E_POINTER, S_OK};

/// Represents a failed COM operation.
///
/// There is one error kind: the operation failed with the carried status
/// code. The `Display` form always contains the raw code.
///
/// # Examples
/// ```
/// use comscope::com::result::ComError;
/// use comscope::com::status::E_NOINTERFACE;
///
/// let err = ComError::new(E_NOINTERFACE);
/// assert_eq!(err.hr(), E_NOINTERFACE);
/// assert!(err.to_string().contains("0x80004002"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("COM operation failed with HRESULT {hr}")]
pub struct ComError {
    hr: HResult,
}

impl ComError {
    /// Wraps a status code. Non-failure codes are recorded as `E_FAIL`.
    pub fn new(hr: HResult) -> Self {
        Self {
            hr: hr.failure_or(E_FAIL),
        }
    }

    /// Returns the carried status code.
    pub fn hr(&self) -> HResult {
        self.hr
    }

    /// Returns the system message text for the code.
    #[cfg(windows)]
    pub fn message(&self) -> String {
        windows::core::Error::from_hresult(self.hr.into()).message()
    }
}

impl From<HResult> for ComError {
    fn from(hr: HResult) -> Self {
        Self::new(hr)
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for ComError {
    fn from(err: windows::core::Error) -> Self {
        Self::new(err.code().into())
    }
}

#[cfg(windows)]
impl From<ComError> for windows::core::Error {
    fn from(err: ComError) -> Self {
        windows::core::Error::from_hresult(err.hr.into())
    }
}

/// Pairs a status code with the value an operation produced.
///
/// The value is meaningful only when [`ComResult::success`] is `true`.
/// A `ComResult` is immutable once built; consume it with
/// [`ComResult::value`] or branch on [`ComResult::success`] first.
///
/// # Examples
/// ```
/// use comscope::com::result::ComResult;
/// use comscope::com::status::{E_FAIL, S_FALSE};
///
/// let partial = ComResult::new(S_FALSE, 3u32);
/// assert!(partial.success());
/// assert_eq!(partial.value_or_none(), Some(3));
///
/// let failed: ComResult<u32> = ComResult::failed(E_FAIL);
/// assert_eq!(failed.value_or_none(), None);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ComResult<T> {
    hr: HResult,
    value: Option<T>,
}

impl<T> ComResult<T> {
    /// Pairs `hr` with `value`. The value is kept even if `hr` is a failure,
    /// which is what an out-parameter holds after a failed call.
    pub fn new(hr: HResult, value: T) -> Self {
        Self {
            hr,
            value: Some(value),
        }
    }

    /// Builds a successful result with `S_OK`.
    pub fn ok(value: T) -> Self {
        Self::new(S_OK, value)
    }

    /// Builds a result that carries no value.
    ///
    /// A success code here has no value to hand out, so it is recorded as
    /// `E_POINTER`.
    pub fn failed(hr: HResult) -> Self {
        Self {
            hr: hr.failure_or(E_POINTER),
            value: None,
        }
    }

    /// Returns the status code.
    pub fn hr(&self) -> HResult {
        self.hr
    }

    /// Returns `true` when the status code is non-negative.
    pub fn success(&self) -> bool {
        self.hr.is_success()
    }

    /// Returns the value after checking the status.
    ///
    /// # Errors
    /// Returns a [`ComError`] carrying the status code when it is a failure.
    pub fn value(self) -> Result<T, ComError> {
        if !self.success() {
            tracing::debug!(hr = %self.hr, "COM call failed");
            return Err(ComError::new(self.hr));
        }
        self.value.ok_or_else(|| ComError::new(E_POINTER))
    }

    /// Returns the value without checking the status.
    ///
    /// # Safety
    /// The caller must have confirmed [`ComResult::success`] beforehand.
    /// Results built through [`ComResult::failed`] hold no value and reading
    /// one here is undefined behavior.
    pub unsafe fn value_unchecked(self) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { self.value.unwrap_unchecked() }
    }

    /// Returns the value on success and `None` on failure.
    pub fn value_or_none(self) -> Option<T> {
        if self.success() {
            self.value
        } else {
            None
        }
    }

    /// Returns `Err` on failure without consuming the value.
    ///
    /// # Errors
    /// Returns a [`ComError`] carrying the status code when it is a failure.
    pub fn check(&self) -> Result<(), ComError> {
        self.hr.check()
    }

    /// Builds the error for this status unconditionally.
    pub fn to_error(&self) -> ComError {
        ComError::new(self.hr)
    }

    /// Borrows the value while keeping the status.
    pub fn as_ref(&self) -> ComResult<&T> {
        ComResult {
            hr: self.hr,
            value: self.value.as_ref(),
        }
    }

    /// Maps the value while keeping the status.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ComResult<U> {
        ComResult {
            hr: self.hr,
            value: self.value.map(f),
        }
    }

    /// Chains a second operation that only runs when this one succeeded.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> ComResult<U>) -> ComResult<U> {
        if !self.success() {
            return ComResult::failed(self.hr);
        }
        match self.value {
            Some(value) => f(value),
            None => ComResult::failed(E_POINTER),
        }
    }
}

impl<T> From<Result<T, ComError>> for ComResult<T> {
    fn from(result: Result<T, ComError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => Self::failed(err.hr()),
        }
    }
}

/// Converts a `windows` call result. An `Err` carrying a success code (the
/// crate reports a null out-interface that way) is recorded as `E_FAIL`.
#[cfg(windows)]
impl<T> From<windows::core::Result<T>> for ComResult<T> {
    fn from(result: windows::core::Result<T>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => Self::failed(HResult::from(err.code()).failure_or(E_FAIL)),
        }
    }
}

/// Converts a buffer length or element count to the `u32` count COM
/// calls take. Counts past `u32::MAX` fail with `E_INVALIDARG`.
///
/// # Errors
/// Returns `E_INVALIDARG` when `len` does not fit in a `u32`.
pub fn count_u32(len: usize) -> Result<u32, ComError> {
    u32::try_from(len).map_err(|_| {
        tracing::debug!(len, "count does not fit in a u32");
        ComError::new(E_INVALIDARG)
    })
}

/// Runs one `Next` call for a single element. `Ok(None)` marks the end.
pub(crate) fn next_one<T>(empty: T, next: impl FnOnce(&mut [T], &mut u32) -> HResult) -> crate::Result<Option<T>> {
    let mut slot = [empty];
    let mut fetched = 0u32;
    let hr = next(&mut slot, &mut fetched);
    if hr.is_failure() {
        return Err(ComError::new(hr));
    }
    if fetched == 0 {
        return Ok(None);
    }
    let [value] = slot;
    Ok(Some(value))
}

impl<T: fmt::Debug> fmt::Debug for ComResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "ComResult(hr:{}, value:{:?})", self.hr, value),
            None => write!(f, "ComResult(hr:{}, value:<none>)", self.hr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::com::status::{E_UNEXPECTED, S_FALSE};

    #[test]
    fn test_success_follows_sign() {
        for code in [0, 1, 0x7FFF_FFFF] {
            assert!(ComResult::new(HResult(code), ()).success());
        }
        for code in [-1, i32::MIN, -2147467259] {
            assert!(!ComResult::new(HResult(code), ()).success());
        }
    }

    #[test]
    fn test_value_raises_only_on_failure() {
        assert_eq!(ComResult::new(S_OK, 42).value(), Ok(42));
        assert_eq!(ComResult::new(S_FALSE, 7).value(), Ok(7));

        let err = ComResult::new(HResult(-2147467259), None::<u32>).value().unwrap_err();
        assert_eq!(err.hr(), E_FAIL);
    }

    #[test]
    fn test_value_unchecked_matches_value() {
        let result = ComResult::new(S_OK, String::from("moniker"));
        let checked = result.clone().value().unwrap();
        let unchecked = unsafe { result.value_unchecked() };
        assert_eq!(checked, unchecked);
    }

    #[test]
    fn test_failed_without_value() {
        let result: ComResult<u8> = ComResult::failed(E_INVALIDARG);
        assert_eq!(result.hr(), E_INVALIDARG);
        assert_eq!(result.value().unwrap_err().hr(), E_INVALIDARG);

        // A success code with nothing to return is not a success.
        let empty: ComResult<u8> = ComResult::failed(S_OK);
        assert!(!empty.success());
    }

    #[test]
    fn test_map_and_then() {
        let len = ComResult::new(S_FALSE, "abc").map(str::len);
        assert_eq!(len.hr(), S_FALSE);
        assert_eq!(len.value(), Ok(3));

        let chained = ComResult::ok(2).and_then(|x| ComResult::new(E_UNEXPECTED, x * 2));
        assert_eq!(chained.hr(), E_UNEXPECTED);

        let skipped = ComResult::<i32>::failed(E_FAIL).and_then(|_| -> ComResult<i32> {
            panic!("must not run after a failure")
        });
        assert_eq!(skipped.hr(), E_FAIL);
    }

    #[test]
    fn test_check_and_to_error() {
        let result = ComResult::new(E_UNEXPECTED, 1);
        assert_eq!(result.check(), Err(ComError::new(E_UNEXPECTED)));
        assert_eq!(result.to_error().hr(), E_UNEXPECTED);
        assert_eq!(ComResult::ok(1).to_error().hr(), E_FAIL);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", ComResult::ok(5)), "ComResult(hr:0x00000000, value:5)");
        assert_eq!(
            format!("{:?}", ComResult::<i32>::failed(E_FAIL)),
            "ComResult(hr:0x80004005, value:<none>)"
        );
    }

    #[test]
    fn test_error_message_contains_code() {
        let msg = ComError::new(HResult(-2147467259)).to_string();
        assert_eq!(msg, "COM operation failed with HRESULT 0x80004005");
    }

    #[test]
    fn test_count_u32_bounds() {
        assert_eq!(count_u32(0), Ok(0));
        assert_eq!(count_u32(u32::MAX as usize), Ok(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_count_u32_rejects_oversized() {
        let err = count_u32(u32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.hr(), E_INVALIDARG);
        assert_eq!(count_u32(usize::MAX).unwrap_err().hr(), E_INVALIDARG);
    }

    #[test]
    fn test_next_one_end_and_failure() {
        let end = next_one(0u32, |_, fetched| {
            *fetched = 0;
            S_FALSE
        });
        assert!(matches!(end, Ok(None)));
        let failed = next_one(0u32, |_, _| E_FAIL);
        assert!(failed.is_err());
        let one = next_one(0u32, |slot, fetched| {
            slot[0] = 7;
            *fetched = 1;
            S_OK
        });
        assert_eq!(one.ok().flatten(), Some(7));
    }
}
