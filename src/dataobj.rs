//! Provides `DataObject`, the `IDataObject` behind the OLE clipboard and
//! drag and drop, and `StorageMedium`, the owner of what `GetData` returns.
//!
//! A `STGMEDIUM` handed out by `GetData` belongs to the caller and must go
//! back through `ReleaseStgMedium` exactly once. [`DataObject::get_data`]
//! returns it inside a [`Scoped`] guard that does that on drop.
//!
//! The clipboard calls need an OLE apartment ([`ComApartment::ole`]).
//!
//! [`ComApartment::ole`]: crate::config::ComApartment::ole
//!
//! # Examples
//! ```no_run
//! use comscope::config::ComApartment;
//! use comscope::dataobj::{DataDirection, DataObject};
//!
//! let _apartment = ComApartment::ole()?;
//! let clipboard = DataObject::clipboard()?;
//! for format in clipboard.formats(DataDirection::Get)? {
//!     let medium = clipboard.get_data(&format)?;
//!     println!("{} {} bytes", format.format.describe(), medium.bytes()?.len());
//! }
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::mem::ManuallyDrop;
use std::path::PathBuf;

use windows::core::{Interface, BOOL};
use windows::Win32::Foundation::HGLOBAL;
use windows::Win32::System::Com::*;
use windows::Win32::System::Ole::{OleFlushClipboard, OleGetClipboard, OleSetClipboard, ReleaseStgMedium};

use crate::clipformat::{ClipboardFormat, FormatEtc, MediumType};
use crate::com::narrow::Narrow;
use crate::com::result::{next_one, ComError, ComResult};
use crate::com::scoped::{ExternalResource, Scoped};
use crate::com::status::{HResult, DV_E_TYMED, E_FAIL, E_POINTER, S_OK};
use crate::globalmem::{GlobalMemory, GlobalMemoryLock};
use crate::mem::TaskMem;
use crate::stream::ComStream;

impl From<&FormatEtc> for FORMATETC {
    fn from(format: &FormatEtc) -> Self {
        FORMATETC {
            cfFormat: format.format.0,
            ptd: std::ptr::null_mut(),
            dwAspect: format.aspect,
            lindex: format.index,
            tymed: format.media.0,
        }
    }
}

/// Copies a received `FORMATETC` out and frees its target device, which
/// the receiver owns.
///
/// # Safety
/// `raw.ptd` must be null or task memory nobody else frees.
unsafe fn take_format(raw: FORMATETC) -> FormatEtc {
    let _device = Scoped::new(unsafe { TaskMem::from_raw(raw.ptd) });
    FormatEtc {
        format: ClipboardFormat(raw.cfFormat),
        aspect: raw.dwAspect,
        index: raw.lindex,
        media: MediumType(raw.tymed),
    }
}

// ---------------------------------------------------------------------------
// StorageMedium
// ---------------------------------------------------------------------------

/// Represents an owned `STGMEDIUM`.
///
/// Released through `ReleaseStgMedium`, which also honors
/// `pUnkForRelease`. Hold it in a [`Scoped`] guard.
pub struct StorageMedium {
    inner: STGMEDIUM,
}

impl StorageMedium {
    /// Takes ownership of a medium returned by an external call.
    ///
    /// # Safety
    /// `inner` must be a valid medium that nobody else releases.
    pub unsafe fn from_raw(inner: STGMEDIUM) -> Self {
        Self { inner }
    }

    /// A `TYMED_NULL` medium.
    pub fn empty() -> Scoped<Self> {
        Scoped::new(Self {
            inner: unsafe { std::mem::zeroed() },
        })
    }

    /// Moves a global memory block into a `TYMED_HGLOBAL` medium.
    pub fn from_global(memory: Scoped<GlobalMemory>) -> Scoped<Self> {
        let mut inner: STGMEDIUM = unsafe { std::mem::zeroed() };
        inner.tymed = MediumType::HGLOBAL.0;
        inner.u.hGlobal = memory.detach().into_raw();
        Scoped::new(Self { inner })
    }

    /// Builds a `TYMED_ISTREAM` medium holding its own reference to `stream`.
    pub fn from_stream(stream: &ComStream) -> Scoped<Self> {
        let mut inner: STGMEDIUM = unsafe { std::mem::zeroed() };
        inner.tymed = MediumType::ISTREAM.0;
        inner.u.pstm = ManuallyDrop::new(Some(stream.as_interface().clone()));
        Scoped::new(Self { inner })
    }

    /// Borrows the raw medium, still owned.
    pub fn as_raw(&self) -> &STGMEDIUM {
        &self.inner
    }

    /// Gives up ownership; the caller becomes responsible for releasing.
    pub fn into_raw(self) -> STGMEDIUM {
        self.inner
    }

    /// Returns the storage kind.
    pub fn media(&self) -> MediumType {
        MediumType(self.inner.tymed)
    }

    /// Returns the memory handle of a `TYMED_HGLOBAL` medium, still owned.
    pub fn global_handle(&self) -> Option<HGLOBAL> {
        (self.media() == MediumType::HGLOBAL).then(|| unsafe { self.inner.u.hGlobal })
    }

    /// Returns a new reference to the stream of a `TYMED_ISTREAM` medium.
    pub fn stream(&self) -> Option<ComStream> {
        if self.media() != MediumType::ISTREAM {
            return None;
        }
        let stream: &Option<IStream> = unsafe { &self.inner.u.pstm };
        stream.clone().map(ComStream::new)
    }

    /// Returns the path of a `TYMED_FILE` medium.
    pub fn file_name(&self) -> Option<PathBuf> {
        if self.media() != MediumType::FILE {
            return None;
        }
        let name = unsafe { self.inner.u.lpszFileName };
        if name.is_null() {
            return None;
        }
        Some(PathBuf::from(String::from_utf16_lossy(unsafe { name.as_wide() })))
    }

    /// Copies the contents out. Global memory is read under a lock, a
    /// stream from its start without moving it, a file from disk.
    pub fn bytes_hr(&self) -> ComResult<Vec<u8>> {
        let media = self.media();
        match media {
            MediumType::NULL => ComResult::ok(Vec::new()),
            MediumType::HGLOBAL => {
                let handle = unsafe { self.inner.u.hGlobal };
                // SAFETY: the medium owns the handle until it is released.
                unsafe { GlobalMemoryLock::with(handle, <[u8]>::to_vec) }.into()
            }
            MediumType::ISTREAM => match self.stream() {
                Some(stream) => stream.read_all().into(),
                None => ComResult::failed(E_POINTER),
            },
            MediumType::FILE => match self.file_name() {
                Some(path) => match std::fs::read(&path) {
                    Ok(bytes) => ComResult::ok(bytes),
                    Err(err) => {
                        tracing::debug!(path = %path.display(), %err, "medium file unreadable");
                        let code = err.raw_os_error().and_then(|c| u32::try_from(c).ok()).unwrap_or(0);
                        ComResult::failed(HResult::from_win32(code).failure_or(E_FAIL))
                    }
                },
                None => ComResult::failed(E_POINTER),
            },
            _ => {
                tracing::debug!(%media, "medium has no byte view");
                ComResult::failed(DV_E_TYMED)
            }
        }
    }

    /// # Errors
    /// Returns `DV_E_TYMED` for GDI, metafile and storage media, or the
    /// lock or read failure.
    pub fn bytes(&self) -> crate::Result<Vec<u8>> {
        self.bytes_hr().value()
    }
}

impl ExternalResource for StorageMedium {
    fn release(&mut self) {
        let owner_set = self.inner.pUnkForRelease.is_some();
        if self.inner.tymed != MediumType::NULL.0 || owner_set {
            unsafe { ReleaseStgMedium(&mut self.inner) };
        }
        self.inner = unsafe { std::mem::zeroed() };
    }
}

impl std::fmt::Debug for StorageMedium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageMedium({})", self.media())
    }
}

// ---------------------------------------------------------------------------
// FormatEtcEnumerator
// ---------------------------------------------------------------------------

/// Wraps an `IEnumFORMATETC`.
#[derive(Clone, Debug)]
pub struct FormatEtcEnumerator {
    inner: IEnumFORMATETC,
}

impl FormatEtcEnumerator {
    pub fn new(inner: IEnumFORMATETC) -> Self {
        Self { inner }
    }

    /// Resets the enumerator and iterates from the first element.
    ///
    /// # Errors
    /// Returns the failure of `IEnumFORMATETC::Reset`.
    pub fn iter(&self) -> crate::Result<FormatEtcIter<'_>> {
        unsafe { self.inner.Reset() }.map_err(ComError::from)?;
        Ok(FormatEtcIter {
            inner: &self.inner,
            done: false,
        })
    }

    /// # Errors
    /// Returns the reset failure or the first `Next` failure.
    pub fn to_vec(&self) -> crate::Result<Vec<FormatEtc>> {
        self.iter()?.collect()
    }

    /// Clones the enumerator at its current position.
    pub fn try_clone_hr(&self) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.Clone() }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IEnumFORMATETC::Clone`.
    pub fn try_clone(&self) -> crate::Result<Self> {
        self.try_clone_hr().value()
    }
}

/// Iterates over an `IEnumFORMATETC`; a failure is yielded once and ends it.
pub struct FormatEtcIter<'a> {
    inner: &'a IEnumFORMATETC,
    done: bool,
}

impl Iterator for FormatEtcIter<'_> {
    type Item = crate::Result<FormatEtc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let inner = self.inner;
        let item = next_one(unsafe { std::mem::zeroed::<FORMATETC>() }, |slot, fetched| {
            unsafe {
                (Interface::vtable(inner).Next)(Interface::as_raw(inner), 1, slot.as_mut_ptr(), fetched as *mut u32)
            }
            .into()
        });
        match item {
            Ok(Some(raw)) => Some(Ok(unsafe { take_format(raw) })),
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
// DataObject
// ---------------------------------------------------------------------------

/// `DATADIR`: formats an object renders, or formats it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    Get = 1,
    Set = 2,
}

/// Wraps `IDataObject`.
#[derive(Clone, Debug)]
pub struct DataObject {
    inner: IDataObject,
}

impl DataObject {
    pub fn new(inner: IDataObject) -> Self {
        Self { inner }
    }

    /// Narrows any object exposing `IDataObject`.
    ///
    /// # Errors
    /// Returns `E_NOINTERFACE` when `object` is not a data object.
    pub fn from_object<S: Narrow<IDataObject>>(object: &S) -> crate::Result<Self> {
        object.narrow().map(Self::new)
    }

    pub fn as_interface(&self) -> &IDataObject {
        &self.inner
    }

    /// Renders `format` into a new medium the caller owns.
    pub fn get_data_hr(&self, format: &FormatEtc) -> ComResult<Scoped<StorageMedium>> {
        let raw = FORMATETC::from(format);
        ComResult::from(unsafe { self.inner.GetData(&raw) })
            .map(|medium| Scoped::new(unsafe { StorageMedium::from_raw(medium) }))
    }

    /// # Errors
    /// Returns the failure of `IDataObject::GetData`, such as
    /// `DV_E_FORMATETC` for a format the object does not render.
    pub fn get_data(&self, format: &FormatEtc) -> crate::Result<Scoped<StorageMedium>> {
        self.get_data_hr(format).value()
    }

    /// `S_OK` means a `GetData` for `format` would succeed.
    pub fn query_get_data_hr(&self, format: &FormatEtc) -> ComResult<bool> {
        let raw = FORMATETC::from(format);
        let hr: HResult = unsafe { (Interface::vtable(&self.inner).QueryGetData)(Interface::as_raw(&self.inner), &raw) }.into();
        ComResult::new(hr, hr == S_OK)
    }

    /// # Errors
    /// Returns the `DV_E_*` code naming the mismatching field.
    pub fn query_get_data(&self, format: &FormatEtc) -> crate::Result<bool> {
        self.query_get_data_hr(format).value()
    }

    /// Returns the format the object treats as equivalent to `format`.
    /// `DATA_S_SAMEFORMATETC` reports that it is `format` itself.
    pub fn canonical_format_hr(&self, format: &FormatEtc) -> ComResult<FormatEtc> {
        let raw = FORMATETC::from(format);
        let mut out: FORMATETC = unsafe { std::mem::zeroed() };
        let hr: HResult = unsafe {
            (Interface::vtable(&self.inner).GetCanonicalFormatEtc)(Interface::as_raw(&self.inner), &raw, &mut out)
        }
        .into();
        if hr.is_failure() {
            return ComResult::failed(hr);
        }
        ComResult::new(hr, unsafe { take_format(out) })
    }

    /// # Errors
    /// Returns the failure of `IDataObject::GetCanonicalFormatEtc`.
    pub fn canonical_format(&self, format: &FormatEtc) -> crate::Result<FormatEtc> {
        self.canonical_format_hr(format).value()
    }

    /// Hands `medium` to the object. On success the object owns it; on
    /// failure it is released here.
    pub fn set_data_hr(&self, format: &FormatEtc, medium: Scoped<StorageMedium>) -> ComResult<()> {
        let raw = FORMATETC::from(format);
        let hr: HResult = unsafe {
            (Interface::vtable(&self.inner).SetData)(
                Interface::as_raw(&self.inner),
                &raw,
                medium.as_raw(),
                BOOL::from(true),
            )
        }
        .into();
        if hr.is_failure() {
            return ComResult::failed(hr);
        }
        let _ = medium.detach().into_raw();
        ComResult::new(hr, ())
    }

    /// # Errors
    /// Returns the failure of `IDataObject::SetData`, commonly `E_NOTIMPL`.
    pub fn set_data(&self, format: &FormatEtc, medium: Scoped<StorageMedium>) -> crate::Result<()> {
        self.set_data_hr(format, medium).value()
    }

    /// Enumerates the formats offered in `direction`.
    pub fn enum_formats_hr(&self, direction: DataDirection) -> ComResult<FormatEtcEnumerator> {
        ComResult::from(unsafe { self.inner.EnumFormatEtc(direction as u32) }).map(FormatEtcEnumerator::new)
    }

    /// # Errors
    /// Returns the failure of `IDataObject::EnumFormatEtc`.
    pub fn enum_formats(&self, direction: DataDirection) -> crate::Result<FormatEtcEnumerator> {
        self.enum_formats_hr(direction).value()
    }

    /// Collects every format in `direction`.
    ///
    /// # Errors
    /// Returns the first enumeration failure.
    pub fn formats(&self, direction: DataDirection) -> crate::Result<Vec<FormatEtc>> {
        self.enum_formats(direction)?.to_vec()
    }

    /// Returns the object currently on the clipboard.
    pub fn clipboard_hr() -> ComResult<Self> {
        ComResult::from(unsafe { OleGetClipboard() }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `OleGetClipboard`, such as
    /// `CO_E_NOTINITIALIZED` outside an OLE apartment.
    pub fn clipboard() -> crate::Result<Self> {
        Self::clipboard_hr().value()
    }

    /// Puts `self` on the clipboard. With `flush` the clipboard renders
    /// every format now and stops depending on this object.
    pub fn set_clipboard_hr(&self, flush: bool) -> ComResult<()> {
        let set = ComResult::from(unsafe { OleSetClipboard(&self.inner) });
        if !set.success() || !flush {
            return set;
        }
        ComResult::from(unsafe { OleFlushClipboard() })
    }

    /// # Errors
    /// Returns the failure of `OleSetClipboard` or `OleFlushClipboard`.
    pub fn set_clipboard(&self, flush: bool) -> crate::Result<()> {
        self.set_clipboard_hr(flush).value()
    }

    /// Empties the clipboard.
    pub fn clear_clipboard_hr() -> ComResult<()> {
        ComResult::from(unsafe { OleSetClipboard(None::<&IDataObject>) })
    }

    /// # Errors
    /// Returns the failure of `OleSetClipboard`.
    pub fn clear_clipboard() -> crate::Result<()> {
        Self::clear_clipboard_hr().value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_etc_to_native() {
        let raw = FORMATETC::from(&FormatEtc::simple(ClipboardFormat::HDROP));
        assert_eq!(raw.cfFormat, 15);
        assert!(raw.ptd.is_null());
        assert_eq!((raw.dwAspect, raw.lindex, raw.tymed), (1, -1, 1));

        let back = unsafe { take_format(raw) };
        assert_eq!(back, FormatEtc::simple(ClipboardFormat::HDROP));
    }

    #[test]
    fn test_empty_medium_has_no_bytes() {
        let medium = StorageMedium::empty();
        assert_eq!(medium.media(), MediumType::NULL);
        assert!(medium.global_handle().is_none());
        assert!(medium.stream().is_none());
        assert_eq!(medium.bytes().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_gdi_medium_is_rejected() {
        let mut inner: STGMEDIUM = unsafe { std::mem::zeroed() };
        inner.tymed = MediumType::GDI.0;
        // A null bitmap; the medium is detached rather than released.
        let medium = unsafe { StorageMedium::from_raw(inner) };
        assert_eq!(medium.bytes_hr().hr(), DV_E_TYMED);
        let _ = medium.into_raw();
    }
}
