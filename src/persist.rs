//! Provides wrappers for `IPersist`, `IPersistFile` and `IPersistStream`.
//!
//! [`PersistCapability::from_object`] narrows an object to the most specific
//! persistence capability it exposes: file first, then stream, then plain
//! `IPersist`.
//!
//! # Examples
//! ```no_run
//! use comscope::config::ComApartment;
//! use comscope::moniker::Moniker;
//! use comscope::persist::PersistCapability;
//!
//! let _apartment = ComApartment::single_threaded()?;
//! let moniker = Moniker::create_item("!", "part")?;
//! match PersistCapability::from_object(moniker.as_interface())? {
//!     PersistCapability::Stream(stream) => println!("{:?}", stream.size_max()?),
//!     other => println!("{}", other.class_id()?),
//! }
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::path::Path;

use windows::core::{Interface, HSTRING, PCWSTR};
use windows::Win32::System::Com::*;

use crate::com::narrow::Narrow;
use crate::com::result::{ComError, ComResult};
use crate::com::status::{HResult, E_NOINTERFACE, S_OK};
use crate::guid::Guid;
use crate::mem::take_task_string;
use crate::stream::{ComStream, StorageMode};

fn dirty_flag(hr: HResult) -> ComResult<bool> {
    ComResult::new(hr, hr == S_OK)
}

// ---------------------------------------------------------------------------
// Persist
// ---------------------------------------------------------------------------

/// Wraps `IPersist`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persist {
    inner: IPersist,
}

impl Persist {
    pub fn new(inner: IPersist) -> Self {
        Self { inner }
    }

    /// # Errors
    /// Returns `E_NOINTERFACE` when `object` does not expose `IPersist`.
    pub fn from_object<S: Narrow<IPersist>>(object: &S) -> crate::Result<Self> {
        object.narrow().map(Self::new)
    }

    pub fn as_interface(&self) -> &IPersist {
        &self.inner
    }

    /// Returns the CLSID of the object.
    pub fn class_id_hr(&self) -> ComResult<Guid> {
        ComResult::from(unsafe { self.inner.GetClassID() }).map(Guid::from)
    }

    /// # Errors
    /// Returns the failure of `IPersist::GetClassID`.
    pub fn class_id(&self) -> crate::Result<Guid> {
        self.class_id_hr().value()
    }
}

// ---------------------------------------------------------------------------
// PersistFile
// ---------------------------------------------------------------------------

/// Wraps `IPersistFile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistFile {
    inner: IPersistFile,
}

impl PersistFile {
    pub fn new(inner: IPersistFile) -> Self {
        Self { inner }
    }

    /// # Errors
    /// Returns `E_NOINTERFACE` when `object` does not expose `IPersistFile`.
    pub fn from_object<S: Narrow<IPersistFile>>(object: &S) -> crate::Result<Self> {
        object.narrow().map(Self::new)
    }

    pub fn as_interface(&self) -> &IPersistFile {
        &self.inner
    }

    /// Returns the CLSID of the object.
    pub fn class_id_hr(&self) -> ComResult<Guid> {
        ComResult::from(unsafe { self.inner.GetClassID() }).map(Guid::from)
    }

    /// # Errors
    /// Returns the failure of `IPersist::GetClassID`.
    pub fn class_id(&self) -> crate::Result<Guid> {
        self.class_id_hr().value()
    }

    /// `S_OK` means unsaved changes, `S_FALSE` none.
    pub fn is_dirty_hr(&self) -> ComResult<bool> {
        dirty_flag(unsafe { self.inner.IsDirty() }.into())
    }

    /// # Errors
    /// Returns the failure of `IPersistFile::IsDirty`.
    pub fn is_dirty(&self) -> crate::Result<bool> {
        self.is_dirty_hr().value()
    }

    /// Loads the object from `path`, opened with `mode`.
    pub fn load_hr(&self, path: &Path, mode: StorageMode) -> ComResult<()> {
        unsafe { self.inner.Load(&HSTRING::from(path), STGM(mode.0)) }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistFile::Load`.
    pub fn load(&self, path: &Path, mode: StorageMode) -> crate::Result<()> {
        self.load_hr(path, mode).value()
    }

    /// Saves to `path`, or to the current file when `path` is `None`.
    /// `remember` makes `path` the new current file.
    pub fn save_hr(&self, path: Option<&Path>, remember: bool) -> ComResult<()> {
        let path = path.map(HSTRING::from);
        let name = match &path {
            Some(path) => PCWSTR(path.as_ptr()),
            None => PCWSTR::null(),
        };
        unsafe { self.inner.Save(name, remember.into()) }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistFile::Save`.
    pub fn save(&self, path: Option<&Path>, remember: bool) -> crate::Result<()> {
        self.save_hr(path, remember).value()
    }

    /// Tells the object that the caller finished saving to `path`.
    pub fn save_completed_hr(&self, path: &Path) -> ComResult<()> {
        unsafe { self.inner.SaveCompleted(&HSTRING::from(path)) }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistFile::SaveCompleted`.
    pub fn save_completed(&self, path: &Path) -> crate::Result<()> {
        self.save_completed_hr(path).value()
    }

    /// Returns the current file, or the default prompt name with `S_FALSE`
    /// when none is set.
    pub fn current_file_hr(&self) -> ComResult<String> {
        ComResult::from(unsafe { self.inner.GetCurFile() }).map(|name| unsafe { take_task_string(name) })
    }

    /// # Errors
    /// Returns the failure of `IPersistFile::GetCurFile`.
    pub fn current_file(&self) -> crate::Result<String> {
        self.current_file_hr().value()
    }
}

// ---------------------------------------------------------------------------
// PersistStream
// ---------------------------------------------------------------------------

/// Wraps `IPersistStream`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistStream {
    inner: IPersistStream,
}

impl PersistStream {
    pub fn new(inner: IPersistStream) -> Self {
        Self { inner }
    }

    /// # Errors
    /// Returns `E_NOINTERFACE` when `object` does not expose `IPersistStream`.
    pub fn from_object<S: Narrow<IPersistStream>>(object: &S) -> crate::Result<Self> {
        object.narrow().map(Self::new)
    }

    pub fn as_interface(&self) -> &IPersistStream {
        &self.inner
    }

    /// Returns the CLSID of the object.
    pub fn class_id_hr(&self) -> ComResult<Guid> {
        ComResult::from(unsafe { self.inner.GetClassID() }).map(Guid::from)
    }

    /// # Errors
    /// Returns the failure of `IPersist::GetClassID`.
    pub fn class_id(&self) -> crate::Result<Guid> {
        self.class_id_hr().value()
    }

    /// `S_OK` means unsaved changes, `S_FALSE` none.
    pub fn is_dirty_hr(&self) -> ComResult<bool> {
        dirty_flag(unsafe { self.inner.IsDirty() }.into())
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::IsDirty`.
    pub fn is_dirty(&self) -> crate::Result<bool> {
        self.is_dirty_hr().value()
    }

    /// Loads the object from the current position of `stream`.
    pub fn load_hr(&self, stream: &ComStream) -> ComResult<()> {
        unsafe { self.inner.Load(stream.as_interface()) }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::Load`.
    pub fn load(&self, stream: &ComStream) -> crate::Result<()> {
        self.load_hr(stream).value()
    }

    /// Saves the object at the current position of `stream`.
    pub fn save_hr(&self, stream: &ComStream, clear_dirty: bool) -> ComResult<()> {
        unsafe { self.inner.Save(stream.as_interface(), clear_dirty.into()) }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::Save`.
    pub fn save(&self, stream: &ComStream, clear_dirty: bool) -> crate::Result<()> {
        self.save_hr(stream, clear_dirty).value()
    }

    /// Upper bound of the bytes [`PersistStream::save`] writes.
    pub fn size_max_hr(&self) -> ComResult<u64> {
        unsafe { self.inner.GetSizeMax() }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::GetSizeMax`.
    pub fn size_max(&self) -> crate::Result<u64> {
        self.size_max_hr().value()
    }
}

// ---------------------------------------------------------------------------
// PersistCapability
// ---------------------------------------------------------------------------

/// The most specific persistence capability an object exposes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistCapability {
    File(PersistFile),
    Stream(PersistStream),
    Plain(Persist),
}

impl PersistCapability {
    /// Narrows `object` to `IPersistFile`, then `IPersistStream`, then
    /// `IPersist`.
    ///
    /// # Errors
    /// Returns `E_NOINTERFACE` when the object exposes none of them, or the
    /// first failure that is not `E_NOINTERFACE`.
    pub fn from_object<S: Interface>(object: &S) -> crate::Result<Self> {
        match Narrow::<IPersistFile>::narrow(object) {
            Ok(file) => return Ok(PersistCapability::File(PersistFile::new(file))),
            Err(err) if err.hr() != E_NOINTERFACE => return Err(err),
            Err(_) => {}
        }
        match Narrow::<IPersistStream>::narrow(object) {
            Ok(stream) => return Ok(PersistCapability::Stream(PersistStream::new(stream))),
            Err(err) if err.hr() != E_NOINTERFACE => return Err(err),
            Err(_) => {}
        }
        Narrow::<IPersist>::narrow(object)
            .map(|plain| PersistCapability::Plain(Persist::new(plain)))
            .inspect_err(|err: &ComError| tracing::debug!(hr = %err.hr(), "object exposes no persistence"))
    }

    /// Returns the CLSID of the object.
    pub fn class_id_hr(&self) -> ComResult<Guid> {
        match self {
            PersistCapability::File(file) => file.class_id_hr(),
            PersistCapability::Stream(stream) => stream.class_id_hr(),
            PersistCapability::Plain(plain) => plain.class_id_hr(),
        }
    }

    /// # Errors
    /// Returns the failure of `IPersist::GetClassID`.
    pub fn class_id(&self) -> crate::Result<Guid> {
        self.class_id_hr().value()
    }

    /// Returns the base `IPersist` view of any capability.
    pub fn as_persist(&self) -> Persist {
        match self {
            PersistCapability::File(file) => Persist::new(file.inner.clone().into()),
            PersistCapability::Stream(stream) => Persist::new(stream.inner.clone().into()),
            PersistCapability::Plain(plain) => plain.clone(),
        }
    }
}
