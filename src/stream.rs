//! Provides `ComStream`, a wrapper over `IStream`.
//!
//! Streams come from files (`SHCreateStreamOnFileEx`), from memory
//! (`SHCreateMemStream`) or from any object that narrows to `IStream`.
//!
//! # Examples
//! ```no_run
//! use comscope::stream::{ComStream, SeekOrigin};
//!
//! let stream = ComStream::create_on_memory(None)?;
//! stream.write(b"hello")?;
//! assert_eq!(stream.position()?, 5);
//! assert_eq!(stream.read_all()?, b"hello");
//! assert_eq!(stream.position()?, 5);
//! stream.seek(0, SeekOrigin::Start)?;
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::ops::BitOr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use windows::core::HSTRING;
use windows::Win32::Storage::FileSystem::FILE_ATTRIBUTE_NORMAL;
use windows::Win32::System::Com::*;
use windows::Win32::UI::Shell::*;

use crate::com::narrow::Narrow;
use crate::com::result::{count_u32, ComResult};
use crate::com::scoped::{ExternalResource, Scoped};
use crate::com::status::{HResult, E_FAIL};
use crate::filetime::FileTime;
use crate::guid::Guid;
use crate::mem::TaskMem;

/// `STGM` access and sharing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageMode(pub u32);

impl StorageMode {
    pub const READ: StorageMode = StorageMode(0x0000_0000);
    pub const WRITE: StorageMode = StorageMode(0x0000_0001);
    pub const READWRITE: StorageMode = StorageMode(0x0000_0002);
    pub const SHARE_EXCLUSIVE: StorageMode = StorageMode(0x0000_0010);
    pub const SHARE_DENY_WRITE: StorageMode = StorageMode(0x0000_0020);
    pub const SHARE_DENY_READ: StorageMode = StorageMode(0x0000_0030);
    pub const SHARE_DENY_NONE: StorageMode = StorageMode(0x0000_0040);
    pub const CREATE: StorageMode = StorageMode(0x0000_1000);
    pub const TRANSACTED: StorageMode = StorageMode(0x0001_0000);
    pub const CONVERT: StorageMode = StorageMode(0x0002_0000);
    pub const PRIORITY: StorageMode = StorageMode(0x0004_0000);
    pub const NOSCRATCH: StorageMode = StorageMode(0x0010_0000);
    pub const NOSNAPSHOT: StorageMode = StorageMode(0x0020_0000);
    pub const DIRECT_SWMR: StorageMode = StorageMode(0x0040_0000);
    pub const DELETEONRELEASE: StorageMode = StorageMode(0x0400_0000);
    pub const SIMPLE: StorageMode = StorageMode(0x0800_0000);

    pub const fn contains(self, other: StorageMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for StorageMode {
    type Output = StorageMode;

    fn bitor(self, rhs: StorageMode) -> StorageMode {
        StorageMode(self.0 | rhs.0)
    }
}

/// Origin of a [`ComStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

impl SeekOrigin {
    fn to_native(self) -> STREAM_SEEK {
        match self {
            SeekOrigin::Start => STREAM_SEEK_SET,
            SeekOrigin::Current => STREAM_SEEK_CUR,
            SeekOrigin::End => STREAM_SEEK_END,
        }
    }
}

/// `LOCKTYPE` of a region lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    Write,
    Exclusive,
    OnlyOnce,
}

impl LockType {
    fn to_native(self) -> LOCKTYPE {
        match self {
            LockType::Write => LOCK_WRITE,
            LockType::Exclusive => LOCK_EXCLUSIVE,
            LockType::OnlyOnce => LOCK_ONLYONCE,
        }
    }
}

/// `STGC` commit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitFlags(pub u32);

impl CommitFlags {
    pub const DEFAULT: CommitFlags = CommitFlags(0);
    pub const OVERWRITE: CommitFlags = CommitFlags(1);
    pub const ONLYIFCURRENT: CommitFlags = CommitFlags(2);
    pub const DANGEROUSLYCOMMITMERELYTODISKCACHE: CommitFlags = CommitFlags(4);
    pub const CONSOLIDATE: CommitFlags = CommitFlags(8);
}

/// Storage element metadata returned by [`ComStream::stat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStat {
    /// `None` when requested without a name or when the stream has none.
    pub name: Option<String>,
    /// `STGTY`: 1 storage, 2 stream, 3 lock bytes, 4 property.
    pub kind: u32,
    pub size: u64,
    pub modified: FileTime,
    pub created: FileTime,
    pub accessed: FileTime,
    pub mode: StorageMode,
    pub locks_supported: u32,
    pub clsid: Guid,
    pub state_bits: u32,
}

/// Wraps an `IStream`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComStream {
    inner: IStream,
}

impl ComStream {
    pub fn new(inner: IStream) -> Self {
        Self { inner }
    }

    /// Narrows any object exposing `IStream`.
    ///
    /// # Errors
    /// Returns `E_NOINTERFACE` when `object` is not a stream.
    pub fn from_object<S: Narrow<IStream>>(object: &S) -> crate::Result<Self> {
        object.narrow().map(Self::new)
    }

    pub fn as_interface(&self) -> &IStream {
        &self.inner
    }

    /// Unwraps the interface without releasing it.
    pub fn into_interface(self) -> IStream {
        self.inner
    }

    /// Opens or creates a file-backed stream.
    pub fn create_on_file_hr(path: &Path, mode: StorageMode, creates: bool) -> ComResult<Self> {
        let path = HSTRING::from(path.as_os_str());
        let attributes = FILE_ATTRIBUTE_NORMAL.0;
        let result = unsafe { SHCreateStreamOnFileEx(&path, mode.0, attributes, creates.into(), None::<&IStream>) };
        ComResult::from(result).map(Self::new)
    }

    /// Opens or creates a file-backed stream.
    ///
    /// # Errors
    /// Returns the failure of `SHCreateStreamOnFileEx`, such as
    /// `HRESULT_FROM_WIN32(ERROR_FILE_NOT_FOUND)`.
    pub fn create_on_file(path: &Path, mode: StorageMode, creates: bool) -> crate::Result<Self> {
        Self::create_on_file_hr(path, mode, creates).value()
    }

    /// Opens an existing file for reading.
    pub fn open_file_hr(path: &Path) -> ComResult<Self> {
        Self::create_on_file_hr(path, StorageMode::READ, false)
    }

    /// Opens an existing file for reading.
    ///
    /// # Errors
    /// See [`ComStream::create_on_file`].
    pub fn open_file(path: &Path) -> crate::Result<Self> {
        Self::open_file_hr(path).value()
    }

    /// Creates a growable memory stream, optionally seeded with a copy of
    /// `initial`. The position starts at 0.
    pub fn create_on_memory_hr(initial: Option<&[u8]>) -> ComResult<Self> {
        match unsafe { SHCreateMemStream(initial) } {
            Some(inner) => ComResult::ok(Self::new(inner)),
            None => ComResult::failed(E_FAIL),
        }
    }

    /// Creates a growable memory stream.
    ///
    /// # Errors
    /// Returns `E_FAIL` when the stream cannot be created.
    pub fn create_on_memory(initial: Option<&[u8]>) -> crate::Result<Self> {
        Self::create_on_memory_hr(initial).value()
    }

    /// Reads into `buf` and returns the byte count. `S_FALSE` with a short
    /// count marks the end of the stream.
    pub fn read_hr(&self, buf: &mut [u8]) -> ComResult<usize> {
        let len = match count_u32(buf.len()) {
            Ok(len) => len,
            Err(err) => return ComResult::failed(err.hr()),
        };
        let mut read = 0u32;
        let hr: HResult = unsafe { self.inner.Read(buf.as_mut_ptr().cast(), len, Some(&mut read as *mut u32)) }.into();
        ComResult::new(hr, read as usize)
    }

    /// # Errors
    /// Returns the failure of `ISequentialStream::Read`.
    pub fn read(&self, buf: &mut [u8]) -> crate::Result<usize> {
        self.read_hr(buf).value()
    }

    /// Writes `data` and returns the byte count written.
    pub fn write_hr(&self, data: &[u8]) -> ComResult<usize> {
        let len = match count_u32(data.len()) {
            Ok(len) => len,
            Err(err) => return ComResult::failed(err.hr()),
        };
        let mut written = 0u32;
        let hr: HResult = unsafe { self.inner.Write(data.as_ptr().cast(), len, Some(&mut written as *mut u32)) }.into();
        ComResult::new(hr, written as usize)
    }

    /// # Errors
    /// Returns the failure of `ISequentialStream::Write`.
    pub fn write(&self, data: &[u8]) -> crate::Result<usize> {
        self.write_hr(data).value()
    }

    /// Moves the position and returns the new one.
    pub fn seek_hr(&self, offset: i64, origin: SeekOrigin) -> ComResult<u64> {
        let mut position = 0u64;
        let result = unsafe { self.inner.Seek(offset, origin.to_native(), Some(&mut position as *mut u64)) };
        ComResult::from(result).map(|()| position)
    }

    /// # Errors
    /// Returns the failure of `IStream::Seek`.
    pub fn seek(&self, offset: i64, origin: SeekOrigin) -> crate::Result<u64> {
        self.seek_hr(offset, origin).value()
    }

    /// Returns the current position without moving it.
    pub fn position_hr(&self) -> ComResult<u64> {
        self.seek_hr(0, SeekOrigin::Current)
    }

    /// # Errors
    /// Returns the failure of `IStream::Seek`.
    pub fn position(&self) -> crate::Result<u64> {
        self.position_hr().value()
    }

    /// Seeks to an absolute offset and returns it.
    pub fn set_position_hr(&self, position: u64) -> ComResult<u64> {
        self.seek_hr(position as i64, SeekOrigin::Start)
    }

    /// # Errors
    /// Returns the failure of `IStream::Seek`.
    pub fn set_position(&self, position: u64) -> crate::Result<u64> {
        self.set_position_hr(position).value()
    }

    /// Grows or truncates the stream.
    pub fn set_size_hr(&self, size: u64) -> ComResult<()> {
        unsafe { self.inner.SetSize(size) }.into()
    }

    /// # Errors
    /// Returns the failure of `IStream::SetSize`.
    pub fn set_size(&self, size: u64) -> crate::Result<()> {
        self.set_size_hr(size).value()
    }

    /// Returns the stream size from `Stat`.
    pub fn size_hr(&self) -> ComResult<u64> {
        self.stat_hr(false).map(|stat| stat.size)
    }

    /// # Errors
    /// Returns the failure of `IStream::Stat`.
    pub fn size(&self) -> crate::Result<u64> {
        self.size_hr().value()
    }

    /// Commits a transacted stream; a no-op for direct ones.
    pub fn commit_hr(&self, flags: CommitFlags) -> ComResult<()> {
        unsafe { self.inner.Commit(STGC(flags.0 as i32)) }.into()
    }

    /// # Errors
    /// Returns the failure of `IStream::Commit`.
    pub fn commit(&self, flags: CommitFlags) -> crate::Result<()> {
        self.commit_hr(flags).value()
    }

    /// Discards changes since the last commit.
    pub fn revert_hr(&self) -> ComResult<()> {
        unsafe { self.inner.Revert() }.into()
    }

    /// # Errors
    /// Returns the failure of `IStream::Revert`.
    pub fn revert(&self) -> crate::Result<()> {
        self.revert_hr().value()
    }

    /// Locks `len` bytes at `offset`.
    pub fn lock_region_hr(&self, offset: u64, len: u64, lock: LockType) -> ComResult<()> {
        unsafe { self.inner.LockRegion(offset, len, lock.to_native()) }.into()
    }

    /// # Errors
    /// Returns the failure of `IStream::LockRegion`, commonly
    /// `STG_E_INVALIDFUNCTION` for memory streams.
    pub fn lock_region(&self, offset: u64, len: u64, lock: LockType) -> crate::Result<()> {
        self.lock_region_hr(offset, len, lock).value()
    }

    /// Releases a lock taken with the same range and type.
    pub fn unlock_region_hr(&self, offset: u64, len: u64, lock: LockType) -> ComResult<()> {
        unsafe { self.inner.UnlockRegion(offset, len, lock.to_native().0 as u32) }.into()
    }

    /// # Errors
    /// Returns the failure of `IStream::UnlockRegion`.
    pub fn unlock_region(&self, offset: u64, len: u64, lock: LockType) -> crate::Result<()> {
        self.unlock_region_hr(offset, len, lock).value()
    }

    /// Returns the stream metadata. The name string returned by `Stat` is
    /// task memory and is freed here.
    pub fn stat_hr(&self, with_name: bool) -> ComResult<StorageStat> {
        let mut raw = STATSTG::default();
        let flag = if with_name { STATFLAG_DEFAULT } else { STATFLAG_NONAME };
        if let Err(err) = unsafe { self.inner.Stat(&mut raw, flag) } {
            return ComResult::failed(HResult::from(err.code()));
        }
        let name = Scoped::new(unsafe { TaskMem::from_pwstr(raw.pwcsName) });
        ComResult::ok(StorageStat {
            name: (!name.is_null()).then(|| name.to_string_lossy()),
            kind: raw.r#type,
            size: raw.cbSize,
            modified: raw.mtime.into(),
            created: raw.ctime.into(),
            accessed: raw.atime.into(),
            mode: StorageMode(raw.grfMode.0),
            locks_supported: raw.grfLocksSupported,
            clsid: raw.clsid.into(),
            state_bits: raw.grfStateBits,
        })
    }

    /// # Errors
    /// Returns the failure of `IStream::Stat`.
    pub fn stat(&self, with_name: bool) -> crate::Result<StorageStat> {
        self.stat_hr(with_name).value()
    }

    /// Opens a second stream over the same bytes with its own position.
    pub fn try_clone_hr(&self) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.Clone() }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IStream::Clone`.
    pub fn try_clone(&self) -> crate::Result<Self> {
        self.try_clone_hr().value()
    }

    /// Copies up to `len` bytes from the current position into `dest` and
    /// returns `(read, written)`.
    pub fn copy_to_hr(&self, dest: &ComStream, len: u64) -> ComResult<(u64, u64)> {
        let (mut read, mut written) = (0u64, 0u64);
        let result = unsafe { self.inner.CopyTo(&dest.inner, len, Some(&mut read as *mut u64), Some(&mut written as *mut u64)) };
        ComResult::from(result).map(|()| (read, written))
    }

    /// # Errors
    /// Returns the failure of `IStream::CopyTo`.
    pub fn copy_to(&self, dest: &ComStream, len: u64) -> crate::Result<(u64, u64)> {
        self.copy_to_hr(dest, len).value()
    }

    /// Reads the whole stream from the start. The current position is put
    /// back afterwards, including when a read fails.
    ///
    /// # Errors
    /// Returns the first seek or read failure; partial data is discarded.
    pub fn read_all(&self) -> crate::Result<Vec<u8>> {
        let _restore = Scoped::new(SavedPosition {
            stream: &self.inner,
            position: self.position()?,
        });
        self.set_position(0)?;

        let mut data = Vec::with_capacity(self.size_hr().value_or_none().unwrap_or(0) as usize);
        let mut buf = [0u8; 65536];
        loop {
            let read = self.read(&mut buf)?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&buf[..read]);
        }
        Ok(data)
    }
}

impl From<IStream> for ComStream {
    fn from(inner: IStream) -> Self {
        Self::new(inner)
    }
}

/// Seeks back to a remembered position on release.
struct SavedPosition<'a> {
    stream: &'a IStream,
    position: u64,
}

impl ExternalResource for SavedPosition<'_> {
    fn release(&mut self) {
        if let Err(err) = unsafe { self.stream.Seek(self.position as i64, STREAM_SEEK_SET, None) } {
            tracing::warn!(hr = %HResult::from(err.code()), "failed to restore stream position");
        }
    }
}
