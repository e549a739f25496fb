//! Provides owned global memory handles and scoped locks on them.
//!
//! Global memory still travels through clipboard formats, `STGMEDIUM`s and
//! `CreateStreamOnHGlobal`. A handle must be locked to reach its bytes and
//! unlocked afterwards; [`GlobalMemory::lock`] returns a guard that does the
//! unlock on drop. [`crate::dataobj::StorageMedium::bytes`] reads a medium's
//! `hGlobal` through [`GlobalMemoryLock::with`].
//!
//! # Examples
//! ```no_run
//! use comscope::globalmem::GlobalMemory;
//!
//! let block = GlobalMemory::from_bytes(b"text").value()?;
//! assert_eq!(&block.to_vec()?[..4], b"text");
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::ffi::c_void;

use windows::Win32::Foundation::*;
use windows::Win32::System::Memory::*;

use crate::com::result::{ComError, ComResult};
use crate::com::scoped::{acquire, ExternalResource, Scoped};
use crate::com::status::{HResult, E_FAIL, E_OUTOFMEMORY, S_OK};

/// Allocation flags for [`GlobalMemory::alloc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalFlags {
    /// `GMEM_FIXED | GMEM_ZEROINIT`
    Pointer,
    /// `GMEM_MOVEABLE | GMEM_ZEROINIT`
    Handle,
}

impl GlobalFlags {
    fn to_native(self) -> GLOBAL_ALLOC_FLAGS {
        match self {
            GlobalFlags::Pointer => GMEM_FIXED | GMEM_ZEROINIT,
            GlobalFlags::Handle => GMEM_MOVEABLE | GMEM_ZEROINIT,
        }
    }
}

/// Represents an owned `HGLOBAL`.
pub struct GlobalMemory {
    handle: HGLOBAL,
}

impl GlobalMemory {
    /// Allocates `size` zeroed bytes; the block is freed when the guard drops.
    pub fn alloc(flags: GlobalFlags, size: usize) -> ComResult<Scoped<Self>> {
        match unsafe { GlobalAlloc(flags.to_native(), size) } {
            Ok(handle) if !handle.is_invalid() => ComResult::new(S_OK, Scoped::new(Self { handle })),
            Ok(_) => ComResult::failed(E_OUTOFMEMORY),
            Err(err) => ComResult::failed(HResult::from(err.code()).failure_or(E_OUTOFMEMORY)),
        }
    }

    /// Allocates a movable block holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> ComResult<Scoped<Self>> {
        Self::alloc(GlobalFlags::Handle, bytes.len()).and_then(|memory| {
            let copied = memory.lock_hr().map(|mut lock| {
                lock.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
            });
            copied.map(|()| memory)
        })
    }

    /// Takes ownership of a handle.
    ///
    /// # Safety
    /// `handle` must be a live global memory handle nobody else frees.
    pub unsafe fn from_raw(handle: HGLOBAL) -> Self {
        Self { handle }
    }

    /// Returns the handle, still owned.
    pub fn handle(&self) -> HGLOBAL {
        self.handle
    }

    /// Gives up ownership; the caller becomes responsible for freeing.
    /// Handing a block to `SetClipboardData` or a `STGMEDIUM` goes
    /// through here.
    pub fn into_raw(self) -> HGLOBAL {
        self.handle
    }

    /// Returns the block size in bytes.
    pub fn size(&self) -> usize {
        unsafe { GlobalSize(self.handle) }
    }

    /// Locks the block and returns a guard that unlocks it.
    pub fn lock_hr(&self) -> ComResult<Scoped<GlobalMemoryLock<'_>>> {
        // SAFETY: the borrow of `self` keeps the handle alive for the lock's lifetime.
        match unsafe { GlobalMemoryLock::lock(self.handle) } {
            Ok(lock) => ComResult::ok(Scoped::new(lock)),
            Err(err) => ComResult::failed(err.hr()),
        }
    }

    /// Locks the block and returns a guard that unlocks it.
    ///
    /// # Errors
    /// Returns the `GlobalLock` failure.
    pub fn lock(&self) -> crate::Result<Scoped<GlobalMemoryLock<'_>>> {
        self.lock_hr().value()
    }

    /// Copies the whole block out.
    ///
    /// # Errors
    /// Returns the `GlobalLock` failure.
    pub fn to_vec(&self) -> crate::Result<Vec<u8>> {
        let lock = self.lock()?;
        Ok(lock.as_slice().to_vec())
    }
}

impl ExternalResource for GlobalMemory {
    fn release(&mut self) {
        if !self.handle.is_invalid() {
            if let Err(err) = unsafe { GlobalFree(Some(self.handle)) } {
                tracing::warn!(hr = %HResult::from(err.code()), "GlobalFree failed");
            }
            self.handle = HGLOBAL::default();
        }
    }
}

/// Represents a held `GlobalLock` on a global memory handle.
///
/// Locks taken through [`GlobalMemory::lock`] borrow their owner. Handles
/// this crate does not own, such as the `hGlobal` inside a `STGMEDIUM`, go
/// through the unsafe [`GlobalMemoryLock::lock`] or [`GlobalMemoryLock::with`].
pub struct GlobalMemoryLock<'a> {
    handle: HGLOBAL,
    ptr: *mut u8,
    size: usize,
    _memory: std::marker::PhantomData<&'a GlobalMemory>,
}

impl GlobalMemoryLock<'_> {
    /// Locks `handle`.
    ///
    /// # Safety
    /// `handle` must be a live global memory handle that stays allocated
    /// for as long as the returned lock, or any slice borrowed from it, is
    /// in use. The lifetime of the lock is not tied to the handle's owner.
    ///
    /// # Errors
    /// Returns the `GlobalLock` failure. No unlock is due in that case.
    pub unsafe fn lock(handle: HGLOBAL) -> Result<Self, ComError> {
        let ptr = unsafe { GlobalLock(handle) } as *mut u8;
        if ptr.is_null() {
            let hr = HResult::from_win32(unsafe { GetLastError() }.0);
            return Err(ComError::new(hr.failure_or(E_FAIL)));
        }
        Ok(Self {
            handle,
            ptr,
            size: unsafe { GlobalSize(handle) },
            _memory: std::marker::PhantomData,
        })
    }

    /// Locks a handle owned elsewhere for the duration of `body`.
    ///
    /// # Safety
    /// `handle` must be a live global memory handle that nobody frees while
    /// `body` runs.
    ///
    /// # Errors
    /// Returns the `GlobalLock` failure.
    pub unsafe fn with<T>(handle: HGLOBAL, body: impl FnOnce(&[u8]) -> T) -> crate::Result<T> {
        let lock = acquire(|| ComResult::<GlobalMemoryLock<'_>>::from(unsafe { GlobalMemoryLock::lock(handle) }))?;
        Ok(body(lock.as_slice()))
    }

    /// Returns the locked base address.
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr.cast()
    }

    /// Returns the block size reported by `GlobalSize` at lock time.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Views the locked block.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.size) }
    }
}

impl ExternalResource for GlobalMemoryLock<'_> {
    fn release(&mut self) {
        // GlobalUnlock reports "no longer locked" as an error with NO_ERROR.
        if let Err(err) = unsafe { GlobalUnlock(self.handle) } {
            let hr = HResult::from(err.code());
            if hr.is_failure() {
                tracing::warn!(%hr, "GlobalUnlock failed");
            }
        }
    }
}
