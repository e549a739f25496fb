//! Provides `TaskMem`, ownership of blocks from the COM task allocator.
//!
//! Many calls return strings or arrays the caller must free with
//! `CoTaskMemFree`. Wrapping the returned pointer in a [`Scoped`] `TaskMem`
//! frees it when the scope ends, after the contents have been copied out.

use std::ffi::c_void;
use std::marker::PhantomData;

use windows::core::{PCWSTR, PWSTR};
use windows::Win32::System::Com::{CoTaskMemAlloc, CoTaskMemFree};

use crate::com::result::ComResult;
use crate::com::scoped::{ExternalResource, Scoped};
use crate::com::status::{E_OUTOFMEMORY, S_OK};

/// Represents one task-allocated block holding `T`s.
///
/// A null pointer is allowed and releasing it is a no-op.
pub struct TaskMem<T = c_void> {
    ptr: *mut T,
    _owns: PhantomData<T>,
}

impl<T> TaskMem<T> {
    /// Takes ownership of a block returned by an external call.
    ///
    /// # Safety
    /// `ptr` must be null or come from the COM task allocator, and nobody
    /// else may free it.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    /// Allocates `bytes` bytes, freed when the returned guard drops.
    pub fn alloc_bytes(bytes: usize) -> ComResult<Scoped<Self>> {
        let ptr = unsafe { CoTaskMemAlloc(bytes) } as *mut T;
        if ptr.is_null() {
            ComResult::failed(E_OUTOFMEMORY)
        } else {
            ComResult::new(S_OK, Scoped::new(Self { ptr, _owns: PhantomData }))
        }
    }

    /// Returns the raw pointer, still owned.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// `true` once freed, detached or never allocated.
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Gives up ownership; the caller becomes responsible for freeing.
    ///
    /// Used to hand a block to a structure that takes it over, such as the
    /// string payload of a `PROPVARIANT`. Detach the [`Scoped`] guard first.
    pub fn into_raw(self) -> *mut T {
        self.ptr
    }
}

impl TaskMem<u16> {
    /// Copies `s` into a NUL-terminated UTF-16 block.
    pub fn alloc_wide_str(s: &str) -> ComResult<Scoped<Self>> {
        let wide: Vec<u16> = s.encode_utf16().chain(Some(0)).collect();
        Self::alloc_bytes(wide.len() * std::mem::size_of::<u16>()).map(|block| {
            unsafe { std::ptr::copy_nonoverlapping(wide.as_ptr(), block.ptr, wide.len()) };
            block
        })
    }

    /// Takes ownership of a task-allocated wide string.
    ///
    /// # Safety
    /// Same contract as [`TaskMem::from_raw`].
    pub unsafe fn from_pwstr(s: PWSTR) -> Self {
        unsafe { Self::from_raw(s.0) }
    }

    /// Copies the NUL-terminated contents out. A null block reads as `""`.
    pub fn to_string_lossy(&self) -> String {
        if self.ptr.is_null() {
            return String::new();
        }
        unsafe { String::from_utf16_lossy(PCWSTR(self.ptr as *const u16).as_wide()) }
    }
}

impl<T> ExternalResource for TaskMem<T> {
    fn release(&mut self) {
        if !self.ptr.is_null() {
            unsafe { CoTaskMemFree(Some(self.ptr as *const c_void)) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Guards a task-allocated wide string returned by an external call and
/// copies it out.
///
/// # Safety
/// See [`TaskMem::from_raw`].
pub(crate) unsafe fn take_task_string(s: PWSTR) -> String {
    let block = Scoped::new(unsafe { TaskMem::from_pwstr(s) });
    block.to_string_lossy()
}
