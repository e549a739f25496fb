//! Provides wrappers for monikers, moniker enumeration, bind contexts and the
//! running object table.
//!
//! `IMoniker::Enum` is allowed to report success without handing out an
//! enumerator when a moniker has no components. [`Moniker::enum_forward_hr`]
//! and [`Moniker::enum_backward_hr`] report that case as `E_FAIL` so a
//! successful result always carries a usable enumerator.
//!
//! # Examples
//! ```no_run
//! use comscope::config::ComApartment;
//! use comscope::moniker::Moniker;
//!
//! let _apartment = ComApartment::single_threaded()?;
//! let moniker = Moniker::create_file(r"C:\Windows\notepad.exe")?;
//! println!("{}", moniker.display_name()?);
//! # Ok::<(), comscope::com::result::ComError>(())
//! ```

use std::ffi::c_void;

use windows::core::{IUnknown, Interface, HSTRING, PWSTR};
use windows::Win32::System::Com::*;

use crate::com::result::{ComError, ComResult};
use crate::com::status::{HResult, E_FAIL, S_FALSE, S_OK};
use crate::filetime::FileTime;
use crate::guid::Guid;
use crate::mem::take_task_string;
use crate::stream::ComStream;

/// `MKSYS` kinds reported by [`Moniker::system_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonikerSystem {
    None,
    GenericComposite,
    File,
    Anti,
    Item,
    Pointer,
    Class,
    ObjRef,
    Session,
    Lua,
    Other(u32),
}

impl From<u32> for MonikerSystem {
    fn from(value: u32) -> Self {
        match value {
            0 => MonikerSystem::None,
            1 => MonikerSystem::GenericComposite,
            2 => MonikerSystem::File,
            3 => MonikerSystem::Anti,
            4 => MonikerSystem::Item,
            5 => MonikerSystem::Pointer,
            7 => MonikerSystem::Class,
            8 => MonikerSystem::ObjRef,
            9 => MonikerSystem::Session,
            10 => MonikerSystem::Lua,
            other => MonikerSystem::Other(other),
        }
    }
}

/// Maps a call that fills an optional out-interface to a `ComResult`.
fn out_interface<T>(result: windows::core::Result<()>, out: Option<T>) -> ComResult<T> {
    match (result, out) {
        (Ok(()), Some(value)) => ComResult::ok(value),
        (Ok(()), None) => ComResult::failed(E_FAIL),
        (Err(err), _) => ComResult::failed(HResult::from(err.code())),
    }
}

// ---------------------------------------------------------------------------
// Moniker
// ---------------------------------------------------------------------------

/// Wraps an `IMoniker`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Moniker {
    inner: IMoniker,
}

impl Moniker {
    /// Wraps an existing moniker.
    pub fn new(inner: IMoniker) -> Self {
        Self { inner }
    }

    pub fn as_interface(&self) -> &IMoniker {
        &self.inner
    }

    /// Creates a file moniker for `path`.
    pub fn create_file_hr(path: &str) -> ComResult<Self> {
        ComResult::from(unsafe { CreateFileMoniker(&HSTRING::from(path)) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CreateFileMoniker`.
    pub fn create_file(path: &str) -> crate::Result<Self> {
        Self::create_file_hr(path).value()
    }

    /// Creates an item moniker naming `item` after `delimiter`.
    pub fn create_item_hr(delimiter: &str, item: &str) -> ComResult<Self> {
        ComResult::from(unsafe { CreateItemMoniker(&HSTRING::from(delimiter), &HSTRING::from(item)) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CreateItemMoniker`.
    pub fn create_item(delimiter: &str, item: &str) -> crate::Result<Self> {
        Self::create_item_hr(delimiter, item).value()
    }

    /// Creates a class moniker for `clsid`.
    pub fn create_class_hr(clsid: Guid) -> ComResult<Self> {
        let clsid = windows::core::GUID::from(clsid);
        ComResult::from(unsafe { CreateClassMoniker(&clsid) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CreateClassMoniker`.
    pub fn create_class(clsid: Guid) -> crate::Result<Self> {
        Self::create_class_hr(clsid).value()
    }

    /// Creates a pointer moniker wrapping a live object.
    pub fn create_pointer_hr(object: &IUnknown) -> ComResult<Self> {
        ComResult::from(unsafe { CreatePointerMoniker(object) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CreatePointerMoniker`.
    pub fn create_pointer(object: &IUnknown) -> crate::Result<Self> {
        Self::create_pointer_hr(object).value()
    }

    /// Creates an OBJREF moniker for a live object.
    pub fn create_objref_hr(object: &IUnknown) -> ComResult<Self> {
        ComResult::from(unsafe { CreateObjrefMoniker(object) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CreateObjrefMoniker`.
    pub fn create_objref(object: &IUnknown) -> crate::Result<Self> {
        Self::create_objref_hr(object).value()
    }

    /// Composes `first` and `rest` into a generic composite.
    pub fn compose_hr(first: &Moniker, rest: &Moniker) -> ComResult<Self> {
        ComResult::from(unsafe { CreateGenericComposite(&first.inner, &rest.inner) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CreateGenericComposite`.
    pub fn compose(first: &Moniker, rest: &Moniker) -> crate::Result<Self> {
        Self::compose_hr(first, rest).value()
    }

    /// Composes `self` with `right`, letting the moniker class pick the form.
    pub fn compose_with_hr(&self, right: &Moniker, only_if_not_generic: bool) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.ComposeWith(&right.inner, only_if_not_generic.into()) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IMoniker::ComposeWith`, such as
    /// `MK_E_NEEDGENERIC`.
    pub fn compose_with(&self, right: &Moniker, only_if_not_generic: bool) -> crate::Result<Self> {
        self.compose_with_hr(right, only_if_not_generic).value()
    }

    /// Parses a display name with `MkParseDisplayName` and returns the
    /// moniker plus the count of characters consumed.
    pub fn from_display_name_hr(bind_ctx: &BindCtx, name: &str) -> ComResult<(Self, u32)> {
        let mut eaten = 0u32;
        let mut out = None;
        let result = unsafe { MkParseDisplayName(&bind_ctx.inner, &HSTRING::from(name), &mut eaten, &mut out) };
        out_interface(result, out).map(|inner| (Self::new(inner), eaten))
    }

    /// # Errors
    /// Returns the failure of `MkParseDisplayName`, such as
    /// `MK_E_SYNTAX`.
    pub fn from_display_name(bind_ctx: &BindCtx, name: &str) -> crate::Result<(Self, u32)> {
        Self::from_display_name_hr(bind_ctx, name).value()
    }

    /// Parses the rest of a display name relative to this moniker.
    pub fn parse_display_name_hr(
        &self,
        bind_ctx: &BindCtx,
        left: Option<&Moniker>,
        name: &str,
    ) -> ComResult<(Self, u32)> {
        let mut eaten = 0u32;
        let mut out = None;
        let result = unsafe {
            self.inner.ParseDisplayName(
                &bind_ctx.inner,
                left.map(|m| &m.inner),
                &HSTRING::from(name),
                &mut eaten,
                &mut out,
            )
        };
        out_interface(result, out).map(|inner| (Self::new(inner), eaten))
    }

    /// # Errors
    /// Returns the failure of `IMoniker::ParseDisplayName`.
    pub fn parse_display_name(
        &self,
        bind_ctx: &BindCtx,
        left: Option<&Moniker>,
        name: &str,
    ) -> crate::Result<(Self, u32)> {
        self.parse_display_name_hr(bind_ctx, left, name).value()
    }

    /// Returns the class id the moniker persists under.
    pub fn class_id_hr(&self) -> ComResult<Guid> {
        ComResult::from(unsafe { self.inner.GetClassID() }).map(Guid::from)
    }

    /// # Errors
    /// Returns the failure of `IPersist::GetClassID`.
    pub fn class_id(&self) -> crate::Result<Guid> {
        self.class_id_hr().value()
    }

    /// `S_OK` means dirty, `S_FALSE` clean.
    pub fn is_dirty_hr(&self) -> ComResult<bool> {
        let hr: HResult = unsafe { self.inner.IsDirty() }.into();
        ComResult::new(hr, hr == S_OK)
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::IsDirty`.
    pub fn is_dirty(&self) -> crate::Result<bool> {
        self.is_dirty_hr().value()
    }

    /// Writes the moniker to `stream`.
    pub fn save_hr(&self, stream: &ComStream, clear_dirty: bool) -> ComResult<()> {
        unsafe { self.inner.Save(stream.as_interface(), clear_dirty.into()) }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::Save`.
    pub fn save(&self, stream: &ComStream, clear_dirty: bool) -> crate::Result<()> {
        self.save_hr(stream, clear_dirty).value()
    }

    /// Reads the moniker state back from `stream`.
    pub fn load_hr(&self, stream: &ComStream) -> ComResult<()> {
        unsafe { self.inner.Load(stream.as_interface()) }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::Load`.
    pub fn load(&self, stream: &ComStream) -> crate::Result<()> {
        self.load_hr(stream).value()
    }

    /// Returns the upper bound of the persisted size in bytes.
    pub fn size_max_hr(&self) -> ComResult<u64> {
        unsafe { self.inner.GetSizeMax() }.into()
    }

    /// # Errors
    /// Returns the failure of `IPersistStream::GetSizeMax`.
    pub fn size_max(&self) -> crate::Result<u64> {
        self.size_max_hr().value()
    }

    /// Returns the display name, using a fresh bind context.
    pub fn display_name_hr(&self) -> ComResult<String> {
        BindCtx::create_hr().and_then(|bind_ctx| self.display_name_with_hr(&bind_ctx, None))
    }

    /// # Errors
    /// Returns the failure of `CreateBindCtx` or `IMoniker::GetDisplayName`.
    pub fn display_name(&self) -> crate::Result<String> {
        self.display_name_hr().value()
    }

    /// Returns the display name relative to `left`. The task-allocated
    /// result is freed after copying.
    pub fn display_name_with_hr(&self, bind_ctx: &BindCtx, left: Option<&Moniker>) -> ComResult<String> {
        ComResult::from(unsafe { self.inner.GetDisplayName(&bind_ctx.inner, left.map(|m| &m.inner)) })
            .map(|name: PWSTR| unsafe { take_task_string(name) })
    }

    /// # Errors
    /// Returns the failure of `IMoniker::GetDisplayName`.
    pub fn display_name_with(&self, bind_ctx: &BindCtx, left: Option<&Moniker>) -> crate::Result<String> {
        self.display_name_with_hr(bind_ctx, left).value()
    }

    fn enum_components(&self, forward: bool) -> ComResult<MonikerEnumerator> {
        let mut raw: *mut c_void = std::ptr::null_mut();
        // Called through the vtable to see the out-pointer as returned.
        let hr: HResult = unsafe {
            (Interface::vtable(&self.inner).Enum)(Interface::as_raw(&self.inner), forward.into(), &mut raw)
        }
        .into();
        if hr.is_failure() {
            return ComResult::failed(hr);
        }
        if raw.is_null() {
            tracing::debug!(%hr, forward, "IMoniker::Enum returned no enumerator");
            return ComResult::failed(E_FAIL);
        }
        ComResult::new(hr, MonikerEnumerator::new(unsafe { IEnumMoniker::from_raw(raw) }))
    }

    /// Enumerates the components left to right. A moniker without
    /// components fails with `E_FAIL`.
    pub fn enum_forward_hr(&self) -> ComResult<MonikerEnumerator> {
        self.enum_components(true)
    }

    /// # Errors
    /// Returns `E_FAIL` when the moniker has no components.
    pub fn enum_forward(&self) -> crate::Result<MonikerEnumerator> {
        self.enum_forward_hr().value()
    }

    /// Enumerates the components right to left.
    pub fn enum_backward_hr(&self) -> ComResult<MonikerEnumerator> {
        self.enum_components(false)
    }

    /// # Errors
    /// Returns `E_FAIL` when the moniker has no components.
    pub fn enum_backward(&self) -> crate::Result<MonikerEnumerator> {
        self.enum_backward_hr().value()
    }

    /// `S_OK` means equal, `S_FALSE` different.
    pub fn is_equal_hr(&self, other: &Moniker) -> ComResult<bool> {
        let hr: HResult = unsafe { self.inner.IsEqual(&other.inner) }.into();
        ComResult::new(hr, hr == S_OK)
    }

    /// # Errors
    /// Returns the failure of `IMoniker::IsEqual`.
    pub fn is_equal(&self, other: &Moniker) -> crate::Result<bool> {
        self.is_equal_hr(other).value()
    }

    /// Returns a hash that is equal for monikers that compare equal.
    pub fn hash_hr(&self) -> ComResult<u32> {
        unsafe { self.inner.Hash() }.into()
    }

    /// # Errors
    /// Returns the failure of `IMoniker::Hash`.
    pub fn hash(&self) -> crate::Result<u32> {
        self.hash_hr().value()
    }

    /// Returns the moniker that composes with `self` to nothing.
    pub fn inverse_hr(&self) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.Inverse() }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IMoniker::Inverse`, such as `MK_E_NOINVERSE`.
    pub fn inverse(&self) -> crate::Result<Self> {
        self.inverse_hr().value()
    }

    /// Returns the leading components shared with `other`.
    pub fn common_prefix_with_hr(&self, other: &Moniker) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.CommonPrefixWith(&other.inner) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IMoniker::CommonPrefixWith`, such as
    /// `MK_E_NOPREFIX`.
    pub fn common_prefix_with(&self, other: &Moniker) -> crate::Result<Self> {
        self.common_prefix_with_hr(other).value()
    }

    /// Returns the moniker that leads from `self` to `other`.
    pub fn relative_path_to_hr(&self, other: &Moniker) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.RelativePathTo(&other.inner) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IMoniker::RelativePathTo`.
    pub fn relative_path_to(&self, other: &Moniker) -> crate::Result<Self> {
        self.relative_path_to_hr(other).value()
    }

    /// Returns the `MKSYS` kind. Non-system monikers report
    /// [`MonikerSystem::None`] with `S_FALSE`.
    pub fn system_kind_hr(&self) -> ComResult<MonikerSystem> {
        ComResult::from(unsafe { self.inner.IsSystemMoniker() }).map(MonikerSystem::from)
    }

    /// # Errors
    /// Returns the failure of `IMoniker::IsSystemMoniker`.
    pub fn system_kind(&self) -> crate::Result<MonikerSystem> {
        self.system_kind_hr().value()
    }

    /// Returns when the named object last changed.
    pub fn time_of_last_change_hr(&self, bind_ctx: &BindCtx) -> ComResult<FileTime> {
        ComResult::from(unsafe { self.inner.GetTimeOfLastChange(&bind_ctx.inner, None::<&IMoniker>) })
            .map(FileTime::from)
    }

    /// # Errors
    /// Returns the failure of `IMoniker::GetTimeOfLastChange`, such as
    /// `MK_E_UNAVAILABLE`.
    pub fn time_of_last_change(&self, bind_ctx: &BindCtx) -> crate::Result<FileTime> {
        self.time_of_last_change_hr(bind_ctx).value()
    }
}

impl From<IMoniker> for Moniker {
    fn from(inner: IMoniker) -> Self {
        Self::new(inner)
    }
}

// ---------------------------------------------------------------------------
// MonikerEnumerator
// ---------------------------------------------------------------------------

/// Wraps an `IEnumMoniker`.
#[derive(Clone, Debug)]
pub struct MonikerEnumerator {
    inner: IEnumMoniker,
}

impl MonikerEnumerator {
    pub fn new(inner: IEnumMoniker) -> Self {
        Self { inner }
    }

    /// Resets the enumerator and iterates from the first element.
    ///
    /// # Errors
    /// Returns the failure of `IEnumMoniker::Reset`.
    pub fn iter(&self) -> crate::Result<MonikerIter<'_>> {
        unsafe { self.inner.Reset() }.map_err(ComError::from)?;
        Ok(MonikerIter {
            inner: &self.inner,
            done: false,
        })
    }

    /// Collects every element from the start.
    ///
    /// # Errors
    /// Returns the reset failure or the first `Next` failure.
    pub fn to_vec(&self) -> crate::Result<Vec<Moniker>> {
        self.iter()?.collect()
    }

    /// Clones the enumerator at its current position.
    pub fn try_clone_hr(&self) -> ComResult<Self> {
        ComResult::from(unsafe { self.inner.Clone() }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `IEnumMoniker::Clone`.
    pub fn try_clone(&self) -> crate::Result<Self> {
        self.try_clone_hr().value()
    }
}

/// Iterates over an `IEnumMoniker` one element at a time.
///
/// `S_FALSE` ends the iteration; a failure is yielded once and ends it too.
pub struct MonikerIter<'a> {
    inner: &'a IEnumMoniker,
    done: bool,
}

impl Iterator for MonikerIter<'_> {
    type Item = crate::Result<Moniker>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut slot = [None];
        let mut fetched = 0u32;
        let hr: HResult = unsafe { self.inner.Next(&mut slot, Some(&mut fetched as *mut u32)) }.into();
        if hr.is_failure() {
            self.done = true;
            return Some(Err(ComError::new(hr)));
        }
        match slot[0].take() {
            Some(moniker) if fetched == 1 => Some(Ok(Moniker::new(moniker))),
            _ => {
                debug_assert!(hr == S_FALSE || fetched == 0);
                self.done = true;
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// BindCtx
// ---------------------------------------------------------------------------

/// `BIND_OPTS` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindOptions {
    /// `BIND_FLAGS`: 1 may bother user, 2 just test existence.
    pub flags: u32,
    pub mode: u32,
    /// `GetTickCount` deadline; 0 means none.
    pub deadline: u32,
}

/// Wraps an `IBindCtx`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindCtx {
    inner: IBindCtx,
}

impl BindCtx {
    pub fn new(inner: IBindCtx) -> Self {
        Self { inner }
    }

    pub fn as_interface(&self) -> &IBindCtx {
        &self.inner
    }

    /// Creates an empty bind context.
    pub fn create_hr() -> ComResult<Self> {
        ComResult::from(unsafe { CreateBindCtx(0) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `CreateBindCtx`.
    pub fn create() -> crate::Result<Self> {
        Self::create_hr().value()
    }

    /// Keeps `object` alive until [`BindCtx::release_bound_objects`].
    pub fn register_object_bound_hr(&self, object: &IUnknown) -> ComResult<()> {
        unsafe { self.inner.RegisterObjectBound(object) }.into()
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::RegisterObjectBound`.
    pub fn register_object_bound(&self, object: &IUnknown) -> crate::Result<()> {
        self.register_object_bound_hr(object).value()
    }

    /// Drops one registration made by `register_object_bound_hr`.
    pub fn revoke_object_bound_hr(&self, object: &IUnknown) -> ComResult<()> {
        unsafe { self.inner.RevokeObjectBound(object) }.into()
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::RevokeObjectBound`.
    pub fn revoke_object_bound(&self, object: &IUnknown) -> crate::Result<()> {
        self.revoke_object_bound_hr(object).value()
    }

    /// Releases every object registered as bound.
    pub fn release_bound_objects_hr(&self) -> ComResult<()> {
        unsafe { self.inner.ReleaseBoundObjects() }.into()
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::ReleaseBoundObjects`.
    pub fn release_bound_objects(&self) -> crate::Result<()> {
        self.release_bound_objects_hr().value()
    }

    /// Reads the `BIND_OPTS` of the context.
    pub fn bind_options_hr(&self) -> ComResult<BindOptions> {
        let mut raw = BIND_OPTS {
            cbStruct: std::mem::size_of::<BIND_OPTS>() as u32,
            ..Default::default()
        };
        ComResult::from(unsafe { self.inner.GetBindOptions(&mut raw) }).map(|()| BindOptions {
            flags: raw.grfFlags,
            mode: raw.grfMode,
            deadline: raw.dwTickCountDeadline,
        })
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::GetBindOptions`.
    pub fn bind_options(&self) -> crate::Result<BindOptions> {
        self.bind_options_hr().value()
    }

    /// Replaces the `BIND_OPTS` of the context.
    pub fn set_bind_options_hr(&self, options: BindOptions) -> ComResult<()> {
        let raw = BIND_OPTS {
            cbStruct: std::mem::size_of::<BIND_OPTS>() as u32,
            grfFlags: options.flags,
            grfMode: options.mode,
            dwTickCountDeadline: options.deadline,
        };
        unsafe { self.inner.SetBindOptions(&raw) }.into()
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::SetBindOptions`.
    pub fn set_bind_options(&self, options: BindOptions) -> crate::Result<()> {
        self.set_bind_options_hr(options).value()
    }

    /// Stores `object` under `key` for monikers bound through this context.
    pub fn register_object_param_hr(&self, key: &str, object: &IUnknown) -> ComResult<()> {
        unsafe { self.inner.RegisterObjectParam(&HSTRING::from(key), object) }.into()
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::RegisterObjectParam`.
    pub fn register_object_param(&self, key: &str, object: &IUnknown) -> crate::Result<()> {
        self.register_object_param_hr(key, object).value()
    }

    /// Looks up the object stored under `key`.
    pub fn object_param_hr(&self, key: &str) -> ComResult<IUnknown> {
        unsafe { self.inner.GetObjectParam(&HSTRING::from(key)) }.into()
    }

    /// # Errors
    /// Returns `E_FAIL` when nothing is registered under `key`.
    pub fn object_param(&self, key: &str) -> crate::Result<IUnknown> {
        self.object_param_hr(key).value()
    }

    /// Removes the object stored under `key`.
    pub fn revoke_object_param_hr(&self, key: &str) -> ComResult<()> {
        unsafe { self.inner.RevokeObjectParam(&HSTRING::from(key)) }.into()
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::RevokeObjectParam`.
    pub fn revoke_object_param(&self, key: &str) -> crate::Result<()> {
        self.revoke_object_param_hr(key).value()
    }

    /// Returns every registered parameter key. Each key string is task
    /// memory and is freed after copying.
    pub fn object_param_keys_hr(&self) -> ComResult<Vec<String>> {
        let keys = match unsafe { self.inner.EnumObjectParam() } {
            Ok(keys) => keys,
            Err(err) => return ComResult::failed(HResult::from(err.code())),
        };
        let mut names = Vec::new();
        loop {
            let mut slot = [PWSTR::null()];
            let mut fetched = 0u32;
            let hr: HResult = unsafe { keys.Next(&mut slot, Some(&mut fetched as *mut u32)) }.into();
            if hr.is_failure() {
                return ComResult::failed(hr);
            }
            if fetched == 0 {
                break;
            }
            names.push(unsafe { take_task_string(slot[0]) });
        }
        ComResult::ok(names)
    }

    /// # Errors
    /// Returns the first enumeration failure.
    pub fn object_param_keys(&self) -> crate::Result<Vec<String>> {
        self.object_param_keys_hr().value()
    }

    /// Returns the running object table this context binds against.
    pub fn running_object_table_hr(&self) -> ComResult<RunningObjectTable> {
        ComResult::from(unsafe { self.inner.GetRunningObjectTable() }).map(RunningObjectTable::new)
    }

    /// # Errors
    /// Returns the failure of `IBindCtx::GetRunningObjectTable`.
    pub fn running_object_table(&self) -> crate::Result<RunningObjectTable> {
        self.running_object_table_hr().value()
    }
}

// ---------------------------------------------------------------------------
// RunningObjectTable
// ---------------------------------------------------------------------------

/// `ROTFLAGS_*` registration flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotFlags(pub u32);

impl RotFlags {
    pub const REGISTRATION_KEEPS_ALIVE: RotFlags = RotFlags(0x1);
    pub const ALLOW_ANY_CLIENT: RotFlags = RotFlags(0x2);
}

/// Wraps an `IRunningObjectTable`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunningObjectTable {
    inner: IRunningObjectTable,
}

impl RunningObjectTable {
    pub fn new(inner: IRunningObjectTable) -> Self {
        Self { inner }
    }

    pub fn as_interface(&self) -> &IRunningObjectTable {
        &self.inner
    }

    /// Returns the table of the local machine.
    pub fn get_hr() -> ComResult<Self> {
        ComResult::from(unsafe { GetRunningObjectTable(0) }).map(Self::new)
    }

    /// # Errors
    /// Returns the failure of `GetRunningObjectTable`.
    pub fn get() -> crate::Result<Self> {
        Self::get_hr().value()
    }

    /// Registers `object` under `name` and returns the registration cookie.
    /// `MK_S_MONIKERALREADYREGISTERED` is a success code.
    pub fn register_hr(&self, flags: RotFlags, object: &IUnknown, name: &Moniker) -> ComResult<u32> {
        unsafe { self.inner.Register(ROT_FLAGS(flags.0), object, &name.inner) }.into()
    }

    /// # Errors
    /// Returns the failure of `IRunningObjectTable::Register`.
    pub fn register(&self, flags: RotFlags, object: &IUnknown, name: &Moniker) -> crate::Result<u32> {
        self.register_hr(flags, object, name).value()
    }

    /// Removes the registration identified by `cookie`.
    pub fn revoke_hr(&self, cookie: u32) -> ComResult<()> {
        unsafe { self.inner.Revoke(cookie) }.into()
    }

    /// # Errors
    /// Returns the failure of `IRunningObjectTable::Revoke`.
    pub fn revoke(&self, cookie: u32) -> crate::Result<()> {
        self.revoke_hr(cookie).value()
    }

    /// `S_OK` means running, `S_FALSE` not.
    pub fn is_running_hr(&self, name: &Moniker) -> ComResult<bool> {
        // The generated method folds S_FALSE into Ok, so go through the vtable.
        let hr: HResult = unsafe {
            (Interface::vtable(&self.inner).IsRunning)(Interface::as_raw(&self.inner), Interface::as_raw(&name.inner))
        }
        .into();
        ComResult::new(hr, hr == S_OK)
    }

    /// # Errors
    /// Returns the failure of `IRunningObjectTable::IsRunning`.
    pub fn is_running(&self, name: &Moniker) -> crate::Result<bool> {
        self.is_running_hr(name).value()
    }

    /// Returns the object running under `name`.
    pub fn object_hr(&self, name: &Moniker) -> ComResult<IUnknown> {
        unsafe { self.inner.GetObject(&name.inner) }.into()
    }

    /// # Errors
    /// Returns `MK_E_UNAVAILABLE` when nothing runs under `name`.
    pub fn object(&self, name: &Moniker) -> crate::Result<IUnknown> {
        self.object_hr(name).value()
    }

    /// Records when the object under `cookie` last changed.
    pub fn note_change_time_hr(&self, cookie: u32, time: FileTime) -> ComResult<()> {
        let time = windows::Win32::Foundation::FILETIME::from(time);
        unsafe { self.inner.NoteChangeTime(cookie, &time) }.into()
    }

    /// # Errors
    /// Returns the failure of `IRunningObjectTable::NoteChangeTime`.
    pub fn note_change_time(&self, cookie: u32, time: FileTime) -> crate::Result<()> {
        self.note_change_time_hr(cookie, time).value()
    }

    /// Returns the change time recorded for `name`.
    pub fn time_of_last_change_hr(&self, name: &Moniker) -> ComResult<FileTime> {
        ComResult::from(unsafe { self.inner.GetTimeOfLastChange(&name.inner) }).map(FileTime::from)
    }

    /// # Errors
    /// Returns the failure of `IRunningObjectTable::GetTimeOfLastChange`.
    pub fn time_of_last_change(&self, name: &Moniker) -> crate::Result<FileTime> {
        self.time_of_last_change_hr(name).value()
    }

    /// Enumerates the names of every registered object.
    pub fn enum_running_hr(&self) -> ComResult<MonikerEnumerator> {
        ComResult::from(unsafe { self.inner.EnumRunning() }).map(MonikerEnumerator::new)
    }

    /// # Errors
    /// Returns the failure of `IRunningObjectTable::EnumRunning`.
    pub fn enum_running(&self) -> crate::Result<MonikerEnumerator> {
        self.enum_running_hr().value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_kind_mapping() {
        assert_eq!(MonikerSystem::from(2), MonikerSystem::File);
        assert_eq!(MonikerSystem::from(7), MonikerSystem::Class);
        assert_eq!(MonikerSystem::from(6), MonikerSystem::Other(6));
    }

    #[test]
    fn test_out_interface_null_on_success() {
        let result = out_interface::<u32>(Ok(()), None);
        assert_eq!(result.hr(), E_FAIL);
        assert_eq!(out_interface(Ok(()), Some(5u32)).value_or_none(), Some(5));
    }
}
