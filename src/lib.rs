//! Provides ergonomic, leak-free bindings over the COM runtime.
//!
//! Every COM operation is offered in two forms: `op_hr` returns a
//! [`ComResult`] carrying the raw status code next to the value, and `op`
//! returns [`Result`], turning a failing code into a [`ComError`]. Memory and
//! locks owned by external allocators are held by [`Scoped`] guards that
//! release exactly once when the scope exits. Capability narrowing goes
//! through [`Narrow`].
//!
//! The status, result, scoping and narrowing core plus the value types
//! ([`guid`], [`filetime`], [`vartype`], [`clipformat`], [`config`]) build on
//! every platform.
//! The bindings to the Windows runtime build on Windows only.
//!
//! # Examples
//! ```
//! use comscope::com::result::ComResult;
//! use comscope::com::status::{E_FAIL, S_FALSE};
//!
//! let soft = ComResult::new(S_FALSE, 3);
//! assert!(soft.success());
//! assert_eq!(soft.value().ok(), Some(3));
//!
//! let hard = ComResult::<u32>::failed(E_FAIL);
//! assert_eq!(hard.value().err().map(|e| e.hr()), Some(E_FAIL));
//! ```

pub mod clipformat;
pub mod com;
pub mod config;
pub mod filetime;
pub mod guid;
pub mod vartype;

#[cfg(windows)]
pub mod comcat;
#[cfg(windows)]
pub mod dataobj;
#[cfg(windows)]
pub mod globalmem;
#[cfg(windows)]
pub mod mem;
#[cfg(windows)]
pub mod moniker;
#[cfg(windows)]
pub mod persist;
#[cfg(windows)]
pub mod propvariant;
#[cfg(windows)]
pub mod safearray;
#[cfg(windows)]
pub mod stream;
#[cfg(windows)]
pub mod variant;

pub use com::narrow::{narrow, Narrow};
pub use com::result::{ComError, ComResult};
pub use com::scoped::{acquire, with_scoped, ExternalResource, Scoped, ScopedBatch};
pub use com::status::HResult;
pub use guid::Guid;

/// Result of the throwing form of every operation.
pub type Result<T> = std::result::Result<T, ComError>;
