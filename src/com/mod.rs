//! Provides the portable COM conventions shared by every binding.
//!
//! # Overview
//!
//! - [`status::HResult`] - status codes and their classification
//! - [`result::ComResult`] - the non-throwing form of an operation
//! - [`scoped::Scoped`] - release-on-scope-exit for external resources
//! - [`narrow::Narrow`] - capability narrowing
//!
//! # Examples
//! ```
//! use comscope::com::status::{HResult, E_NOINTERFACE};
//!
//! let hr = HResult::from_u32(0x8000_4002);
//! assert_eq!(hr, E_NOINTERFACE);
//! assert!(hr.is_failure());
//! ```

pub mod narrow;
pub mod result;
pub mod scoped;
pub mod status;

pub use result::{ComError, ComResult};
pub use status::HResult;
