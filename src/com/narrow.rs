//! Provides capability narrowing: turning a handle to an object into a handle
//! typed for one specific interface the object supports.
//!
//! Narrowing asks the object itself (`QueryInterface`), never inspects Rust
//! types. A successful narrow yields a new handle that holds one more
//! reference on the same object; a missing capability is `E_NOINTERFACE`.
//! A null handle narrows to a null handle without error, so "no object" and
//! "wrong capability" stay distinguishable.
//!
//! On Windows every pair of `windows` interface types narrows through
//! `windows_core::Interface::cast`.
//!
//! # Examples
//! ```
//! use comscope::com::narrow::{narrow, Narrow};
//! use comscope::com::result::ComError;
//! use comscope::com::status::E_NOINTERFACE;
//!
//! struct Object {
//!     readable: bool,
//! }
//! struct Reader;
//!
//! impl Narrow<Reader> for Object {
//!     fn narrow(&self) -> Result<Reader, ComError> {
//!         if self.readable {
//!             Ok(Reader)
//!         } else {
//!             Err(ComError::new(E_NOINTERFACE))
//!         }
//!     }
//! }
//!
//! assert!(narrow::<Object, Reader>(None).unwrap().is_none());
//! assert!(narrow::<_, Reader>(Some(&Object { readable: true })).unwrap().is_some());
//! assert!(narrow::<_, Reader>(Some(&Object { readable: false })).is_err());
//! ```

use crate::com::result::ComError;

/// Implemented by handles that can be asked for capability `T`.
pub trait Narrow<T> {
    /// Asks the underlying object for capability `T`.
    ///
    /// # Errors
    /// Returns `E_NOINTERFACE` when the object does not expose `T`, or the
    /// object's own failure code.
    fn narrow(&self) -> Result<T, ComError>;
}

/// Narrows an optional handle.
///
/// `None` stays `None` without asking anything.
///
/// # Errors
/// Propagates the failure of [`Narrow::narrow`].
pub fn narrow<S, T>(handle: Option<&S>) -> Result<Option<T>, ComError>
where
    S: Narrow<T>,
{
    match handle {
        None => Ok(None),
        Some(handle) => handle.narrow().map(Some).inspect_err(|err| {
            tracing::debug!(
                from = std::any::type_name::<S>(),
                to = std::any::type_name::<T>(),
                hr = %err.hr(),
                "capability narrowing failed"
            );
        }),
    }
}

#[cfg(windows)]
impl<S, T> Narrow<T> for S
where
    S: windows_core::Interface,
    T: windows_core::Interface,
{
    fn narrow(&self) -> Result<T, ComError> {
        self.cast::<T>().map_err(ComError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::com::status::E_NOINTERFACE;

    /// Stand-in for an external object: the count lives on the object, the
    /// handles only add and drop references.
    struct Object {
        refs: Cell<u32>,
        streams: bool,
    }

    struct UnknownHandle(Rc<Object>);
    struct StreamHandle(Rc<Object>);

    impl UnknownHandle {
        fn create(streams: bool) -> Self {
            Self(Rc::new(Object {
                refs: Cell::new(1),
                streams,
            }))
        }
    }

    impl Drop for UnknownHandle {
        fn drop(&mut self) {
            self.0.refs.set(self.0.refs.get() - 1);
        }
    }

    impl Drop for StreamHandle {
        fn drop(&mut self) {
            self.0.refs.set(self.0.refs.get() - 1);
        }
    }

    impl Narrow<StreamHandle> for UnknownHandle {
        fn narrow(&self) -> Result<StreamHandle, ComError> {
            if !self.0.streams {
                return Err(ComError::new(E_NOINTERFACE));
            }
            self.0.refs.set(self.0.refs.get() + 1);
            Ok(StreamHandle(Rc::clone(&self.0)))
        }
    }

    #[test]
    fn test_null_handle_narrows_to_none() {
        let narrowed = narrow::<UnknownHandle, StreamHandle>(None);
        assert!(matches!(narrowed, Ok(None)));
    }

    #[test]
    fn test_missing_capability_is_no_interface() {
        let unknown = UnknownHandle::create(false);
        let err = narrow::<_, StreamHandle>(Some(&unknown)).err().map(|e| e.hr());
        assert_eq!(err, Some(E_NOINTERFACE));
        assert_eq!(unknown.0.refs.get(), 1);
    }

    #[test]
    fn test_narrowing_adds_exactly_one_reference() {
        let unknown = UnknownHandle::create(true);
        let object = Rc::clone(&unknown.0);
        assert_eq!(object.refs.get(), 1);

        let stream = narrow::<_, StreamHandle>(Some(&unknown)).unwrap().unwrap();
        assert_eq!(object.refs.get(), 2);
        assert!(Rc::ptr_eq(&stream.0, &object));

        drop(stream);
        assert_eq!(object.refs.get(), 1);
        drop(unknown);
        assert_eq!(object.refs.get(), 0);
    }
}
