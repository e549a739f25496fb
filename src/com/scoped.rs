//! Provides scope-bound ownership of externally allocated memory and locks.
//!
//! Task-allocator blocks, global memory handles, global memory locks and
//! safe-array locks all follow the same discipline: one release for each
//! successful acquire, run when the owning scope exits, whether it exits
//! normally, through `?`, or by unwinding.
//!
//! [`Scoped`] is the guard. Guards declared later in a scope drop first, so
//! nested acquisitions release in reverse order.
//!
//! # Examples
//! ```
//! use std::cell::RefCell;
//!
//! use comscope::com::scoped::{ExternalResource, Scoped};
//!
//! struct Block<'a>(&'static str, &'a RefCell<Vec<&'static str>>);
//!
//! impl ExternalResource for Block<'_> {
//!     fn release(&mut self) {
//!         self.1.borrow_mut().push(self.0);
//!     }
//! }
//!
//! let log = RefCell::new(Vec::new());
//! {
//!     let _a = Scoped::new(Block("a", &log));
//!     let _b = Scoped::new(Block("b", &log));
//! }
//! assert_eq!(*log.borrow(), ["b", "a"]);
//! ```

use std::ops::{Deref, DerefMut};

use crate::com::result::{ComError, ComResult};

/// Represents one outstanding release obligation toward an external allocator
/// or lock owner.
///
/// `release` is called at most once per value by [`Scoped`]. Implementors
/// must not release in their own `Drop`; the guard owns that decision.
pub trait ExternalResource {
    /// Gives the resource back to its owner.
    fn release(&mut self);
}

/// Owns an [`ExternalResource`] for the lifetime of a scope.
///
/// # Examples
/// ```
/// use comscope::com::scoped::{ExternalResource, Scoped};
///
/// struct Counter(u32);
///
/// impl ExternalResource for Counter {
///     fn release(&mut self) {
///         self.0 += 1;
///     }
/// }
///
/// let guard = Scoped::new(Counter(0));
/// assert_eq!(guard.0, 0);
/// let kept = guard.detach();
/// assert_eq!(kept.0, 0);
/// ```
#[must_use = "dropping the guard releases the resource immediately"]
pub struct Scoped<R: ExternalResource> {
    resource: Option<R>,
}

impl<R: ExternalResource> Scoped<R> {
    /// Takes ownership of an already acquired resource.
    pub fn new(resource: R) -> Self {
        Self {
            resource: Some(resource),
        }
    }

    /// Hands the resource back without releasing it.
    pub fn detach(mut self) -> R {
        match self.resource.take() {
            Some(resource) => resource,
            // `resource` is only taken here and in `drop`, both consume the guard.
            None => unreachable!("scoped resource already released"),
        }
    }

    /// Releases the resource now instead of at scope exit.
    pub fn release(self) {
        drop(self);
    }
}

impl<R: ExternalResource> Deref for Scoped<R> {
    type Target = R;

    fn deref(&self) -> &R {
        match &self.resource {
            Some(resource) => resource,
            None => unreachable!("scoped resource already released"),
        }
    }
}

impl<R: ExternalResource> DerefMut for Scoped<R> {
    fn deref_mut(&mut self) -> &mut R {
        match &mut self.resource {
            Some(resource) => resource,
            None => unreachable!("scoped resource already released"),
        }
    }
}

impl<R: ExternalResource> Drop for Scoped<R> {
    fn drop(&mut self) {
        if let Some(mut resource) = self.resource.take() {
            tracing::trace!(resource = std::any::type_name::<R>(), "releasing scoped resource");
            resource.release();
        }
    }
}

/// Runs a fallible acquisition and guards its result.
///
/// When the acquisition fails nothing was obtained, so nothing is released.
///
/// # Errors
/// Returns the acquisition's error.
///
/// # Examples
/// ```
/// use comscope::com::result::ComResult;
/// use comscope::com::scoped::{acquire, ExternalResource};
/// use comscope::com::status::E_OUTOFMEMORY;
///
/// struct Never;
///
/// impl ExternalResource for Never {
///     fn release(&mut self) {
///         unreachable!();
///     }
/// }
///
/// let result = acquire(|| ComResult::<Never>::failed(E_OUTOFMEMORY));
/// assert_eq!(result.err().map(|e| e.hr()), Some(E_OUTOFMEMORY));
/// ```
pub fn acquire<R: ExternalResource>(
    f: impl FnOnce() -> ComResult<R>,
) -> Result<Scoped<R>, ComError> {
    f().value().map(Scoped::new)
}

/// Runs `body` with a borrowed resource and releases it afterwards.
///
/// The release happens once, after `body` returns or while a panic from
/// `body` unwinds.
///
/// # Examples
/// ```
/// use comscope::com::scoped::{with_scoped, ExternalResource};
///
/// struct Lock {
///     held: bool,
/// }
///
/// impl ExternalResource for Lock {
///     fn release(&mut self) {
///         self.held = false;
///     }
/// }
///
/// let total = with_scoped(Lock { held: true }, |lock| {
///     assert!(lock.held);
///     1 + 1
/// });
/// assert_eq!(total, 2);
/// ```
pub fn with_scoped<R: ExternalResource, T>(resource: R, body: impl FnOnce(&mut R) -> T) -> T {
    let mut guard = Scoped::new(resource);
    body(&mut guard)
}

/// Releases each element of an owned batch, used for output arrays whose
/// elements each carry their own allocation.
///
/// Every element added is released even if filling the batch stops early.
pub struct ScopedBatch<R: ExternalResource> {
    items: Vec<Scoped<R>>,
}

impl<R: ExternalResource> ScopedBatch<R> {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates an empty batch with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Takes ownership of one more element.
    pub fn push(&mut self, resource: R) {
        self.items.push(Scoped::new(resource));
    }

    /// Takes over an element that is already guarded.
    pub fn push_scoped(&mut self, resource: Scoped<R>) {
        self.items.push(resource);
    }

    /// Hands every element back without releasing any of them.
    pub fn detach_all(mut self) -> Vec<R> {
        std::mem::take(&mut self.items)
            .into_iter()
            .map(Scoped::detach)
            .collect()
    }

    /// Iterates over the owned elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.items.iter().map(|item| &**item)
    }

    /// Returns the number of owned elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when no element is owned.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<R: ExternalResource> Default for ScopedBatch<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ExternalResource> Drop for ScopedBatch<R> {
    fn drop(&mut self) {
        // Release the last acquired element first.
        while let Some(item) = self.items.pop() {
            drop(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use crate::com::status::{E_FAIL, S_OK};

    struct Tracked<'a> {
        name: &'static str,
        log: &'a RefCell<Vec<String>>,
    }

    impl<'a> Tracked<'a> {
        fn acquire(name: &'static str, log: &'a RefCell<Vec<String>>) -> Self {
            log.borrow_mut().push(format!("acquire {name}"));
            Self { name, log }
        }
    }

    impl ExternalResource for Tracked<'_> {
        fn release(&mut self) {
            self.log.borrow_mut().push(format!("release {}", self.name));
        }
    }

    fn nested_then_fail(log: &RefCell<Vec<String>>) -> Result<(), ComError> {
        let _a = Scoped::new(Tracked::acquire("a", log));
        let _b = Scoped::new(Tracked::acquire("b", log));
        E_FAIL.check()?;
        Ok(())
    }

    #[test]
    fn test_nested_release_on_error_return() {
        let log = RefCell::new(Vec::new());
        assert!(nested_then_fail(&log).is_err());
        assert_eq!(
            *log.borrow(),
            ["acquire a", "acquire b", "release b", "release a"]
        );
    }

    #[test]
    fn test_nested_release_on_panic() {
        let log = RefCell::new(Vec::new());
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            with_scoped(Tracked::acquire("a", &log), |_| {
                with_scoped(Tracked::acquire("b", &log), |_| {
                    panic!("body failed after acquiring b");
                })
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(
            *log.borrow(),
            ["acquire a", "acquire b", "release b", "release a"]
        );
    }

    #[test]
    fn test_failed_acquire_releases_nothing() {
        let log = RefCell::new(Vec::new());
        let result = acquire(|| ComResult::<Tracked<'_>>::failed(E_FAIL));
        assert!(result.is_err());
        assert!(log.borrow().is_empty());

        let guard = acquire(|| ComResult::new(S_OK, Tracked::acquire("c", &log)));
        assert!(guard.is_ok());
        drop(guard);
        assert_eq!(*log.borrow(), ["acquire c", "release c"]);
    }

    #[test]
    fn test_detach_skips_release() {
        let log = RefCell::new(Vec::new());
        let resource = Scoped::new(Tracked::acquire("d", &log)).detach();
        assert_eq!(resource.name, "d");
        assert_eq!(*log.borrow(), ["acquire d"]);
    }

    #[test]
    fn test_early_release() {
        let log = RefCell::new(Vec::new());
        let guard = Scoped::new(Tracked::acquire("e", &log));
        guard.release();
        log.borrow_mut().push("after".to_string());
        assert_eq!(*log.borrow(), ["acquire e", "release e", "after"]);
    }

    #[test]
    fn test_batch_releases_partial_fill() {
        let log = RefCell::new(Vec::new());
        let result: Result<ScopedBatch<Tracked<'_>>, ComError> = (|| {
            let mut batch = ScopedBatch::with_capacity(3);
            batch.push(Tracked::acquire("x", &log));
            batch.push(Tracked::acquire("y", &log));
            E_FAIL.check()?;
            batch.push(Tracked::acquire("z", &log));
            Ok(batch)
        })();
        assert!(result.is_err());
        assert_eq!(
            *log.borrow(),
            ["acquire x", "acquire y", "release y", "release x"]
        );
    }

    #[test]
    fn test_batch_iter() {
        let log = RefCell::new(Vec::new());
        let mut batch = ScopedBatch::new();
        assert!(batch.is_empty());
        batch.push(Tracked::acquire("p", &log));
        batch.push(Tracked::acquire("q", &log));
        let names: Vec<_> = batch.iter().map(|t| t.name).collect();
        assert_eq!(names, ["p", "q"]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_batch_detach_all() {
        let log = RefCell::new(Vec::new());
        let mut batch = ScopedBatch::new();
        batch.push(Tracked::acquire("m", &log));
        batch.push_scoped(Scoped::new(Tracked::acquire("n", &log)));
        let detached = batch.detach_all();
        assert_eq!(detached.len(), 2);
        assert_eq!(*log.borrow(), ["acquire m", "acquire n"]);
    }
}
