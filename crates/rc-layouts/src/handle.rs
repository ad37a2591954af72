//! The capability surface shared by every handle layout.

use std::ops::Deref;

/// A strong, shared-ownership handle over one payload.
///
/// `Clone` is the copy operation (count + 1), `Drop` releases one
/// reference and tears the group down at zero, and `Deref` reaches the
/// payload. There is no null or default state: a handle only comes into
/// existence through [`RcHandle::create`].
///
/// Equality is identity: two handles are equal when they belong to the
/// same group, whatever their payloads compare as.
///
/// Workloads written against this trait run unchanged on every layout.
///
/// # Example
///
/// ```
/// use rc_layouts::{RcHandle, Single};
///
/// let a: Single<i32> = Single::create(27);
/// let b = a.clone();
/// assert_eq!(*b, 27);
/// assert_eq!(a.strong_count(), 2);
/// assert!(a.ptr_eq(&b));
/// ```
pub trait RcHandle<T>: Clone + Deref<Target = T> + Eq + Sized {
    /// Start a new group holding `value`, with a count of one.
    fn create(value: T) -> Self;

    /// Number of live handles in this handle's group.
    fn strong_count(&self) -> u32;

    /// True when both handles belong to the same group.
    fn ptr_eq(&self, other: &Self) -> bool;

    /// Mutable access to the payload, only while this is the sole handle.
    fn get_mut(&mut self) -> Option<&mut T>;

    /// Take the payload back out if this is the sole handle.
    fn try_unwrap(self) -> Result<T, Self>;

    /// Start a new group with a payload built by `f`.
    #[inline]
    fn create_with<F: FnOnce() -> T>(f: F) -> Self {
        Self::create(f())
    }

    #[inline]
    fn get(&self) -> &T {
        self
    }

    /// Read the payload out by value.
    #[inline]
    fn cloned(&self) -> T
    where
        T: Clone,
    {
        self.get().clone()
    }

    #[inline]
    fn is_unique(&self) -> bool {
        self.strong_count() == 1
    }

    /// Make `self` join `src`'s group, leaving its old group.
    ///
    /// `src` is retained before the old group is released, so assigning
    /// a handle to itself never drops the count to zero.
    #[inline]
    fn assign(&mut self, src: &Self) {
        *self = src.clone();
    }

    /// Copy-on-write access: detaches into a fresh group holding a clone
    /// of the payload when other handles share it.
    fn make_mut(&mut self) -> &mut T
    where
        T: Clone;
}
