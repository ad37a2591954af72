//! Single-indirection handle: two words per handle, one load per access.
//!
//! Each handle stores the count pointer and the payload pointer side by
//! side. Reading the payload is one load straight to it, comparable to a
//! raw pointer dereference, at the cost of doubling the handle size and
//! paying for two allocations per group.

use crate::handle::RcHandle;
use crate::policy::{Atomic, AtomicPolicy, Counter, SingleThreaded};
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr::NonNull;

/// Reference-counted handle with separate count and payload allocations.
///
/// # Example
///
/// ```
/// use rc_layouts::{RcHandle, Single};
///
/// let thing: Single<String> = Single::create("hello".to_string());
/// let copy = thing.clone();
/// assert_eq!(thing, copy);
/// assert_eq!(copy.len(), 5);
/// ```
pub struct Single<T, P: AtomicPolicy = SingleThreaded> {
    count: NonNull<P::Counter>,
    payload: NonNull<T>,
    _owns: PhantomData<T>,
}

// Under the atomic policy only the count is shared mutable state.
unsafe impl<T: Send + Sync> Send for Single<T, Atomic> {}
unsafe impl<T: Send + Sync> Sync for Single<T, Atomic> {}

impl<T, P: AtomicPolicy> Single<T, P> {
    #[inline]
    fn counter(&self) -> &P::Counter {
        // SAFETY: the count lives until the last handle of the group drops.
        unsafe { self.count.as_ref() }
    }
}

impl<T, P: AtomicPolicy> RcHandle<T> for Single<T, P> {
    fn create(value: T) -> Self {
        let count = NonNull::from(Box::leak(Box::new(P::new_counter(1))));
        let payload = NonNull::from(Box::leak(Box::new(value)));
        Self {
            count,
            payload,
            _owns: PhantomData,
        }
    }

    #[inline]
    fn strong_count(&self) -> u32 {
        self.counter().get()
    }

    /// Compares count allocations: zero-sized payloads all share one
    /// dangling address, the count never does.
    #[inline]
    fn ptr_eq(&self, other: &Self) -> bool {
        self.count == other.count
    }

    #[inline]
    fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_unique() {
            // SAFETY: count == 1 means no other handle can observe the payload.
            Some(unsafe { self.payload.as_mut() })
        } else {
            None
        }
    }

    fn make_mut(&mut self) -> &mut T
    where
        T: Clone,
    {
        if !self.is_unique() {
            *self = Self::create(self.cloned());
        }
        // SAFETY: the group is unique now, by detaching if it was not.
        unsafe { self.payload.as_mut() }
    }

    fn try_unwrap(self) -> Result<T, Self> {
        if !self.is_unique() {
            return Err(self);
        }
        let this = ManuallyDrop::new(self);
        // SAFETY: sole handle, both allocations came from `Box::leak` and
        // `this` is never dropped, so each box is reclaimed exactly once.
        unsafe {
            drop(Box::from_raw(this.count.as_ptr()));
            Ok(*Box::from_raw(this.payload.as_ptr()))
        }
    }
}

impl<T, P: AtomicPolicy> Clone for Single<T, P> {
    #[inline]
    fn clone(&self) -> Self {
        self.counter().increment();
        Self {
            count: self.count,
            payload: self.payload,
            _owns: PhantomData,
        }
    }
}

impl<T, P: AtomicPolicy> Drop for Single<T, P> {
    fn drop(&mut self) {
        if self.counter().decrement() == 0 {
            // SAFETY: the count reached zero, no other handle remains.
            // Payload goes first, then the count nothing else will read.
            unsafe {
                drop(Box::from_raw(self.payload.as_ptr()));
                drop(Box::from_raw(self.count.as_ptr()));
            }
        }
    }
}

impl<T, P: AtomicPolicy> Deref for Single<T, P> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the payload lives as long as any handle of the group.
        unsafe { self.payload.as_ref() }
    }
}

impl<T, P: AtomicPolicy> PartialEq for Single<T, P> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T, P: AtomicPolicy> Eq for Single<T, P> {}

impl<T: fmt::Debug, P: AtomicPolicy> fmt::Debug for Single<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Single")
            .field("value", &**self)
            .field("strong_count", &self.strong_count())
            .finish()
    }
}
