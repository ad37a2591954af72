//! Double-indirection handle: one word per handle, two loads per access.
//!
//! Handles point at a shared intermediate block holding the count and the
//! payload pointer. Half the footprint of [`Single`](crate::Single), but
//! every access is a chain of two dependent loads.

use crate::handle::RcHandle;
use crate::policy::{Atomic, AtomicPolicy, Counter, SingleThreaded};
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr::NonNull;

/// The block every handle of a group points at.
#[repr(C)]
struct Indirection<T, C> {
    // First, so the hot load is at offset zero.
    payload: NonNull<T>,
    count: C,
}

/// Reference-counted handle reaching its payload through a shared block.
///
/// # Example
///
/// ```
/// use rc_layouts::{Double, RcHandle};
///
/// let thing: Double<i32> = Double::create(27);
/// let copy = thing.clone();
/// assert_eq!(*copy, 27);
/// assert_eq!(thing.strong_count(), 2);
/// ```
pub struct Double<T, P: AtomicPolicy = SingleThreaded> {
    block: NonNull<Indirection<T, P::Counter>>,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send + Sync> Send for Double<T, Atomic> {}
unsafe impl<T: Send + Sync> Sync for Double<T, Atomic> {}

impl<T, P: AtomicPolicy> Double<T, P> {
    #[inline]
    fn block(&self) -> &Indirection<T, P::Counter> {
        // SAFETY: the block lives until the last handle of the group drops.
        unsafe { self.block.as_ref() }
    }
}

impl<T, P: AtomicPolicy> RcHandle<T> for Double<T, P> {
    fn create(value: T) -> Self {
        let block = Box::new(Indirection {
            payload: NonNull::from(Box::leak(Box::new(value))),
            count: P::new_counter(1),
        });
        Self {
            block: NonNull::from(Box::leak(block)),
            _owns: PhantomData,
        }
    }

    #[inline]
    fn strong_count(&self) -> u32 {
        self.block().count.get()
    }

    #[inline]
    fn ptr_eq(&self, other: &Self) -> bool {
        self.block == other.block
    }

    #[inline]
    fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_unique() {
            let mut payload = self.block().payload;
            // SAFETY: count == 1 means no other handle can observe the payload.
            Some(unsafe { payload.as_mut() })
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
        let mut payload = self.block().payload;
        // SAFETY: the group is unique now, by detaching if it was not.
        unsafe { payload.as_mut() }
    }

    fn try_unwrap(self) -> Result<T, Self> {
        if !self.is_unique() {
            return Err(self);
        }
        let this = ManuallyDrop::new(self);
        // SAFETY: sole handle; block and payload are reclaimed exactly once.
        unsafe {
            let block = Box::from_raw(this.block.as_ptr());
            Ok(*Box::from_raw(block.payload.as_ptr()))
        }
    }
}

impl<T, P: AtomicPolicy> Clone for Double<T, P> {
    #[inline]
    fn clone(&self) -> Self {
        self.block().count.increment();
        Self {
            block: self.block,
            _owns: PhantomData,
        }
    }
}

impl<T, P: AtomicPolicy> Drop for Double<T, P> {
    fn drop(&mut self) {
        if self.block().count.decrement() == 0 {
            // SAFETY: last handle. Payload first, then the block.
            unsafe {
                let block = Box::from_raw(self.block.as_ptr());
                drop(Box::from_raw(block.payload.as_ptr()));
                drop(block);
            }
        }
    }
}

impl<T, P: AtomicPolicy> Deref for Double<T, P> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the payload lives as long as the block does.
        unsafe { self.block().payload.as_ref() }
    }
}

impl<T, P: AtomicPolicy> PartialEq for Double<T, P> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T, P: AtomicPolicy> Eq for Double<T, P> {}

impl<T: fmt::Debug, P: AtomicPolicy> fmt::Debug for Double<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Double")
            .field("value", &**self)
            .field("strong_count", &self.strong_count())
            .finish()
    }
}
