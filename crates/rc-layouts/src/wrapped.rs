//! Wrapped handle: one word per handle, one allocation per group, one load
//! per access.
//!
//! The count and the payload share a single block. The payload is reached
//! through the block's named field, an offset from the block pointer, so
//! it keeps the small footprint of [`Double`](crate::Double) and the single
//! indirection of [`Single`](crate::Single).
//!
//! Only sound for strong-only ownership. Weak references would have to
//! keep the block alive after the payload is dropped, which brings the
//! second allocation back.

use crate::handle::RcHandle;
use crate::policy::{Atomic, AtomicPolicy, Counter, SingleThreaded};
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr::NonNull;

/// Access to the fields of a combined count + payload block.
pub trait CombinedBlock<T, C> {
    fn new(payload: T, count: C) -> Self;
    fn payload(&self) -> &T;
    fn payload_mut(&mut self) -> &mut T;
    fn count(&self) -> &C;
    fn into_payload(self) -> T;
}

/// Selects the field order of the combined block.
///
/// The order changes padding and where the payload sits relative to the
/// block pointer, so it is part of what gets measured.
pub trait FieldOrder: 'static {
    type Block<T, C>: CombinedBlock<T, C>;

    /// Appended to the layout name in file names and log lines.
    const SUFFIX: &'static str;
}

/// Payload at offset zero, count after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadFirst;

/// Count at offset zero, payload after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountFirst;

#[repr(C)]
pub struct PayloadFirstBlock<T, C> {
    payload: T,
    count: C,
}

#[repr(C)]
pub struct CountFirstBlock<T, C> {
    count: C,
    payload: T,
}

impl FieldOrder for PayloadFirst {
    type Block<T, C> = PayloadFirstBlock<T, C>;
    const SUFFIX: &'static str = "";
}

impl FieldOrder for CountFirst {
    type Block<T, C> = CountFirstBlock<T, C>;
    const SUFFIX: &'static str = "_count_first";
}

macro_rules! impl_block {
    ($block:ident) => {
        impl<T, C> CombinedBlock<T, C> for $block<T, C> {
            #[inline]
            fn new(payload: T, count: C) -> Self {
                Self { payload, count }
            }

            #[inline]
            fn payload(&self) -> &T {
                &self.payload
            }

            #[inline]
            fn payload_mut(&mut self) -> &mut T {
                &mut self.payload
            }

            #[inline]
            fn count(&self) -> &C {
                &self.count
            }

            #[inline]
            fn into_payload(self) -> T {
                self.payload
            }
        }
    };
}

impl_block!(PayloadFirstBlock);
impl_block!(CountFirstBlock);

type BlockOf<T, P, O> = <O as FieldOrder>::Block<T, <P as AtomicPolicy>::Counter>;

/// Reference-counted handle with the count stored inline next to the
/// payload.
///
/// # Example
///
/// ```
/// use rc_layouts::{CountFirst, RcHandle, SingleThreaded, Wrapped};
///
/// let thing: Wrapped<i32> = Wrapped::create(27);
/// assert_eq!(*thing, 27);
///
/// let reordered: Wrapped<i32, SingleThreaded, CountFirst> = Wrapped::create(27);
/// assert_eq!(*reordered.clone(), 27);
/// ```
pub struct Wrapped<T, P: AtomicPolicy = SingleThreaded, O: FieldOrder = PayloadFirst> {
    block: NonNull<BlockOf<T, P, O>>,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send + Sync, O: FieldOrder> Send for Wrapped<T, Atomic, O> {}
unsafe impl<T: Send + Sync, O: FieldOrder> Sync for Wrapped<T, Atomic, O> {}

impl<T, P: AtomicPolicy, O: FieldOrder> Wrapped<T, P, O> {
    #[inline]
    fn block(&self) -> &BlockOf<T, P, O> {
        // SAFETY: the block lives until the last handle of the group drops.
        unsafe { self.block.as_ref() }
    }
}

impl<T, P: AtomicPolicy, O: FieldOrder> RcHandle<T> for Wrapped<T, P, O> {
    fn create(value: T) -> Self {
        let block: Box<BlockOf<T, P, O>> =
            Box::new(CombinedBlock::new(value, P::new_counter(1)));
        Self {
            block: NonNull::from(Box::leak(block)),
            _owns: PhantomData,
        }
    }

    #[inline]
    fn strong_count(&self) -> u32 {
        self.block().count().get()
    }

    #[inline]
    fn ptr_eq(&self, other: &Self) -> bool {
        self.block == other.block
    }

    #[inline]
    fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_unique() {
            // SAFETY: count == 1 means no other handle can observe the block.
            Some(unsafe { self.block.as_mut() }.payload_mut())
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
        unsafe { self.block.as_mut() }.payload_mut()
    }

    fn try_unwrap(self) -> Result<T, Self> {
        if !self.is_unique() {
            return Err(self);
        }
        let this = ManuallyDrop::new(self);
        // SAFETY: sole handle; the block is reclaimed exactly once.
        let block = unsafe { Box::from_raw(this.block.as_ptr()) };
        Ok((*block).into_payload())
    }
}

impl<T, P: AtomicPolicy, O: FieldOrder> Clone for Wrapped<T, P, O> {
    #[inline]
    fn clone(&self) -> Self {
        self.block().count().increment();
        Self {
            block: self.block,
            _owns: PhantomData,
        }
    }
}

impl<T, P: AtomicPolicy, O: FieldOrder> Drop for Wrapped<T, P, O> {
    fn drop(&mut self) {
        if self.block().count().decrement() == 0 {
            // SAFETY: last handle. Dropping the box runs the payload's
            // destructor and frees the one allocation.
            unsafe { drop(Box::from_raw(self.block.as_ptr())) }
        }
    }
}

impl<T, P: AtomicPolicy, O: FieldOrder> Deref for Wrapped<T, P, O> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.block().payload()
    }
}

impl<T, P: AtomicPolicy, O: FieldOrder> PartialEq for Wrapped<T, P, O> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T, P: AtomicPolicy, O: FieldOrder> Eq for Wrapped<T, P, O> {}

impl<T: fmt::Debug, P: AtomicPolicy, O: FieldOrder> fmt::Debug for Wrapped<T, P, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("value", &**self)
            .field("strong_count", &self.strong_count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_wrapped_is_one_word() {
        assert_eq!(size_of::<Wrapped<[u8; 64]>>(), size_of::<usize>());
        assert_eq!(size_of::<Option<Wrapped<u64>>>(), size_of::<usize>());
    }

    #[test]
    fn test_field_order_is_respected() {
        assert_eq!(offset_of!(PayloadFirstBlock<u64, Cell<u32>>, payload), 0);
        assert_eq!(offset_of!(PayloadFirstBlock<u64, Cell<u32>>, count), 8);
        assert_eq!(offset_of!(CountFirstBlock<u64, Cell<u32>>, count), 0);
        assert_eq!(offset_of!(CountFirstBlock<u64, Cell<u32>>, payload), 8);
    }

    #[test]
    fn test_small_payload_pads_count_first() {
        assert_eq!(offset_of!(PayloadFirstBlock<u8, Cell<u32>>, count), 4);
        assert_eq!(offset_of!(CountFirstBlock<u8, Cell<u32>>, payload), 4);
        assert_eq!(size_of::<CountFirstBlock<u8, Cell<u32>>>(), 8);
    }

    #[test]
    fn test_payload_reached_through_field() {
        let h: Wrapped<u64, SingleThreaded, CountFirst> = Wrapped::create(27);
        let block_addr = h.block.as_ptr() as usize;
        let payload_addr = &*h as *const u64 as usize;
        assert_eq!(payload_addr - block_addr, 8);
    }

    #[test]
    fn test_wrapped_try_unwrap_shared_fails() {
        let a: Wrapped<String> = Wrapped::create("x".to_string());
        let b = a.clone();
        let a = a.try_unwrap().unwrap_err();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.strong_count(), 2);
    }
}
