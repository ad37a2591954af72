//! Count-update policy.
//!
//! Every handle layout is generic over an `AtomicPolicy`, so the same
//! layout can be measured with a plain read-modify-write count and with
//! an atomic one without duplicating the layout code.

use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};

/// Chooses how a handle group's count is stored and updated.
pub trait AtomicPolicy: 'static {
    /// Counter type for reference counting (Cell<u32> or AtomicU32).
    type Counter: Counter;

    /// Short name used in file names and log lines.
    const NAME: &'static str;

    /// Create a new counter initialized to the given value.
    fn new_counter(initial: u32) -> Self::Counter;
}

/// Trait for counter operations, abstracting Cell vs Atomic.
///
/// There is deliberately no `set`: a count only moves through
/// `increment` and `decrement`.
pub trait Counter {
    fn get(&self) -> u32;

    /// Add one, returning the new value.
    fn increment(&self) -> u32;

    /// Subtract one, returning the new value. Zero means the caller
    /// released the last handle and now owns the teardown.
    fn decrement(&self) -> u32;
}

// ============================================================================
// SingleThreaded Policy
// ============================================================================

/// Plain `Cell<u32>` count.
///
/// Correct only while no two threads touch handles of the same group,
/// which the handle types enforce by being `!Send` under this policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleThreaded;

impl AtomicPolicy for SingleThreaded {
    type Counter = Cell<u32>;

    const NAME: &'static str = "plain";

    #[inline]
    fn new_counter(initial: u32) -> Self::Counter {
        Cell::new(initial)
    }
}

impl Counter for Cell<u32> {
    #[inline]
    fn get(&self) -> u32 {
        Cell::get(self)
    }

    #[inline]
    fn increment(&self) -> u32 {
        let val = Cell::get(self);
        // A wrapped count would free the payload under live handles.
        let Some(next) = val.checked_add(1) else {
            std::process::abort();
        };
        self.set(next);
        next
    }

    #[inline]
    fn decrement(&self) -> u32 {
        let val = Cell::get(self);
        debug_assert!(val > 0, "Decrementing zero reference count");
        self.set(val - 1);
        val - 1
    }
}

// ============================================================================
// Atomic Policy
// ============================================================================

/// Highest count `Atomic` will increment from. The slack above it
/// absorbs increments racing with the abort.
const MAX_ATOMIC_COUNT: u32 = u32::MAX / 2;

/// `AtomicU32` count updated with fetch-add / fetch-sub.
///
/// Only the ownership bookkeeping becomes thread-safe. The payload gets
/// no extra protection, so handles are `Send`/`Sync` under this policy
/// only when the payload itself is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Atomic;

impl AtomicPolicy for Atomic {
    type Counter = AtomicU32;

    const NAME: &'static str = "atomic";

    #[inline]
    fn new_counter(initial: u32) -> Self::Counter {
        AtomicU32::new(initial)
    }
}

impl Counter for AtomicU32 {
    #[inline]
    fn get(&self) -> u32 {
        self.load(Ordering::Acquire)
    }

    #[inline]
    fn increment(&self) -> u32 {
        // New references are made from an existing one, so no ordering
        // with other memory is needed here.
        let prev = self.fetch_add(1, Ordering::Relaxed);
        // Abort well before wrapping: other threads may keep cloning
        // between the `fetch_add` and the abort, and must never see zero.
        if prev > MAX_ATOMIC_COUNT {
            std::process::abort();
        }
        prev + 1
    }

    #[inline]
    fn decrement(&self) -> u32 {
        let prev = self.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "Decrementing zero reference count");
        prev - 1
    }
}
