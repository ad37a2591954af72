//! Allocation profile of each layout, observed through a counting global
//! allocator.
//!
//! Counters are thread-local so tests running in parallel on other
//! threads do not pollute each other's numbers.

#![allow(clippy::unwrap_used)]

use rc_layouts::*;
use std::alloc::{GlobalAlloc, Layout as AllocLayout, System};
use std::cell::Cell;
use std::hint::black_box;

// =============================================================================
// COUNTING ALLOCATOR
// =============================================================================

struct CountingAllocator;

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
    static FREES: Cell<usize> = const { Cell::new(0) };
    static LIVE_BYTES: Cell<isize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: AllocLayout) -> *mut u8 {
        let _ = ALLOCS.try_with(|c| c.set(c.get() + 1));
        let _ = LIVE_BYTES.try_with(|c| c.set(c.get() + layout.size() as isize));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: AllocLayout) {
        let _ = FREES.try_with(|c| c.set(c.get() + 1));
        let _ = LIVE_BYTES.try_with(|c| c.set(c.get() - layout.size() as isize));
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    allocs: usize,
    frees: usize,
    live_bytes: isize,
}

fn snapshot() -> Snapshot {
    Snapshot {
        allocs: ALLOCS.with(Cell::get),
        frees: FREES.with(Cell::get),
        live_bytes: LIVE_BYTES.with(Cell::get),
    }
}

fn since(start: Snapshot) -> Snapshot {
    let now = snapshot();
    Snapshot {
        allocs: now.allocs - start.allocs,
        frees: now.frees - start.frees,
        live_bytes: now.live_bytes - start.live_bytes,
    }
}

// =============================================================================
// PROFILE CHECKS
// =============================================================================

/// Returns the allocations made by `create`, after checking that copies
/// allocate nothing and that the last drop frees exactly what was made.
fn allocation_profile<L: Layout>() -> usize {
    let start = snapshot();
    let a: L::Rc<[u64; 4]> = black_box(RcHandle::create([1, 2, 3, 4]));
    let created = since(start);
    assert_eq!(created.frees, 0);

    let b = black_box(a.clone());
    let c = black_box(b.clone());
    assert_eq!(since(start).allocs, created.allocs, "copies must not allocate");

    drop(black_box(a));
    drop(black_box(b));
    assert_eq!(since(start).frees, 0, "nothing freed while a handle is alive");

    drop(black_box(c));
    let end = since(start);
    assert_eq!(end.frees, created.allocs, "every allocation freed exactly once");
    assert_eq!(end.live_bytes, 0);

    created.allocs
}

mod profile_tests {
    use super::*;

    #[test]
    fn single_allocates_count_and_payload() {
        assert_eq!(allocation_profile::<SingleLayout<SingleThreaded>>(), 2);
        assert_eq!(allocation_profile::<SingleLayout<Atomic>>(), 2);
    }

    #[test]
    fn double_allocates_block_and_payload() {
        assert_eq!(allocation_profile::<DoubleLayout<SingleThreaded>>(), 2);
        assert_eq!(allocation_profile::<DoubleLayout<Atomic>>(), 2);
    }

    #[test]
    fn wrapped_allocates_once() {
        assert_eq!(allocation_profile::<WrappedLayout<SingleThreaded>>(), 1);
        assert_eq!(allocation_profile::<WrappedLayout<Atomic, CountFirst>>(), 1);
    }

    #[test]
    fn wrapped_block_holds_count_and_payload() {
        let start = snapshot();
        let h: Wrapped<[u64; 4]> = black_box(RcHandle::create([0; 4]));
        assert_eq!(since(start).live_bytes, 40);
        drop(black_box(h));
        assert_eq!(since(start).live_bytes, 0);
    }

    #[test]
    fn try_unwrap_frees_bookkeeping_only() {
        let start = snapshot();
        let h: Double<[u64; 4]> = black_box(RcHandle::create([9; 4]));
        let payload = black_box(black_box(h).try_unwrap().unwrap());
        assert_eq!(payload, [9; 4]);
        let end = since(start);
        assert_eq!(end.allocs, 2);
        assert_eq!(end.frees, 2);
    }

    #[test]
    fn make_mut_on_shared_allocates_new_group() {
        let h: Single<u64> = black_box(RcHandle::create(1));
        let mut copy = black_box(h.clone());
        let start = snapshot();
        *black_box(&mut copy).make_mut() += 1;
        assert_eq!(since(start).allocs, 2);
        assert_eq!(*h, 1);
        assert_eq!(*copy, 2);
    }
}
