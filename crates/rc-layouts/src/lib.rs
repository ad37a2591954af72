//! # rc-layouts
//!
//! Three ways to lay out a strong, shared-ownership, reference-counted
//! pointer, each trading handle size against dereference latency:
//!
//! - **[`Single`]**: count pointer and payload pointer in the handle. Two
//!   words, two allocations, one load to the payload.
//! - **[`Double`]**: one pointer to a block holding the count and a payload
//!   pointer. One word, two allocations, two chained loads.
//! - **[`Wrapped`]**: one pointer to a block holding the count and the
//!   payload inline. One word, one allocation, one load.
//!
//! Every layout is generic over an [`AtomicPolicy`]: [`SingleThreaded`]
//! updates the count with plain read-modify-write, [`Atomic`] with
//! fetch-add/fetch-sub, so the cost of atomic counting can be measured on
//! the same design.
//!
//! There are no weak references and no cycle collection.
//!
//! ## Quick Start
//!
//! ```rust
//! use rc_layouts::{RcHandle, Wrapped};
//!
//! let first: Wrapped<String> = Wrapped::create("hello".to_string());
//! let second = first.clone();
//! assert!(first.ptr_eq(&second));
//! drop(first);
//! assert_eq!(second.strong_count(), 1); // freed when this one drops
//! ```

mod double;
mod handle;
mod layout;
mod policy;
mod single;
mod wrapped;

pub use double::Double;
pub use handle::RcHandle;
pub use layout::{DoubleLayout, Layout, SingleLayout, WrappedLayout};
pub use policy::{Atomic, AtomicPolicy, Counter, SingleThreaded};
pub use single::Single;
pub use wrapped::{
    CombinedBlock, CountFirst, CountFirstBlock, FieldOrder, PayloadFirst, PayloadFirstBlock,
    Wrapped,
};
