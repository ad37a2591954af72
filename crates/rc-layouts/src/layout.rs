//! Handle families, so a workload can be written once and instantiated
//! for every layout and count policy.

use crate::double::Double;
use crate::handle::RcHandle;
use crate::policy::{AtomicPolicy, SingleThreaded};
use crate::single::Single;
use crate::wrapped::{FieldOrder, PayloadFirst, Wrapped};
use std::marker::PhantomData;

/// A handle layout paired with a count policy.
///
/// ```
/// use rc_layouts::{Atomic, Layout, RcHandle, SingleLayout};
///
/// fn make<L: Layout>() -> L::Rc<u64> {
///     RcHandle::create(27)
/// }
///
/// assert_eq!(*make::<SingleLayout<Atomic>>(), 27);
/// assert_eq!(SingleLayout::<Atomic>::label(), "single_atomic");
/// ```
pub trait Layout {
    type Policy: AtomicPolicy;
    type Rc<T>: RcHandle<T>;

    fn name() -> String;

    /// Layout name joined with the policy name, e.g. `double_plain`.
    fn label() -> String {
        format!("{}_{}", Self::name(), <Self::Policy as AtomicPolicy>::NAME)
    }
}

pub struct SingleLayout<P = SingleThreaded>(PhantomData<P>);

pub struct DoubleLayout<P = SingleThreaded>(PhantomData<P>);

pub struct WrappedLayout<P = SingleThreaded, O = PayloadFirst>(PhantomData<(P, O)>);

impl<P: AtomicPolicy> Layout for SingleLayout<P> {
    type Policy = P;
    type Rc<T> = Single<T, P>;

    fn name() -> String {
        "single".to_string()
    }
}

impl<P: AtomicPolicy> Layout for DoubleLayout<P> {
    type Policy = P;
    type Rc<T> = Double<T, P>;

    fn name() -> String {
        "double".to_string()
    }
}

impl<P: AtomicPolicy, O: FieldOrder> Layout for WrappedLayout<P, O> {
    type Policy = P;
    type Rc<T> = Wrapped<T, P, O>;

    fn name() -> String {
        format!("wrapped{}", O::SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Atomic;
    use crate::wrapped::CountFirst;

    fn roundtrip<L: Layout>() -> (u32, i32) {
        let a: L::Rc<i32> = RcHandle::create(27);
        let b = a.clone();
        (b.strong_count(), *a)
    }

    #[test]
    fn test_labels() {
        assert_eq!(SingleLayout::<SingleThreaded>::label(), "single_plain");
        assert_eq!(DoubleLayout::<Atomic>::label(), "double_atomic");
        assert_eq!(WrappedLayout::<SingleThreaded>::label(), "wrapped_plain");
        assert_eq!(
            WrappedLayout::<Atomic, CountFirst>::label(),
            "wrapped_count_first_atomic"
        );
    }

    #[test]
    fn test_generic_over_layout() {
        assert_eq!(roundtrip::<SingleLayout>(), (2, 27));
        assert_eq!(roundtrip::<DoubleLayout<Atomic>>(), (2, 27));
        assert_eq!(roundtrip::<WrappedLayout<Atomic, CountFirst>>(), (2, 27));
    }
}
