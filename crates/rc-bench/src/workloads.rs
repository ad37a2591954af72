//! Workloads, written once against [`Layout`] and instantiated for every
//! handle layout and count policy.

use crate::sink::LineSink;
use clap::ValueEnum;
use rc_layouts::{Layout, RcHandle};
use std::cell::Cell;
use std::hint::black_box;

/// Value every [`Tracked`] payload is constructed with, and the value
/// `copy_destruction` must return.
pub const SENTINEL: u64 = 27;

/// A payload that traces its construction and destruction to the log.
pub struct Tracked<'a, S: LineSink + ?Sized> {
    pub value: u64,
    log: &'a S,
}

impl<'a, S: LineSink + ?Sized> Tracked<'a, S> {
    pub fn new(value: u64, log: &'a S) -> Self {
        log.write_line(format_args!("constructed {value}"));
        Self { value, log }
    }
}

impl<S: LineSink + ?Sized> Drop for Tracked<'_, S> {
    fn drop(&mut self) {
        self.log.write_line(format_args!("dropped {}", self.value));
    }
}

/// A zero-initialised counter mutated through a shared reference.
#[derive(Debug, Default)]
pub struct Tally {
    count: Cell<u64>,
}

impl Tally {
    /// Increment and return the new count.
    #[inline]
    pub fn bump(&self) -> u64 {
        let next = self.count.get() + 1;
        self.count.set(next);
        next
    }

    pub fn count(&self) -> u64 {
        self.count.get()
    }
}

/// Create, copy, drop the copy, drop the original; `iterations` times.
///
/// Returns the payload value read through the last live handle, which is
/// [`SENTINEL`] unless no iterations ran.
pub fn copy_destruction<L, S>(log: &S, iterations: u64) -> u64
where
    L: Layout,
    S: LineSink + ?Sized,
{
    let mut observed = 0;
    for _ in 0..iterations {
        let original: L::Rc<Tracked<'_, S>> = RcHandle::create(Tracked::new(SENTINEL, log));
        let copy = black_box(original.clone());
        drop(copy);
        observed = black_box(original.value);
    }
    observed
}

/// Bump one shared counter `iterations` times, logging every value seen.
///
/// Returns the final count, which equals `iterations`.
pub fn basic_access<L, S>(log: &S, iterations: u64) -> u64
where
    L: Layout,
    S: LineSink + ?Sized,
{
    let tally: L::Rc<Tally> = RcHandle::create(Tally::default());
    for _ in 0..iterations {
        let seen = black_box(&tally).bump();
        log.write_line(format_args!("{seen}"));
    }
    tally.count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Workload {
    CopyDestruction,
    BasicAccess,
}

impl Workload {
    pub const ALL: [Workload; 2] = [Workload::CopyDestruction, Workload::BasicAccess];

    pub fn name(self) -> &'static str {
        match self {
            Workload::CopyDestruction => "copy_destruction",
            Workload::BasicAccess => "basic_access",
        }
    }

    pub fn default_iterations(self) -> u64 {
        match self {
            Workload::CopyDestruction => 2 << 18,
            Workload::BasicAccess => 2 << 24,
        }
    }

    /// What a correct run over `iterations` returns.
    pub fn expected(self, iterations: u64) -> u64 {
        match self {
            Workload::CopyDestruction if iterations == 0 => 0,
            Workload::CopyDestruction => SENTINEL,
            Workload::BasicAccess => iterations,
        }
    }

    pub fn run<L, S>(self, log: &S, iterations: u64) -> u64
    where
        L: Layout,
        S: LineSink + ?Sized,
    {
        match self {
            Workload::CopyDestruction => copy_destruction::<L, S>(log, iterations),
            Workload::BasicAccess => basic_access::<L, S>(log, iterations),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sink::TextSink;
    use rc_layouts::{Atomic, CountFirst, DoubleLayout, SingleLayout, WrappedLayout};

    fn trace(sink: TextSink<Vec<u8>>) -> Vec<String> {
        String::from_utf8(sink.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn check_copy_destruction<L: Layout>() {
        let log = TextSink::new("memory", Vec::new());
        assert_eq!(copy_destruction::<L, _>(&log, 3), SENTINEL);
        assert_eq!(
            trace(log),
            [
                "constructed 27",
                "dropped 27",
                "constructed 27",
                "dropped 27",
                "constructed 27",
                "dropped 27",
            ]
        );
    }

    fn check_basic_access<L: Layout>() {
        let log = TextSink::new("memory", Vec::new());
        assert_eq!(basic_access::<L, _>(&log, 1000), 1000);

        let seen: Vec<u64> = trace(log).iter().map(|l| l.parse().unwrap()).collect();
        assert_eq!(seen, (1..=1000).collect::<Vec<u64>>());
    }

    #[test]
    fn test_copy_destruction_alternates() {
        check_copy_destruction::<SingleLayout>();
        check_copy_destruction::<DoubleLayout<Atomic>>();
        check_copy_destruction::<WrappedLayout>();
        check_copy_destruction::<WrappedLayout<Atomic, CountFirst>>();
    }

    #[test]
    fn test_basic_access_counts_every_iteration() {
        check_basic_access::<SingleLayout<Atomic>>();
        check_basic_access::<DoubleLayout>();
        check_basic_access::<WrappedLayout<Atomic, CountFirst>>();
    }

    #[test]
    fn test_zero_iterations() {
        let log = TextSink::new("memory", Vec::new());
        assert_eq!(copy_destruction::<SingleLayout, _>(&log, 0), 0);
        assert_eq!(basic_access::<SingleLayout, _>(&log, 0), 0);
        assert_eq!(log.lines_written(), 0);
    }

    #[test]
    fn test_workload_expected_matches_run() {
        for workload in Workload::ALL {
            let log = TextSink::new("memory", Vec::new());
            let actual = workload.run::<DoubleLayout, _>(&log, 5);
            assert_eq!(actual, workload.expected(5), "{}", workload.name());
        }
    }

    #[test]
    fn test_default_iterations() {
        assert_eq!(Workload::CopyDestruction.default_iterations(), 524_288);
        assert_eq!(Workload::BasicAccess.default_iterations(), 33_554_432);
    }

    #[test]
    fn test_tally_bump() {
        let tally = Tally::default();
        assert_eq!(tally.bump(), 1);
        assert_eq!(tally.bump(), 2);
        assert_eq!(tally.count(), 2);
    }
}
