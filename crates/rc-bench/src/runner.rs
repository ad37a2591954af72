//! Drives every selected workload across every selected layout.

use crate::config::{unix_stamp, BenchOptions, FieldOrderKind, LayoutKind, PolicyKind};
use crate::error::{BenchError, Result};
use crate::harness::{Benchmark, Summary};
use crate::sink::{LogSink, ResultSink};
use crate::workloads::Workload;
use log::{debug, info};
use rc_layouts::{
    Atomic, CountFirst, DoubleLayout, Layout, PayloadFirst, SingleLayout, SingleThreaded,
    WrappedLayout,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Timings of one layout on one workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub workload: Workload,
    pub label: String,
    pub summary: Summary,
}

type RunFn = fn(Workload, &LogSink, u64) -> u64;

/// One layout + policy combination with its own pair of sinks.
struct Target {
    log: LogSink,
    bench: Benchmark<BufWriter<File>>,
    run: RunFn,
}

impl Target {
    fn open<L: Layout>(options: &BenchOptions, stamp: u64) -> Result<Self> {
        let label = L::label();
        let log = LogSink::append(&options.log_path(stamp, &label))?;
        let results = ResultSink::append(&options.results_path(stamp, &label))?;
        Ok(Self {
            log,
            bench: Benchmark::new(label, results),
            run: run_on::<L>,
        })
    }
}

fn run_on<L: Layout>(workload: Workload, log: &LogSink, iterations: u64) -> u64 {
    workload.run::<L, LogSink>(log, iterations)
}

fn open_target(
    policy: PolicyKind,
    layout: LayoutKind,
    order: FieldOrderKind,
    options: &BenchOptions,
    stamp: u64,
) -> Result<Target> {
    match (layout, policy, order) {
        (LayoutKind::Single, PolicyKind::Plain, _) => {
            Target::open::<SingleLayout<SingleThreaded>>(options, stamp)
        }
        (LayoutKind::Single, PolicyKind::Atomic, _) => {
            Target::open::<SingleLayout<Atomic>>(options, stamp)
        }
        (LayoutKind::Double, PolicyKind::Plain, _) => {
            Target::open::<DoubleLayout<SingleThreaded>>(options, stamp)
        }
        (LayoutKind::Double, PolicyKind::Atomic, _) => {
            Target::open::<DoubleLayout<Atomic>>(options, stamp)
        }
        (LayoutKind::Wrapped, PolicyKind::Plain, FieldOrderKind::PayloadFirst) => {
            Target::open::<WrappedLayout<SingleThreaded, PayloadFirst>>(options, stamp)
        }
        (LayoutKind::Wrapped, PolicyKind::Atomic, FieldOrderKind::PayloadFirst) => {
            Target::open::<WrappedLayout<Atomic, PayloadFirst>>(options, stamp)
        }
        (LayoutKind::Wrapped, PolicyKind::Plain, FieldOrderKind::CountFirst) => {
            Target::open::<WrappedLayout<SingleThreaded, CountFirst>>(options, stamp)
        }
        (LayoutKind::Wrapped, PolicyKind::Atomic, FieldOrderKind::CountFirst) => {
            Target::open::<WrappedLayout<Atomic, CountFirst>>(options, stamp)
        }
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| BenchError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the whole session described by `options`.
///
/// Every sink is opened before the first measurement, so an unopenable
/// file fails the session without recording anything. Any failed check
/// stops the session; results already recorded stay on disk.
pub fn run(options: &BenchOptions) -> Result<Vec<Report>> {
    options.validate()?;
    create_dir(&options.log_dir)?;
    create_dir(&options.results_dir)?;

    let stamp = unix_stamp();
    let mut targets = Vec::new();
    for &policy in &options.policies {
        for &layout in &options.layouts {
            targets.push(open_target(policy, layout, options.field_order, options, stamp)?);
        }
    }
    debug!("opened sinks for {} layout(s)", targets.len());

    let mut reports = Vec::new();
    for &workload in &options.workloads {
        let iterations = options.iterations(workload);
        let expected = workload.expected(iterations);
        info!("Starting {} tests ({iterations} iterations)", workload.name());

        for target in &mut targets {
            let run = target.run;
            for _ in 0..options.trials {
                target
                    .bench
                    .run_checked(&target.log, expected, |log| run(workload, log, iterations))?;
            }
            if let Some(summary) = target.bench.take_summary() {
                info!("{} {}: {summary}", target.bench.label(), workload.name());
                reports.push(Report {
                    workload,
                    label: target.bench.label().to_string(),
                    summary,
                });
            }
        }

        info!("Finished {} tests", workload.name());
    }
    Ok(reports)
}
