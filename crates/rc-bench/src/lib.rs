//! # rc-bench
//!
//! Times deterministic workloads against every [`rc_layouts`] handle
//! layout and count policy. Each layout gets a trace log, written by the
//! workload payloads, and a results file with one elapsed-milliseconds
//! line per timed run.
//!
//! ```no_run
//! use rc_bench::{run, BenchOptions};
//!
//! let reports = run(&BenchOptions::default())?;
//! for report in &reports {
//!     println!("{} {}: {}", report.label, report.workload.name(), report.summary);
//! }
//! # Ok::<(), rc_bench::BenchError>(())
//! ```

pub mod config;
pub mod error;
pub mod harness;
pub mod runner;
pub mod sink;
pub mod workloads;

pub use config::{BenchOptions, Cli, FieldOrderKind, LayoutKind, PolicyKind};
pub use error::{BenchError, Result, SinkError};
pub use harness::{Benchmark, Summary};
pub use runner::{run, Report};
pub use sink::{LineSink, LogSink, ResultSink, TextSink};
pub use workloads::{basic_access, copy_destruction, Tally, Tracked, Workload, SENTINEL};
