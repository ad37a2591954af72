//! Times one workload invocation and records it.

use crate::error::{BenchError, Result};
use crate::sink::{LineSink, ResultSink};
use log::info;
use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};

/// Aggregate of the samples a [`Benchmark`] has recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub runs: usize,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} run(s), min {} ms, mean {} ms, max {} ms",
            self.runs,
            self.min.as_millis(),
            self.mean.as_millis(),
            self.max.as_millis()
        )
    }
}

/// A re-enterable timer bound to one results sink.
///
/// Each call to [`run`](Benchmark::run) or
/// [`run_checked`](Benchmark::run_checked) is independent: time the
/// workload, then append one whole-millisecond record.
pub struct Benchmark<W: Write> {
    label: String,
    results: ResultSink<W>,
    samples: Vec<Duration>,
}

impl<W: Write> Benchmark<W> {
    pub fn new(label: impl Into<String>, results: ResultSink<W>) -> Self {
        Self {
            label: label.into(),
            results,
            samples: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn results(&self) -> &ResultSink<W> {
        &self.results
    }

    pub fn into_results(self) -> ResultSink<W> {
        self.results
    }

    /// Time `workload` and append the elapsed milliseconds.
    pub fn run<S, F>(&mut self, log: &S, workload: F) -> Result<Duration>
    where
        S: LineSink + ?Sized,
        F: FnOnce(&S),
    {
        let (elapsed, ()) = time(|| workload(log));
        self.record(log, elapsed)
    }

    /// Time `workload` and append the elapsed milliseconds only if it
    /// returned `expected`.
    ///
    /// A mismatch means the loop was miscounted or optimised away, so the
    /// timing is meaningless: nothing is appended and the error is
    /// returned for the caller to treat as fatal.
    pub fn run_checked<S, T, F>(&mut self, log: &S, expected: T, workload: F) -> Result<Duration>
    where
        S: LineSink + ?Sized,
        T: PartialEq + fmt::Debug,
        F: FnOnce(&S) -> T,
    {
        let (elapsed, actual) = time(|| workload(log));
        if actual != expected {
            return Err(BenchError::Mismatch {
                label: self.label.clone(),
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            });
        }
        self.record(log, elapsed)
    }

    /// Min / mean / max over the samples recorded since the last call,
    /// which clears them.
    pub fn take_summary(&mut self) -> Option<Summary> {
        let samples = std::mem::take(&mut self.samples);
        let min = samples.iter().min().copied()?;
        let max = samples.iter().max().copied()?;
        let total: Duration = samples.iter().sum();
        let runs = samples.len();
        let mean = total / u32::try_from(runs).unwrap_or(u32::MAX);
        Some(Summary {
            runs,
            min,
            max,
            mean,
        })
    }

    fn record<S: LineSink + ?Sized>(&mut self, log: &S, elapsed: Duration) -> Result<Duration> {
        log.flush()?;
        self.results.record(elapsed.as_millis())?;
        self.samples.push(elapsed);
        info!("{}: {} ms", self.label, elapsed.as_millis());
        Ok(elapsed)
    }
}

fn time<R>(f: impl FnOnce() -> R) -> (Duration, R) {
    let start = Instant::now();
    let value = f();
    (start.elapsed(), value)
}
