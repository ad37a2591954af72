//! Run configuration and the command-line surface that fills it.

use crate::error::{BenchError, Result};
use crate::workloads::Workload;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum PolicyKind {
    /// Plain read-modify-write count.
    Plain,
    /// Atomic fetch-add / fetch-sub count.
    Atomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum LayoutKind {
    Single,
    Double,
    Wrapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum FieldOrderKind {
    #[default]
    PayloadFirst,
    CountFirst,
}

/// Everything one benchmark session needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchOptions {
    pub log_dir: PathBuf,
    pub results_dir: PathBuf,
    pub copy_destruction_iterations: u64,
    pub basic_access_iterations: u64,
    /// Timed runs per layout and workload.
    pub trials: u32,
    pub workloads: Vec<Workload>,
    pub policies: Vec<PolicyKind>,
    pub layouts: Vec<LayoutKind>,
    /// Field order of the wrapped layout's combined block.
    pub field_order: FieldOrderKind,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            results_dir: PathBuf::from("res"),
            copy_destruction_iterations: Workload::CopyDestruction.default_iterations(),
            basic_access_iterations: Workload::BasicAccess.default_iterations(),
            trials: 1,
            workloads: Workload::ALL.to_vec(),
            policies: vec![PolicyKind::Plain, PolicyKind::Atomic],
            layouts: vec![LayoutKind::Single, LayoutKind::Double, LayoutKind::Wrapped],
            field_order: FieldOrderKind::default(),
        }
    }
}

impl BenchOptions {
    pub fn iterations(&self, workload: Workload) -> u64 {
        match workload {
            Workload::CopyDestruction => self.copy_destruction_iterations,
            Workload::BasicAccess => self.basic_access_iterations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for workload in &self.workloads {
            if self.iterations(*workload) == 0 {
                return Err(BenchError::Config(format!(
                    "{} needs at least one iteration",
                    workload.name()
                )));
            }
        }
        if self.trials == 0 {
            return Err(BenchError::Config("trials must be at least 1".to_string()));
        }
        if self.workloads.is_empty() || self.policies.is_empty() || self.layouts.is_empty() {
            return Err(BenchError::Config("nothing selected to run".to_string()));
        }
        Ok(())
    }

    /// `{log_dir}/{stamp}_{name}.log`
    pub fn log_path(&self, stamp: u64, name: &str) -> PathBuf {
        stamped(&self.log_dir, stamp, name, "log")
    }

    /// `{results_dir}/{stamp}_{name}.txt`
    pub fn results_path(&self, stamp: u64, name: &str) -> PathBuf {
        stamped(&self.results_dir, stamp, name, "txt")
    }
}

fn stamped(dir: &Path, stamp: u64, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{stamp}_{name}.{extension}"))
}

/// Seconds since the Unix epoch, or 0 if the clock is set before it.
pub fn unix_stamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Benchmark reference-counted pointer layouts", long_about = None)]
pub struct Cli {
    /// Directory for workload trace logs
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Directory for timing results
    #[arg(long, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    #[arg(long, help = "Iterations of the copy/destruction workload")]
    pub copy_iterations: Option<u64>,

    #[arg(long, help = "Iterations of the basic access workload")]
    pub access_iterations: Option<u64>,

    #[arg(long, short, help = "Timed runs per layout and workload")]
    pub trials: Option<u32>,

    /// Workloads to run (default: all)
    #[arg(long = "workload", value_enum)]
    pub workloads: Vec<Workload>,

    /// Count policies to run (default: all)
    #[arg(long = "policy", value_enum)]
    pub policies: Vec<PolicyKind>,

    /// Layouts to run (default: all)
    #[arg(long = "layout", value_enum)]
    pub layouts: Vec<LayoutKind>,

    #[arg(long, value_enum, help = "Field order of the wrapped block")]
    pub field_order: Option<FieldOrderKind>,
}

impl Cli {
    pub fn into_options(self) -> BenchOptions {
        let defaults = BenchOptions::default();
        BenchOptions {
            log_dir: self.log_dir.unwrap_or(defaults.log_dir),
            results_dir: self.results_dir.unwrap_or(defaults.results_dir),
            copy_destruction_iterations: self
                .copy_iterations
                .unwrap_or(defaults.copy_destruction_iterations),
            basic_access_iterations: self
                .access_iterations
                .unwrap_or(defaults.basic_access_iterations),
            trials: self.trials.unwrap_or(defaults.trials),
            workloads: non_empty_or(self.workloads, defaults.workloads),
            policies: non_empty_or(self.policies, defaults.policies),
            layouts: non_empty_or(self.layouts, defaults.layouts),
            field_order: self.field_order.unwrap_or(defaults.field_order),
        }
    }
}

fn non_empty_or<T>(chosen: Vec<T>, fallback: Vec<T>) -> Vec<T> {
    if chosen.is_empty() {
        fallback
    } else {
        chosen
    }
}
