//! Monitor implementations.
//!
//! Each submodule wires one subsystem through the same cycle: sample, load
//! the cached previous sample, derive the metric, store the new cache, render
//! the fragment.
//! - `cpuinfo`: per-core usage, CPU temperature and fan speed
//! - `meminfo`: memory usage
//! - `diskinfo`: filesystem usage and drive temperature
//! - `netinfo`: interface throughput

pub mod cpuinfo;
pub mod diskinfo;
pub mod meminfo;
pub mod netinfo;

use std::io::Write;
use std::process::ExitCode;
use tracing::error;

use crate::error::Result;
use crate::format::Fragment;

// Re-export command functions
pub use cpuinfo::command_cpuinfo;
pub use diskinfo::command_diskinfo;
pub use meminfo::command_meminfo;
pub use netinfo::command_netinfo;

/// Outcome of a monitor run that produced output.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub fragment: Fragment,
    /// Zero unless the fragment itself signals an unavailable resource
    pub exit_code: u8,
}

impl Report {
    pub fn ok(fragment: Fragment) -> Self {
        Self {
            fragment,
            exit_code: 0,
        }
    }
}

/// Prints the fragment or logs the failure, and yields the exit code.
pub fn emit(result: Result<Report>) -> ExitCode {
    match result {
        Ok(report) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = write!(stdout, "{}", report.fragment).and_then(|_| stdout.flush()) {
                error!("Failed to write output: {}", e);
            }
            ExitCode::from(report.exit_code)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
