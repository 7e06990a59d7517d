//! Samplers over kernel pseudo-files and helper programs.
//!
//! Every parser in here checks the source against the fixed layout it
//! expects and returns [`Error::MalformedData`] on any mismatch rather than
//! guessing.

pub mod cpu;
pub mod disk;
pub mod helper;
pub mod memory;
pub mod network;

use nix::time::{clock_gettime, ClockId};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads `rel` below the proc root, e.g. `read_proc(root, "stat")`.
pub fn read_proc(proc_root: &Path, rel: &str) -> Result<String> {
    let path = proc_root.join(rel);
    fs::read_to_string(&path).map_err(|e| Error::read(path, e))
}

/// Current `CLOCK_MONOTONIC_RAW` reading in nanoseconds.
///
/// Unlike `Instant`, the raw value is comparable across processes, which is
/// what a cached timestamp needs.
pub fn monotonic_nanos() -> Result<u64> {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC_RAW)
        .map_err(|e| Error::precondition(format!("clock_gettime failed: {e}")))?;
    Ok(ts.tv_sec() as u64 * 1_000_000_000 + ts.tv_nsec() as u64)
}

/// Leading decimal number of `s` (sign and fraction allowed), if any.
pub(crate) fn leading_number(s: &str) -> Option<f32> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '+' || c == '-') && i == 0)))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let a = monotonic_nanos().unwrap();
        let b = monotonic_nanos().unwrap();
        assert!(b >= a);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("+45.0°C  (crit = +100.0°C)"), Some(45.0));
        assert_eq!(leading_number("  1234 RPM"), Some(1234.0));
        assert_eq!(leading_number("-3.5 C"), Some(-3.5));
        assert_eq!(leading_number("N/A"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_read_proc_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_proc(dir.path(), "meminfo").unwrap_err();
        assert!(err.to_string().contains("meminfo"));
    }
}
