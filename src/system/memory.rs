//! Memory usage from /proc/meminfo.

use std::path::Path;

use crate::delta::usage_percent;
use crate::error::{Error, Result};
use crate::system::read_proc;

/// The four /proc/meminfo values the memory monitor works from, in kB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemSample {
    pub total_kb: u64,
    pub free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
}

impl MemSample {
    /// Memory held by applications: total minus free, buffers and page cache.
    pub fn used_kb(&self) -> u64 {
        self.total_kb
            .saturating_sub(self.free_kb)
            .saturating_sub(self.buffers_kb)
            .saturating_sub(self.cached_kb)
    }

    pub fn used_percent(&self) -> u8 {
        usage_percent(self.used_kb(), self.total_kb)
    }

    /// Memory not free, reclaimable caches included.
    pub fn in_use_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.free_kb)
    }

    pub fn in_use_percent(&self) -> u8 {
        usage_percent(self.in_use_kb(), self.total_kb)
    }
}

fn parse_kb_value(line: &str, v: &str) -> Result<u64> {
    let mut parts = v.split_whitespace();
    match (parts.next().map(str::parse::<u64>), parts.next()) {
        (Some(Ok(kb)), Some("kB")) => Ok(kb),
        _ => Err(Error::malformed(
            "/proc/meminfo",
            format!("unexpected line {line:?}"),
        )),
    }
}

/// Parses MemTotal, MemFree, Buffers and Cached; all four are required.
pub fn parse_meminfo(content: &str) -> Result<MemSample> {
    let mut total = None;
    let mut free = None;
    let mut buffers = None;
    let mut cached = None;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("MemTotal:") {
            total = Some(parse_kb_value(line, v)?);
        } else if let Some(v) = line.strip_prefix("MemFree:") {
            free = Some(parse_kb_value(line, v)?);
        } else if let Some(v) = line.strip_prefix("Buffers:") {
            buffers = Some(parse_kb_value(line, v)?);
        } else if let Some(v) = line.strip_prefix("Cached:") {
            cached = Some(parse_kb_value(line, v)?);
        }

        if total.is_some() && free.is_some() && buffers.is_some() && cached.is_some() {
            break;
        }
    }

    match (total, free, buffers, cached) {
        (Some(0), ..) => Err(Error::malformed("/proc/meminfo", "MemTotal is 0")),
        (Some(total_kb), Some(free_kb), Some(buffers_kb), Some(cached_kb)) => Ok(MemSample {
            total_kb,
            free_kb,
            buffers_kb,
            cached_kb,
        }),
        _ => Err(Error::malformed(
            "/proc/meminfo",
            "missing MemTotal, MemFree, Buffers or Cached",
        )),
    }
}

pub fn read_memory(proc_root: &Path) -> Result<MemSample> {
    parse_meminfo(&read_proc(proc_root, "meminfo")?)
}
