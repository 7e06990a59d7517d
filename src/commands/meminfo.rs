//! Memory monitor. Stateless: no cache is involved.

use std::path::PathBuf;
use tracing::debug;

use crate::commands::Report;
use crate::config::Config;
use crate::error::Result;
use crate::format::Fragment;
use crate::system::memory::{read_memory, MemSample};

const KIB_PER_MIB: u64 = 1024;

/// Display options of `meminfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemOptions {
    pub show_bar: bool,
    pub icon: Option<PathBuf>,
}

/// Digits needed to right-align `value`, never narrower than `min`.
fn field_width(value: u64, min: usize) -> usize {
    let digits = match value {
        v if v > 9999 => 5,
        v if v > 999 => 4,
        v if v > 99 => 3,
        _ => 2,
    };
    digits.max(min)
}

pub fn render(sample: &MemSample, opts: &MemOptions) -> Fragment {
    let used = sample.used_kb() / KIB_PER_MIB;
    let cached = sample.cached_kb / KIB_PER_MIB;
    let buffers = sample.buffers_kb / KIB_PER_MIB;
    let fw = field_width(used, field_width(cached, 1));

    Fragment {
        icon: opts.icon.clone(),
        text: format!(
            "{used:>fw$}M {}%\n{cached:>fw$}M {buffers}M",
            sample.used_percent()
        ),
        tool: format!(
            "Total memory available: {}M\nMemory currently being used: {}M ({}%)",
            sample.total_kb / KIB_PER_MIB,
            sample.in_use_kb() / KIB_PER_MIB,
            sample.in_use_percent()
        ),
        bar: opts.show_bar.then(|| sample.in_use_percent()),
    }
}

pub fn command_meminfo(config: &Config, opts: &MemOptions) -> Result<Report> {
    let sample = read_memory(&config.proc_root())?;
    debug!("Memory sample: {:?}", sample);
    Ok(Report::ok(render(&sample, opts)))
}
