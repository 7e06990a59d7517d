//! Derived metrics computed from two samples.
//!
//! All counters handled here are expected to grow between runs. When one
//! shrinks (wraparound, reboot with a stale cache, hot-plugged device) the
//! previous sample is discarded and the metric falls back to the first-run
//! baseline of zero.

use std::time::Duration;

/// Shortest interval a rate is computed over; anything below reads as 0.
pub const MIN_ELAPSED: Duration = Duration::from_millis(10);

/// Tick counters of one core as read from /proc/stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoreTicks {
    pub total: u64,
    pub idle: u64,
}

impl CoreTicks {
    /// True when either counter went backwards relative to `prev`.
    pub fn regressed_from(&self, prev: &CoreTicks) -> bool {
        self.total < prev.total || self.idle < prev.idle
    }
}

/// Units a network rate is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateUnit {
    /// Binary kilobytes (1024 bytes) per second
    #[default]
    KibibytesPerSec,
    /// Decimal kilobits (1000 bits) per second
    KilobitsPerSec,
}

/// Busy percentage of a core between two samples, in [0, 100].
///
/// A missing or regressed previous sample, or no elapsed ticks, yields 0.
pub fn busy_percent(prev: Option<&CoreTicks>, cur: &CoreTicks) -> u8 {
    let prev = match prev {
        Some(p) if !cur.regressed_from(p) => p,
        _ => return 0,
    };

    let delta_total = cur.total - prev.total;
    let delta_idle = cur.idle - prev.idle;
    if delta_total == 0 {
        return 0;
    }

    let busy = delta_total.saturating_sub(delta_idle) as u128;
    ((busy * 100) / delta_total as u128).min(100) as u8
}

/// Throughput between two byte counters over `elapsed`.
///
/// Returns 0 for a regressed counter or an interval shorter than
/// [`MIN_ELAPSED`], so the result is always finite.
pub fn rate(prev_bytes: u64, cur_bytes: u64, elapsed: Duration, unit: RateUnit) -> f64 {
    if cur_bytes < prev_bytes || elapsed < MIN_ELAPSED {
        return 0.0;
    }

    let delta = (cur_bytes - prev_bytes) as f64;
    let secs = elapsed.as_secs_f64();
    let value = match unit {
        RateUnit::KibibytesPerSec => delta / secs / 1024.0,
        RateUnit::KilobitsPerSec => delta * 8.0 / secs / 1000.0,
    };

    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Running maximum; never lower than `prev`.
pub fn running_max<T: PartialOrd + Copy>(prev: T, cur: T) -> T {
    if cur > prev {
        cur
    } else {
        prev
    }
}

/// Integer percentage of `used` over `total`, in [0, 100]; 0 for an empty total.
pub fn usage_percent(used: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((used.min(total) as u128 * 100) / total as u128) as u8
}
