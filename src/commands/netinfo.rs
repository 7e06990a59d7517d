//! Network monitor: receive and transmit throughput of one interface.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheStore, NetRecord, ResourceKey};
use crate::commands::Report;
use crate::config::Config;
use crate::delta::{rate, RateUnit};
use crate::error::{Result, EXIT_RESOURCE_ABSENT};
use crate::format::{gib, Fragment};
use crate::system::monotonic_nanos;
use crate::system::network::read_interface;

/// Display options of `netinfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetOptions {
    pub interface: String,
    pub unit: RateUnit,
    pub icon: Option<PathBuf>,
}

/// Receive and transmit rates since the cached sample.
///
/// No cache, a clock that went backwards or a counter that shrank all give
/// a zero rate. When both rates are below one unit the interface counts as
/// idle and both are reported as zero.
pub fn rates(prev: Option<&NetRecord>, cur: &NetRecord, unit: RateUnit) -> (f64, f64) {
    let Some(prev) = prev else {
        return (0.0, 0.0);
    };
    if cur.nanos < prev.nanos {
        warn!("Monotonic clock behind cached sample, resetting rate baseline");
        return (0.0, 0.0);
    }

    let elapsed = Duration::from_nanos(cur.nanos - prev.nanos);
    let rx = rate(prev.rx_bytes, cur.rx_bytes, elapsed, unit);
    let tx = rate(prev.tx_bytes, cur.tx_bytes, elapsed, unit);
    if rx < 1.0 && tx < 1.0 {
        (0.0, 0.0)
    } else {
        (rx, tx)
    }
}

/// One direction: the rate, or the running total in GiB when the rate is 0.
fn rate_cell(label: &str, rate: f64, total_bytes: u64, unit: RateUnit) -> String {
    if rate == 0.0 {
        return format!("{:6.3}G", gib(total_bytes));
    }
    match unit {
        RateUnit::KilobitsPerSec if rate < 1000.0 => format!("{label} {:3}k", rate as u64),
        RateUnit::KilobitsPerSec => format!("{:6.3}m", rate / 1000.0),
        RateUnit::KibibytesPerSec if rate < 1000.0 => format!("{label} {:3}K", rate as u64),
        RateUnit::KibibytesPerSec => format!("{:6}K", rate as u64),
    }
}

pub fn render(record: &NetRecord, rx_rate: f64, tx_rate: f64, opts: &NetOptions) -> Fragment {
    let unit = opts.unit;
    Fragment {
        icon: opts.icon.clone(),
        text: format!(
            "{}\n{}",
            rate_cell("Rx", rx_rate, record.rx_bytes, unit),
            rate_cell("Tx", tx_rate, record.tx_bytes, unit)
        ),
        tool: format!(
            "Network interface: {}\nTotal data received: {}\nTotal data sent: {}",
            opts.interface,
            rate_cell("Rx", 0.0, record.rx_bytes, unit),
            rate_cell("Tx", 0.0, record.tx_bytes, unit)
        ),
        bar: None,
    }
}

/// Fragment for an interface missing from /proc/net/dev.
pub fn render_down(opts: &NetOptions) -> Fragment {
    Fragment {
        icon: opts.icon.clone(),
        text: "   Down\n".to_string(),
        tool: format!("{} is down", opts.interface),
        bar: None,
    }
}

/// Samples the interface, updates the cache and renders the fragment.
///
/// An absent interface still yields a fragment, with exit code 3 and the
/// cache left alone.
pub async fn command_netinfo(config: &Config, store: &CacheStore, opts: &NetOptions) -> Result<Report> {
    let Some(counters) = read_interface(&config.proc_root(), &opts.interface)? else {
        debug!("Interface {} not listed, reporting down", opts.interface);
        return Ok(Report {
            fragment: render_down(opts),
            exit_code: EXIT_RESOURCE_ABSENT,
        });
    };

    let cur = NetRecord {
        rx_bytes: counters.rx_bytes(),
        tx_bytes: counters.tx_bytes(),
        nanos: monotonic_nanos()?,
    };
    let key = ResourceKey::Net {
        interface: opts.interface.clone(),
    };

    let prev: Option<NetRecord> = store.load(&key)?;
    let (rx_rate, tx_rate) = rates(prev.as_ref(), &cur, opts.unit);
    debug!("{}: rx {:.1} tx {:.1} ({:?})", opts.interface, rx_rate, tx_rate, opts.unit);
    store.store(&key, &cur)?;

    Ok(Report::ok(render(&cur, rx_rate, tx_rate, opts)))
}
