//! Interface counters from /proc/net/dev.

use std::path::Path;

use crate::error::{Error, Result};
use crate::system::read_proc;

/// Receive and transmit counters of one interface, in /proc/net/dev order:
/// bytes, packets, errs, drop, fifo, frame/colls, compressed, multicast/carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfaceCounters {
    pub rx: [u64; 8],
    pub tx: [u64; 8],
}

impl IfaceCounters {
    pub fn rx_bytes(&self) -> u64 {
        self.rx[0]
    }

    pub fn tx_bytes(&self) -> u64 {
        self.tx[0]
    }
}

/// Finds `interface` in /proc/net/dev content.
///
/// `Ok(None)` means the interface is not listed (down or absent). A listed
/// interface without exactly sixteen counters is malformed.
pub fn find_interface(content: &str, interface: &str) -> Result<Option<IfaceCounters>> {
    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        if name.trim() != interface {
            continue;
        }

        let fields: Vec<u64> = rest
            .split_whitespace()
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| {
                Error::malformed("/proc/net/dev", format!("non-numeric counter for {interface}"))
            })?;
        if fields.len() != 16 {
            return Err(Error::malformed(
                "/proc/net/dev",
                format!("expected 16 counters for {interface}, got {}", fields.len()),
            ));
        }

        let mut counters = IfaceCounters {
            rx: [0; 8],
            tx: [0; 8],
        };
        counters.rx.copy_from_slice(&fields[..8]);
        counters.tx.copy_from_slice(&fields[8..]);
        return Ok(Some(counters));
    }
    Ok(None)
}

pub fn read_interface(proc_root: &Path, interface: &str) -> Result<Option<IfaceCounters>> {
    find_interface(&read_proc(proc_root, "net/dev")?, interface)
}
