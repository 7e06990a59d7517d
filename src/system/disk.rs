//! Filesystem usage, backing device lookup and drive temperature.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::config::Config;
use crate::delta::usage_percent;
use crate::error::{Error, Result};
use crate::system::{helper::run_helper, leading_number};

/// Block counts of a mounted filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsUsage {
    pub blocks: u64,
    pub free_blocks: u64,
    pub block_size: u64,
}

impl FsUsage {
    pub fn total_bytes(&self) -> u64 {
        self.blocks.saturating_mul(self.block_size)
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_blocks.saturating_mul(self.block_size)
    }

    pub fn used_bytes(&self) -> u64 {
        self.total_bytes().saturating_sub(self.free_bytes())
    }

    pub fn used_percent(&self) -> u8 {
        usage_percent(self.blocks.saturating_sub(self.free_blocks), self.blocks)
    }
}

/// Block counts of the filesystem containing `path`.
pub fn statvfs(path: &Path) -> io::Result<FsUsage> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;

    Ok(FsUsage {
        blocks: stat.blocks() as u64,
        free_blocks: stat.blocks_free() as u64,
        block_size: stat.fragment_size() as u64,
    })
}

/// Splits a Linux `dev_t` into (major, minor).
pub fn split_dev(dev: u64) -> (u32, u32) {
    let major = ((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff);
    let minor = ((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff);
    (major as u32, minor as u32)
}

/// Device id of the filesystem `path` lives on.
pub fn device_id(path: &Path) -> io::Result<u64> {
    Ok(std::fs::metadata(path)?.dev())
}

/// Encodes whitespace and backslashes the way /proc/mounts does.
pub fn encode_mount_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' => out.push_str("\\040"),
            '\t' => out.push_str("\\011"),
            '\n' => out.push_str("\\012"),
            '\\' => out.push_str("\\134"),
            _ => out.push(c),
        }
    }
    out
}

/// Decodes `\NNN` octal escapes as found in /proc/mounts.
pub fn decode_mount_field(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b));
        if escaped {
            let code = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + (b - b'0') as u32);
            out.push(code as u8);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// One /proc/mounts entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub target: String,
}

pub fn parse_mounts(content: &str) -> Result<Vec<MountEntry>> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut cols = line.split_whitespace();
            match (cols.next(), cols.next()) {
                (Some(source), Some(target)) => Ok(MountEntry {
                    source: decode_mount_field(source),
                    target: decode_mount_field(target),
                }),
                _ => Err(Error::malformed(
                    "/proc/mounts",
                    format!("unexpected line {line:?}"),
                )),
            }
        })
        .collect()
}

/// Block device backing the filesystem with device id `dev`.
///
/// Picks the first mount on the same device whose source is a path, which
/// skips pseudo filesystems and `rootfs`.
pub fn find_device<F>(mounts: &[MountEntry], dev: u64, dev_of: F) -> Option<String>
where
    F: Fn(&Path) -> Option<u64>,
{
    mounts
        .iter()
        .filter(|m| m.source.starts_with('/'))
        .find(|m| dev_of(Path::new(&m.target)) == Some(dev))
        .map(|m| m.source.clone())
}

/// Drive model and temperature as reported by hddtemp.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveTemp {
    pub id: String,
    /// `None` when the drive reports no temperature (e.g. "not available")
    pub temp_c: Option<f32>,
}

/// Parses a `DEVICE: MODEL: TEMP°C` hddtemp line.
pub fn parse_hddtemp(output: &str) -> Result<DriveTemp> {
    let line = output.lines().next().unwrap_or("");
    let mut parts = line.splitn(3, ": ");
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_device), Some(id), Some(temp)) => Ok(DriveTemp {
            id: id.trim().to_string(),
            temp_c: leading_number(temp),
        }),
        _ => Err(Error::malformed(
            "hddtemp output",
            format!("expected DEVICE: MODEL: TEMP, got {line:?}"),
        )),
    }
}

/// Runs the configured hddtemp command for `device`.
pub async fn read_drive_temp(config: &Config, device: &str) -> Result<DriveTemp> {
    let mut command = config.hddtemp_command();
    command.push(device.to_string());
    let output = run_helper(&command, config.helper_timeout()).await?;
    parse_hddtemp(&output)
}
