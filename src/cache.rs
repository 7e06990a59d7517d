//! Per-user, per-resource cache of the previous sample.
//!
//! Each monitor keeps exactly one small text file per resource in a fast
//! temporary directory. The file holds whitespace-separated ASCII fields, one
//! record per line, and is only ever read back by the same program on the
//! same host. A missing file means "first run". A file that does not parse
//! aborts the run.
//!
//! Writes go through a temporary sibling and a rename, so a reader never sees
//! a half-written record. The read-modify-write cycle itself is not locked:
//! two concurrent runs for the same resource race and the last one wins.

use nix::unistd::getuid;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::delta::CoreTicks;
use crate::error::{Error, Result};
use crate::system::disk::{decode_mount_field, encode_mount_field};

/// Identity of one cached resource, without the owning user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey {
    Cpu,
    Disk { major: u32, minor: u32 },
    Net { interface: String },
}

impl ResourceKey {
    /// File name of this resource's cache for `uid`.
    pub fn file_name(&self, uid: u32) -> String {
        match self {
            ResourceKey::Cpu => format!("cpuinfo.{uid}"),
            ResourceKey::Disk { major, minor } => format!("diskinfo.{major}.{minor}.{uid}"),
            ResourceKey::Net { interface } => format!("netinfo.{interface}.{uid}"),
        }
    }
}

/// Text encoding of a cached record.
pub trait CacheRecord: Sized {
    fn encode(&self) -> String;

    /// Parses a record; the error describes what did not match.
    fn decode(text: &str) -> std::result::Result<Self, String>;
}

/// Cache directory bound to one user id.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    uid: u32,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, uid: u32) -> Self {
        Self {
            dir: dir.into(),
            uid,
        }
    }

    /// Store keyed by the real user id of this process.
    pub fn for_current_user(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, getuid().as_raw())
    }

    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.dir.join(key.file_name(self.uid))
    }

    /// Reads the record for `key`; `None` when no cache exists yet.
    pub fn load<R: CacheRecord>(&self, key: &ResourceKey) -> Result<Option<R>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache at {}, first run", path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::read(path, e)),
        };

        R::decode(&content)
            .map(Some)
            .map_err(|detail| Error::malformed(format!("cache {}", path.display()), detail))
    }

    /// Replaces the record for `key`.
    pub fn store<R: CacheRecord>(&self, key: &ResourceKey, record: &R) -> Result<()> {
        let path = self.path_for(key);
        let tmp = tmp_sibling(&path);

        let write = fs::write(&tmp, record.encode()).and_then(|_| fs::rename(&tmp, &path));
        if let Err(source) = write {
            let _ = fs::remove_file(&tmp);
            return Err(Error::CacheWrite { path, source });
        }
        debug!("Updated cache {}", path.display());
        Ok(())
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp{}", std::process::id()));
    path.with_file_name(name)
}

/// Splits one line into exactly `n` whitespace-separated fields.
fn fields(line: &str, n: usize) -> std::result::Result<Vec<&str>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != n {
        return Err(format!(
            "expected {n} fields, got {} in {line:?}",
            parts.len()
        ));
    }
    Ok(parts)
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str) -> std::result::Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {name} {value:?}"))
}

/// Previous per-core ticks plus the hottest temperature and fastest fan seen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CpuRecord {
    pub cores: Vec<CoreTicks>,
    pub max_temp: f32,
    pub max_rpm: u32,
}

impl CacheRecord for CpuRecord {
    fn encode(&self) -> String {
        let mut out = String::new();
        for core in &self.cores {
            out.push_str(&format!("{} {}\n", core.total, core.idle));
        }
        out.push_str(&format!("{} {}\n", self.max_temp, self.max_rpm));
        out
    }

    fn decode(text: &str) -> std::result::Result<Self, String> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let (maxima, core_lines) = lines
            .split_last()
            .ok_or_else(|| "empty cpu cache".to_string())?;

        let mut cores = Vec::with_capacity(core_lines.len());
        for line in core_lines {
            let f = fields(line, 2)?;
            cores.push(CoreTicks {
                total: parse_field(f[0], "total ticks")?,
                idle: parse_field(f[1], "idle ticks")?,
            });
        }

        let f = fields(maxima, 2)?;
        Ok(CpuRecord {
            cores,
            max_temp: parse_field(f[0], "maximum temperature")?,
            max_rpm: parse_field(f[1], "maximum rpm")?,
        })
    }
}

/// Byte counters of an interface and the monotonic time they were read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetRecord {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub nanos: u64,
}

impl CacheRecord for NetRecord {
    fn encode(&self) -> String {
        format!("{} {} {}\n", self.rx_bytes, self.tx_bytes, self.nanos)
    }

    fn decode(text: &str) -> std::result::Result<Self, String> {
        let line = text.lines().next().unwrap_or("");
        let f = fields(line, 3)?;
        Ok(NetRecord {
            rx_bytes: parse_field(f[0], "rx bytes")?,
            tx_bytes: parse_field(f[1], "tx bytes")?,
            nanos: parse_field(f[2], "timestamp")?,
        })
    }
}

/// Device backing a mount path and the hottest temperature seen.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskRecord {
    pub mount_path: String,
    pub device_path: String,
    pub max_temp: f32,
}

impl CacheRecord for DiskRecord {
    fn encode(&self) -> String {
        format!(
            "{} {} {}\n",
            encode_mount_field(&self.mount_path),
            encode_mount_field(&self.device_path),
            self.max_temp
        )
    }

    fn decode(text: &str) -> std::result::Result<Self, String> {
        let line = text.lines().next().unwrap_or("");
        let f = fields(line, 3)?;
        Ok(DiskRecord {
            mount_path: decode_mount_field(f[0]),
            device_path: decode_mount_field(f[1]),
            max_temp: parse_field(f[2], "maximum temperature")?,
        })
    }
}
