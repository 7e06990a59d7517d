//! Declared host topology and environment for the monitors.
//!
//! The monitors make fixed assumptions about the host: how many cores exist,
//! which `sensors` lines carry the CPU temperature and fan speed, which helper
//! commands to run. Those assumptions live here as configuration loaded once
//! at startup, with defaults matching a stock desktop.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

// Default configuration constants
const DEFAULT_PROC_ROOT: &str = "/proc";
const DEFAULT_CACHE_DIR: &str = "/dev/shm";
const DEFAULT_HELPER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TEMP_LABEL: &str = "temp1:";
const DEFAULT_FAN_LABEL: &str = "CPU Fan Speed:";
const DEFAULT_CPU_TEMP_BANDS: [f32; 3] = [55.0, 70.0, 85.0];

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "GENMON_INFO_CONFIG";

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the per-resource cache files
    pub cache_dir: Option<PathBuf>,
    /// Root of the proc filesystem
    pub proc_root: Option<PathBuf>,
    /// Upper bound on how long a helper command may run
    pub helper_timeout_secs: Option<u64>,
    #[serde(default)]
    pub cpu: CpuTopology,
    #[serde(default)]
    pub disk: DiskTopology,
}

/// Core and sensor layout used by `cpuinfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuTopology {
    /// Expected number of cores; `None` accepts whatever /proc/stat lists
    pub cores: Option<usize>,
    /// Line prefix of the CPU temperature in `sensors` output
    pub temp_label: Option<String>,
    /// Line prefix of the CPU fan speed in `sensors` output
    pub fan_label: Option<String>,
    /// Command (program + arguments) printing sensor readings
    pub sensors_command: Option<Vec<String>>,
    /// Celsius breakpoints for the warning, elevated and critical tiers
    pub temp_bands: Option<[f32; 3]>,
}

/// Helper layout used by `diskinfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskTopology {
    /// Command prefix; the device path is appended as the last argument
    pub hddtemp_command: Option<Vec<String>>,
}

impl Default for CpuTopology {
    fn default() -> Self {
        Self {
            cores: None,
            temp_label: Some(DEFAULT_TEMP_LABEL.into()),
            fan_label: Some(DEFAULT_FAN_LABEL.into()),
            sensors_command: Some(vec!["/usr/bin/sensors".into()]),
            temp_bands: Some(DEFAULT_CPU_TEMP_BANDS),
        }
    }
}

impl Default for DiskTopology {
    fn default() -> Self {
        Self {
            hddtemp_command: Some(vec!["sudo".into(), "hddtemp".into()]),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from(DEFAULT_CACHE_DIR)),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            helper_timeout_secs: Some(DEFAULT_HELPER_TIMEOUT_SECS),
            cpu: CpuTopology::default(),
            disk: DiskTopology::default(),
        }
    }
}

impl Config {
    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    /// Cache directory, falling back to the system temp dir when the
    /// configured one does not exist.
    pub fn cache_dir(&self) -> PathBuf {
        let dir = self
            .cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
        if dir.is_dir() {
            dir
        } else {
            debug!("Cache dir {} missing, using temp dir", dir.display());
            std::env::temp_dir()
        }
    }

    pub fn helper_timeout(&self) -> Duration {
        Duration::from_secs(
            self.helper_timeout_secs
                .unwrap_or(DEFAULT_HELPER_TIMEOUT_SECS),
        )
    }

    pub fn temp_label(&self) -> &str {
        self.cpu.temp_label.as_deref().unwrap_or(DEFAULT_TEMP_LABEL)
    }

    pub fn fan_label(&self) -> &str {
        self.cpu.fan_label.as_deref().unwrap_or(DEFAULT_FAN_LABEL)
    }

    pub fn sensors_command(&self) -> Vec<String> {
        self.cpu
            .sensors_command
            .clone()
            .unwrap_or_else(|| vec!["/usr/bin/sensors".into()])
    }

    pub fn hddtemp_command(&self) -> Vec<String> {
        self.disk
            .hddtemp_command
            .clone()
            .unwrap_or_else(|| vec!["sudo".into(), "hddtemp".into()])
    }

    pub fn cpu_temp_bands(&self) -> [f32; 3] {
        self.cpu.temp_bands.unwrap_or(DEFAULT_CPU_TEMP_BANDS)
    }

    /// Rejects layouts the monitors cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.helper_timeout_secs == Some(0) {
            bail!("helper_timeout_secs must be greater than 0");
        }
        if self.cpu.cores == Some(0) {
            bail!("cpu.cores must be greater than 0 when set");
        }
        for (name, cmd) in [
            ("cpu.sensors_command", &self.cpu.sensors_command),
            ("disk.hddtemp_command", &self.disk.hddtemp_command),
        ] {
            if cmd.as_ref().map_or(false, |c| c.is_empty()) {
                bail!("{name} must name a program");
            }
        }
        if let Some([a, b, c]) = self.cpu.temp_bands {
            if !(a < b && b < c) {
                bail!("cpu.temp_bands must be strictly ascending, got [{a}, {b}, {c}]");
            }
        }
        Ok(())
    }
}

/// Candidate configuration files, most specific first.
fn default_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = std::env::var_os(CONFIG_ENV) {
        paths.push(PathBuf::from(p));
    }
    let exts = ["yaml", "yml", "json", "toml"];
    if let Some(home) = std::env::var_os("HOME") {
        let dir = PathBuf::from(home).join(".config/genmon-info");
        paths.extend(exts.iter().map(|e| dir.join(format!("config.{e}"))));
    }
    paths.extend(
        exts.iter()
            .map(|e| PathBuf::from(format!("/etc/genmon-info/config.{e}"))),
    );
    paths
}

/// Parses a configuration file, choosing the format from its extension.
pub fn load_config_file(path: &Path) -> anyhow::Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON config {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("parsing TOML config {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing YAML config {}", path.display()))?,
    };
    config.validate()?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Loads the first configuration file found, or the defaults.
pub fn load_config() -> Result<Config> {
    match default_locations().into_iter().find(|p| p.is_file()) {
        Some(path) => load_config_file(&path).map_err(Error::Config),
        None => {
            debug!("No configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}
