//! Disk monitor: filesystem usage and drive temperature.
//!
//! The device backing the mount path is found by scanning /proc/mounts once
//! and then remembered in the cache together with the hottest temperature
//! seen, so later runs only stat the filesystem and ask hddtemp.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cache::{CacheStore, DiskRecord, ResourceKey};
use crate::commands::Report;
use crate::config::Config;
use crate::delta::running_max;
use crate::error::{Error, Result, EXIT_FS_UNAVAILABLE, EXIT_RESOURCE_ABSENT};
use crate::format::{gib, gib_compact, Fragment, TempUnit};
use crate::system::disk::{
    device_id, find_device, parse_mounts, read_drive_temp, split_dev, statvfs, FsUsage,
};
use crate::system::read_proc;

/// Display options of `diskinfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskOptions {
    pub mount_path: String,
    /// Device to query for the temperature instead of the backing device
    pub temp_device: Option<String>,
    pub show_bar: bool,
    pub unit: TempUnit,
    pub icon: Option<PathBuf>,
}

/// Everything `diskinfo` shows, temperatures in Celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskReading {
    pub id: String,
    pub mount_path: String,
    pub device_path: String,
    pub usage: FsUsage,
    pub temp_c: Option<f32>,
    pub max_temp_c: f32,
}

/// Whole degrees in `unit`, or `--` without a reading.
fn degrees(celsius: Option<f32>, unit: TempUnit) -> String {
    match celsius {
        Some(c) => format!("{}°{}", unit.convert(c) as i32, unit.symbol()),
        None => format!("--°{}", unit.symbol()),
    }
}

pub fn render(reading: &DiskReading, opts: &DiskOptions) -> Fragment {
    let total = gib(reading.usage.total_bytes());
    let free = gib(reading.usage.free_bytes());
    let used = gib(reading.usage.used_bytes());
    let percent = reading.usage.used_percent();

    Fragment {
        icon: opts.icon.clone(),
        text: format!(
            "{}\n{}G",
            degrees(reading.temp_c, opts.unit),
            gib_compact(used)
        ),
        tool: format!(
            "ID: {}\nMount: {}  Device: {}\nTotal: {:.2}G  Available: {:.2}G  Used: {:.2}G ({}%)\nMaximum temperature observed: {}",
            reading.id,
            reading.mount_path,
            reading.device_path,
            total,
            free,
            used,
            percent,
            degrees(Some(reading.max_temp_c), opts.unit)
        ),
        bar: opts.show_bar.then_some(percent),
    }
}

/// Scans /proc/mounts for the block device holding `dev`.
fn scan_device(config: &Config, mount_path: &str, dev: u64) -> Result<String> {
    let mounts = parse_mounts(&read_proc(&config.proc_root(), "mounts")?)?;
    find_device(&mounts, dev, |p: &Path| device_id(p).ok()).ok_or_else(|| {
        Error::precondition(format!("no block device found for mount path {mount_path}"))
    })
}

/// Stats the filesystem, resolves its device, reads the drive temperature
/// and renders the fragment.
pub async fn command_diskinfo(config: &Config, store: &CacheStore, opts: &DiskOptions) -> Result<Report> {
    let mount = Path::new(&opts.mount_path);
    let usage = statvfs(mount).map_err(|e| {
        Error::unavailable(
            format!("filesystem {}", opts.mount_path),
            e.to_string(),
            EXIT_FS_UNAVAILABLE,
        )
    })?;
    let dev = device_id(mount).map_err(|e| {
        Error::unavailable(
            format!("mount path {}", opts.mount_path),
            e.to_string(),
            EXIT_RESOURCE_ABSENT,
        )
    })?;
    let (major, minor) = split_dev(dev);
    let key = ResourceKey::Disk { major, minor };

    let prev: Option<DiskRecord> = store.load(&key)?;
    let (device_path, prev_max, mut update) = match prev {
        Some(record) if record.mount_path == opts.mount_path => {
            (record.device_path, record.max_temp, false)
        }
        Some(record) => {
            info!(
                "Cached mount path {} does not match {}, rescanning mounts",
                record.mount_path, opts.mount_path
            );
            (scan_device(config, &opts.mount_path, dev)?, record.max_temp, true)
        }
        None => (scan_device(config, &opts.mount_path, dev)?, 0.0, true),
    };
    debug!("Mount {} is backed by {}", opts.mount_path, device_path);

    let temp_device = opts.temp_device.as_deref().unwrap_or(&device_path);
    let drive = read_drive_temp(config, temp_device).await?;
    let max_temp_c = running_max(prev_max, drive.temp_c.unwrap_or(prev_max));
    if max_temp_c > prev_max {
        update = true;
    }

    if update {
        let record = DiskRecord {
            mount_path: opts.mount_path.clone(),
            device_path: device_path.clone(),
            max_temp: max_temp_c,
        };
        store.store(&key, &record)?;
    }

    let reading = DiskReading {
        id: drive.id,
        mount_path: opts.mount_path.clone(),
        device_path,
        usage,
        temp_c: drive.temp_c,
        max_temp_c,
    };
    Ok(Report::ok(render(&reading, opts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheRecord;
    use crate::config::DiskTopology;
    use std::fs;

    fn opts(mount_path: &str) -> DiskOptions {
        DiskOptions {
            mount_path: mount_path.to_string(),
            temp_device: None,
            show_bar: true,
            unit: TempUnit::Celsius,
            icon: None,
        }
    }

    fn reading() -> DiskReading {
        DiskReading {
            id: "WDC WD10EZEX".into(),
            mount_path: "/home".into(),
            device_path: "/dev/sda2".into(),
            usage: FsUsage {
                blocks: 1_000_000,
                free_blocks: 250_000,
                block_size: 4096,
            },
            temp_c: Some(38.6),
            max_temp_c: 44.0,
        }
    }

    /// Fake proc tree whose mount table lists `mount` as backed by `/dev/fake1`,
    /// and an hddtemp stand-in echoing the queried device.
    fn fixture(mount: &Path, temp: &str) -> (tempfile::TempDir, Config) {
        let proc_dir = tempfile::tempdir().unwrap();
        fs::write(
            proc_dir.path().join("mounts"),
            format!(
                "proc /proc proc rw 0 0\n/dev/fake1 {} ext4 rw 0 0\n",
                mount.display()
            ),
        )
        .unwrap();
        let config = Config {
            proc_root: Some(proc_dir.path().to_path_buf()),
            disk: DiskTopology {
                hddtemp_command: Some(vec![
                    "sh".into(),
                    "-c".into(),
                    format!("printf '%s: TEST DRIVE: {temp}\\n' \"$0\""),
                ]),
            },
            ..Config::default()
        };
        (proc_dir, config)
    }

    #[test]
    fn test_render_scenario() {
        let frag = render(&reading(), &opts("/home"));
        assert_eq!(frag.text, "38°C\n2.9G");
        assert_eq!(
            frag.tool,
            "ID: WDC WD10EZEX\nMount: /home  Device: /dev/sda2\nTotal: 3.81G  Available: 0.95G  Used: 2.86G (75%)\nMaximum temperature observed: 44°C"
        );
        assert_eq!(frag.bar, Some(75));
    }

    #[test]
    fn test_render_fahrenheit_and_missing_temperature() {
        let mut r = reading();
        r.temp_c = None;
        let mut o = opts("/home");
        o.unit = TempUnit::Fahrenheit;
        o.show_bar = false;
        let frag = render(&r, &o);
        assert!(frag.text.starts_with("--°F\n"));
        assert!(frag.tool.ends_with("Maximum temperature observed: 111°F"));
        assert_eq!(frag.bar, None);
    }

    #[tokio::test]
    async fn test_first_run_scans_mounts_then_uses_cache() {
        let mount = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(cache_dir.path(), 1000);
        let (proc_dir, config) = fixture(mount.path(), "41°C");
        let o = opts(&mount.path().to_string_lossy());

        let report = command_diskinfo(&config, &store, &o).await.unwrap();
        assert_eq!(report.exit_code, 0);
        assert!(report.fragment.text.starts_with("41°C\n"));
        assert!(report.fragment.tool.starts_with("ID: TEST DRIVE\n"));
        assert!(report.fragment.tool.contains("Device: /dev/fake1\n"));

        let (major, minor) = split_dev(device_id(mount.path()).unwrap());
        let key = ResourceKey::Disk { major, minor };
        let cached: DiskRecord = store.load(&key).unwrap().unwrap();
        assert_eq!(cached.device_path, "/dev/fake1");
        assert_eq!(cached.max_temp, 41.0);

        // The device now comes from the cache; the mount table is not needed
        fs::remove_file(proc_dir.path().join("mounts")).unwrap();
        let report = command_diskinfo(&config, &store, &o).await.unwrap();
        assert!(report.fragment.tool.contains("Device: /dev/fake1\n"));
    }

    #[tokio::test]
    async fn test_maximum_kept_and_temp_device_override() {
        let mount = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(cache_dir.path(), 1000);
        let (_proc_dir, config) = fixture(mount.path(), "35°C");
        let (major, minor) = split_dev(device_id(mount.path()).unwrap());
        let key = ResourceKey::Disk { major, minor };
        let mount_path = mount.path().to_string_lossy().to_string();

        // Stale mount path forces a rescan but keeps the maximum
        store
            .store(
                &key,
                &DiskRecord {
                    mount_path: "/elsewhere".into(),
                    device_path: "/dev/old".into(),
                    max_temp: 50.0,
                },
            )
            .unwrap();

        let mut o = opts(&mount_path);
        o.temp_device = Some("/dev/sdz".into());
        let report = command_diskinfo(&config, &store, &o).await.unwrap();
        assert!(report.fragment.text.starts_with("35°C\n"));
        assert!(report.fragment.tool.ends_with("Maximum temperature observed: 50°C"));

        let cached: DiskRecord = store.load(&key).unwrap().unwrap();
        assert_eq!(cached.mount_path, mount_path);
        assert_eq!(cached.device_path, "/dev/fake1");
        assert_eq!(cached.max_temp, 50.0);
        assert_eq!(DiskRecord::decode(&cached.encode()).unwrap(), cached);
    }

    #[tokio::test]
    async fn test_unavailable_drive_temperature() {
        let mount = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(cache_dir.path(), 1000);
        let (_proc_dir, config) = fixture(mount.path(), "not available");
        let o = opts(&mount.path().to_string_lossy());

        let report = command_diskinfo(&config, &store, &o).await.unwrap();
        assert!(report.fragment.text.starts_with("--°C\n"));
        assert!(report.fragment.tool.ends_with("Maximum temperature observed: 0°C"));
    }

    #[tokio::test]
    async fn test_missing_filesystem_is_exit_2() {
        let cache_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(cache_dir.path(), 1000);
        let err = command_diskinfo(&Config::default(), &store, &opts("/nonexistent/genmon-mount"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_FS_UNAVAILABLE);
        assert_eq!(fs::read_dir(cache_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unlisted_mount_is_precondition() {
        let mount = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(cache_dir.path(), 1000);
        let (proc_dir, config) = fixture(mount.path(), "40°C");
        fs::write(proc_dir.path().join("mounts"), "proc /proc proc rw 0 0\n").unwrap();

        let err = command_diskinfo(&config, &store, &opts(&mount.path().to_string_lossy()))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_PRECONDITION);
    }
}
