//! CPU monitor: per-core usage, temperature and fan speed.

use std::path::PathBuf;
use tracing::debug;

use crate::cache::{CacheStore, CpuRecord, ResourceKey};
use crate::commands::Report;
use crate::config::Config;
use crate::delta::{busy_percent, running_max, CoreTicks};
use crate::error::Result;
use crate::format::{pad_bytes, percent_cell, Fragment, Severity, TempUnit, PERCENT_BANDS};
use crate::system::cpu::{read_core_ticks, read_sensors, SensorReading};

/// Display options of `cpuinfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuOptions {
    pub show_usage: bool,
    pub unit: TempUnit,
    pub markup: bool,
    pub icon: Option<PathBuf>,
}

/// Everything `cpuinfo` shows, temperatures in Celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuReading {
    pub busy: Vec<u8>,
    pub temp_c: f32,
    pub rpm: u32,
    pub max_temp_c: f32,
    pub max_rpm: u32,
}

/// Folds a fresh sample into the cached record.
///
/// A cached record with a different core count is treated as absent for the
/// usage figures; its maxima are kept.
pub fn advance(
    prev: Option<&CpuRecord>,
    cores: Vec<CoreTicks>,
    sensors: SensorReading,
) -> (CpuReading, CpuRecord) {
    let prev_cores: &[CoreTicks] = match prev {
        Some(p) if p.cores.len() == cores.len() => p.cores.as_slice(),
        Some(p) => {
            debug!(
                "Cached core count {} differs from {}, resetting usage baseline",
                p.cores.len(),
                cores.len()
            );
            &[]
        }
        None => &[],
    };

    let busy = cores
        .iter()
        .enumerate()
        .map(|(i, cur)| busy_percent(prev_cores.get(i), cur))
        .collect();

    let max_temp_c = running_max(prev.map_or(0.0, |p| p.max_temp), sensors.temp_c);
    let max_rpm = running_max(prev.map_or(0, |p| p.max_rpm), sensors.rpm);

    let reading = CpuReading {
        busy,
        temp_c: sensors.temp_c,
        rpm: sensors.rpm,
        max_temp_c,
        max_rpm,
    };
    let record = CpuRecord {
        cores,
        max_temp: max_temp_c,
        max_rpm,
    };
    (reading, record)
}

/// Renders the reading; `temp_bands` are the Celsius severity breakpoints.
pub fn render(reading: &CpuReading, opts: &CpuOptions, temp_bands: [f32; 3]) -> Fragment {
    let unit = opts.unit;
    let temp = unit.convert(reading.temp_c);
    let max_temp = unit.convert(reading.max_temp_c);

    let emphasize = |severity: Severity, text: String| {
        if opts.markup {
            severity.render(&text)
        } else {
            text
        }
    };

    let mut line1 = emphasize(
        Severity::classify_temp(temp, temp_bands, unit),
        pad_bytes(&format!("{:3.1}°{}", temp, unit.symbol()), 8),
    );
    let mut line2 = format!("{:>7}", format!("{:<4}rpm", reading.rpm));

    if opts.show_usage {
        let split = (reading.busy.len() + 1) / 2;
        for (i, &percent) in reading.busy.iter().enumerate() {
            let cell = emphasize(
                Severity::classify(percent as f32, PERCENT_BANDS),
                percent_cell(percent),
            );
            let line = if i < split { &mut line1 } else { &mut line2 };
            line.push(' ');
            line.push_str(&cell);
        }
    }

    Fragment {
        icon: opts.icon.clone(),
        text: format!("{line1}\n{line2}"),
        tool: format!(
            "Maximum temperature observed: {:.1}°{}\nMaximum RPM observed: {}rpm",
            max_temp,
            unit.symbol(),
            reading.max_rpm
        ),
        bar: None,
    }
}

/// Samples the CPU, updates the cache and renders the fragment.
pub async fn command_cpuinfo(config: &Config, store: &CacheStore, opts: &CpuOptions) -> Result<Report> {
    let cores = read_core_ticks(&config.proc_root(), config.cpu.cores)?;
    let sensors = read_sensors(config).await?;
    debug!("Sampled {} cores, sensors {:?}", cores.len(), sensors);

    let prev: Option<CpuRecord> = store.load(&ResourceKey::Cpu)?;
    let (reading, record) = advance(prev.as_ref(), cores, sensors);
    store.store(&ResourceKey::Cpu, &record)?;

    Ok(Report::ok(render(&reading, opts, config.cpu_temp_bands())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CpuTopology;
    use std::fs;

    const BANDS: [f32; 3] = [55.0, 70.0, 85.0];

    fn ticks(pairs: &[(u64, u64)]) -> Vec<CoreTicks> {
        pairs
            .iter()
            .map(|&(total, idle)| CoreTicks { total, idle })
            .collect()
    }

    fn opts(show_usage: bool) -> CpuOptions {
        CpuOptions {
            show_usage,
            unit: TempUnit::Celsius,
            markup: false,
            icon: None,
        }
    }

    #[test]
    fn test_first_run_is_zero_baseline() {
        let sensors = SensorReading { temp_c: 48.0, rpm: 1500 };
        let (reading, record) = advance(None, ticks(&[(1000, 900), (1000, 500)]), sensors);
        assert_eq!(reading.busy, vec![0, 0]);
        assert_eq!(reading.max_temp_c, 48.0);
        assert_eq!(record.cores.len(), 2);
        assert_eq!(record.max_rpm, 1500);
    }

    #[test]
    fn test_usage_and_maxima_from_cache() {
        let prev = CpuRecord {
            cores: ticks(&[(1000, 900), (1000, 900)]),
            max_temp: 60.0,
            max_rpm: 1200,
        };
        let sensors = SensorReading { temp_c: 50.0, rpm: 1800 };
        let (reading, record) = advance(Some(&prev), ticks(&[(2000, 1000), (2000, 1900)]), sensors);
        assert_eq!(reading.busy, vec![90, 0]);
        assert_eq!(reading.max_temp_c, 60.0);
        assert_eq!(reading.max_rpm, 1800);
        assert_eq!(record.cores, ticks(&[(2000, 1000), (2000, 1900)]));
    }

    #[test]
    fn test_core_count_change_resets_usage_only() {
        let prev = CpuRecord {
            cores: ticks(&[(1000, 900)]),
            max_temp: 70.0,
            max_rpm: 2000,
        };
        let (reading, _) = advance(Some(&prev), ticks(&[(2000, 1000), (2000, 1000)]), SensorReading::default());
        assert_eq!(reading.busy, vec![0, 0]);
        assert_eq!((reading.max_temp_c, reading.max_rpm), (70.0, 2000));
    }

    #[test]
    fn test_render_plain() {
        let reading = CpuReading {
            busy: vec![5, 42, 100, 7],
            temp_c: 45.5,
            rpm: 980,
            max_temp_c: 61.0,
            max_rpm: 2100,
        };
        let frag = render(&reading, &opts(false), BANDS);
        assert_eq!(frag.text, " 45.5°C\n980 rpm");
        assert_eq!(
            frag.tool,
            "Maximum temperature observed: 61.0°C\nMaximum RPM observed: 2100rpm"
        );

        let frag = render(&reading, &opts(true), BANDS);
        assert_eq!(frag.text, " 45.5°C  5% 42%\n980 rpm 100  7%");
    }

    #[test]
    fn test_render_fahrenheit_and_markup() {
        let reading = CpuReading {
            busy: vec![95],
            temp_c: 100.0,
            rpm: 1500,
            max_temp_c: 100.0,
            max_rpm: 1500,
        };
        let options = CpuOptions {
            show_usage: true,
            unit: TempUnit::Fahrenheit,
            markup: true,
            icon: Some(PathBuf::from("/icons/cpu.png")),
        };
        let frag = render(&reading, &options, BANDS);
        assert!(frag.text.contains("212.0°F</span>"));
        assert!(frag.text.contains("weight='heavy'>95%</span>"));
        assert!(frag.tool.contains("212.0°F"));
        assert_eq!(frag.icon, Some(PathBuf::from("/icons/cpu.png")));
    }

    #[tokio::test]
    async fn test_command_cycle_against_fake_proc() {
        let proc_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(cache_dir.path(), 1000);
        let config = Config {
            proc_root: Some(proc_dir.path().to_path_buf()),
            cpu: CpuTopology {
                cores: Some(1),
                sensors_command: Some(vec![
                    "sh".into(),
                    "-c".into(),
                    "printf 'temp1:  +52.0°C\\nCPU Fan Speed: 1400 RPM\\n'".into(),
                ]),
                ..CpuTopology::default()
            },
            ..Config::default()
        };

        // total = 600 + 400 = 1000, idle = 400
        fs::write(proc_dir.path().join("stat"), "cpu0 300 100 200 400 0 0 0 0 0 0\n").unwrap();
        let first = command_cpuinfo(&config, &store, &opts(true)).await.unwrap();
        assert_eq!(first.exit_code, 0);
        assert!(first.fragment.text.ends_with(" 0%\n1400rpm"));

        // +1000 total ticks, +100 idle -> 90% busy
        fs::write(proc_dir.path().join("stat"), "cpu0 1200 100 200 500 0 0 0 0 0 0\n").unwrap();
        let second = command_cpuinfo(&config, &store, &opts(true)).await.unwrap();
        assert!(second.fragment.text.starts_with(" 52.0°C 90%"));

        let cached: CpuRecord = store.load(&ResourceKey::Cpu).unwrap().unwrap();
        assert_eq!(cached.cores, ticks(&[(2000, 500)]));
        assert_eq!((cached.max_temp, cached.max_rpm), (52.0, 1400));
    }

    #[tokio::test]
    async fn test_command_rejects_wrong_topology() {
        let proc_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        fs::write(proc_dir.path().join("stat"), "cpu0 1 1 1 1 0 0 0 0\n").unwrap();
        let config = Config {
            proc_root: Some(proc_dir.path().to_path_buf()),
            cpu: CpuTopology {
                cores: Some(4),
                ..CpuTopology::default()
            },
            ..Config::default()
        };
        let store = CacheStore::new(cache_dir.path(), 1000);
        let err = command_cpuinfo(&config, &store, &opts(false)).await.unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_PRECONDITION);
        assert!(store.load::<CpuRecord>(&ResourceKey::Cpu).unwrap().is_none());
    }
}
