//! Per-core tick counters from /proc/stat and CPU sensor readings.

use std::path::Path;

use crate::config::Config;
use crate::delta::CoreTicks;
use crate::error::{Error, Result};
use crate::system::{helper::run_helper, leading_number, read_proc};

/// CPU tick counters of one `cpuN` line.
#[derive(Debug, Clone, Copy)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// User, nice, system and idle ticks. iowait can decrease between reads
    /// and is not counted.
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle
    }

    pub fn idle_total(&self) -> u64 {
        self.idle
    }

    pub fn ticks(&self) -> CoreTicks {
        CoreTicks {
            total: self.total(),
            idle: self.idle_total(),
        }
    }
}

/// Parses the per-core lines (`cpu0`, `cpu1`, ...) of /proc/stat in order.
///
/// The aggregate `cpu` line is skipped. Each core line needs at least eight
/// numeric tick fields.
pub fn parse_core_stats(content: &str) -> Result<Vec<CpuStat>> {
    let mut cores = Vec::new();

    for line in content.lines() {
        let Some(rest) = line.strip_prefix("cpu") else {
            continue;
        };
        if !rest.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 9 {
            return Err(Error::malformed(
                "/proc/stat",
                format!("expected 8 tick fields for {}, got {}", parts[0], parts.len() - 1),
            ));
        }

        let mut ticks = [0u64; 8];
        for (slot, value) in ticks.iter_mut().zip(&parts[1..9]) {
            *slot = value.parse().map_err(|_| {
                Error::malformed("/proc/stat", format!("bad tick value {value:?} for {}", parts[0]))
            })?;
        }

        cores.push(CpuStat {
            user: ticks[0],
            nice: ticks[1],
            system: ticks[2],
            idle: ticks[3],
            iowait: ticks[4],
            irq: ticks[5],
            softirq: ticks[6],
            steal: ticks[7],
        });
    }

    if cores.is_empty() {
        return Err(Error::malformed("/proc/stat", "no per-core cpu lines"));
    }
    Ok(cores)
}

/// Reads per-core ticks and checks them against the declared core count.
pub fn read_core_ticks(proc_root: &Path, expected_cores: Option<usize>) -> Result<Vec<CoreTicks>> {
    let cores = parse_core_stats(&read_proc(proc_root, "stat")?)?;
    if let Some(expected) = expected_cores {
        if cores.len() != expected {
            return Err(Error::precondition(format!(
                "configured for {expected} cores but /proc/stat lists {}",
                cores.len()
            )));
        }
    }
    Ok(cores.iter().map(CpuStat::ticks).collect())
}

/// CPU temperature (Celsius) and fan speed from the sensors helper.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temp_c: f32,
    pub rpm: u32,
}

/// Extracts the readings from `sensors` output.
///
/// A label that never appears reads as 0; a label followed by something that
/// is not a number is an error.
pub fn parse_sensors(output: &str, temp_label: &str, fan_label: &str) -> Result<SensorReading> {
    let mut reading = SensorReading::default();

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix(temp_label) {
            reading.temp_c = leading_number(rest).ok_or_else(|| {
                Error::malformed("sensors output", format!("no temperature in {line:?}"))
            })?;
        } else if let Some(rest) = line.strip_prefix(fan_label) {
            let rpm = leading_number(rest).ok_or_else(|| {
                Error::malformed("sensors output", format!("no fan speed in {line:?}"))
            })?;
            reading.rpm = rpm.max(0.0) as u32;
        }
    }

    Ok(reading)
}

/// Runs the configured sensors command and parses its output.
pub async fn read_sensors(config: &Config) -> Result<SensorReading> {
    let output = run_helper(&config.sensors_command(), config.helper_timeout()).await?;
    parse_sensors(&output, config.temp_label(), config.fan_label())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_STAT: &str = "\
cpu  4705 356 584 3699 23 23 0 0 0 0
cpu0 1393280 32966 572056 13343292 6130 0 17875 0 0 0
cpu1 1335996 30680 534588 13382617 5965 0 3296 0 0 0
intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
ctxt 1990473
btime 1062191376
";

    #[test]
    fn test_parse_core_stats_skips_aggregate() {
        let cores = parse_core_stats(PROC_STAT).unwrap();
        assert_eq!(cores.len(), 2);
        assert_eq!(cores[0].user, 1393280);
        assert_eq!(cores[1].idle, 13382617);
        assert_eq!(cores[0].total(), 1393280 + 32966 + 572056 + 13343292);
        assert_eq!(cores[0].idle_total(), 13343292);
    }

    #[test]
    fn test_busy_core_with_falling_iowait() {
        let prev = parse_core_stats("cpu0 1000 0 0 400 100 0 0 0\n").unwrap()[0].ticks();
        let cur = parse_core_stats("cpu0 2000 0 0 400 90 0 0 0\n").unwrap()[0].ticks();
        assert!(!cur.regressed_from(&prev));
        assert_eq!(crate::delta::busy_percent(Some(&prev), &cur), 100);
    }

    #[test]
    fn test_parse_core_stats_rejects_short_lines() {
        let err = parse_core_stats("cpu0 1 2 3 4\n").unwrap_err();
        assert!(matches!(err, Error::MalformedData { .. }));
        assert!(parse_core_stats("cpu0 1 2 3 4 5 6 x 8\n").is_err());
        assert!(parse_core_stats("intr 1 2 3\n").is_err());
    }

    #[test]
    fn test_declared_core_count_must_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stat"), PROC_STAT).unwrap();

        assert_eq!(read_core_ticks(dir.path(), None).unwrap().len(), 2);
        assert_eq!(read_core_ticks(dir.path(), Some(2)).unwrap().len(), 2);
        let err = read_core_ticks(dir.path(), Some(4)).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn test_parse_sensors_output() {
        let output = "\
it8712-isa-0290
Adapter: ISA adapter
CPU Fan Speed: 2177 RPM  (min = 3000 RPM)
temp1:        +47.5°C  (high = +70.0°C, crit = +85.0°C)
temp2:        +31.0°C
";
        let reading = parse_sensors(output, "temp1:", "CPU Fan Speed:").unwrap();
        assert_eq!(reading, SensorReading { temp_c: 47.5, rpm: 2177 });
    }

    #[test]
    fn test_parse_sensors_missing_and_bad_lines() {
        let reading = parse_sensors("Adapter: ISA adapter\n", "temp1:", "CPU Fan Speed:").unwrap();
        assert_eq!(reading, SensorReading::default());

        let err = parse_sensors("temp1:        N/A\n", "temp1:", "CPU Fan Speed:").unwrap_err();
        assert!(matches!(err, Error::MalformedData { .. }));
    }
}
