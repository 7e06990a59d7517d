//! CLI arguments for the four monitors.
//!
//! This module defines the command-line interface of each program using the
//! clap library, plus the conversion of parsed arguments into the immutable
//! option values the commands run with.

use clap::error::ErrorKind;
use clap::{ArgAction, Args, Parser};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::commands::cpuinfo::CpuOptions;
use crate::commands::diskinfo::DiskOptions;
use crate::commands::meminfo::MemOptions;
use crate::commands::netinfo::NetOptions;
use crate::delta::RateUnit;
use crate::error::{Error, Result, EXIT_USAGE};
use crate::format::TempUnit;

/// Icon directory below the user's home.
pub const ICON_DIR: &str = ".genmon-icon";

const AFTER_HELP: &str = "Output is a genmon XML fragment; run from the XFCE generic monitor plugin.";

/// Flags every monitor accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Display debugging output on stderr
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Set the icon filename (-iFILE, -i=FILE, --icon=FILE), or disable the icon (-i)
    #[arg(
        short = 'i',
        long,
        value_name = "FILE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    pub icon: Option<String>,

    /// Display version information
    #[arg(short = 'v', long, action = ArgAction::Version, value_parser = clap::value_parser!(bool))]
    pub version: (),
}

/// CPU temperature, fan speed and per-core usage monitor
#[derive(Parser, Debug)]
#[command(name = "cpuinfo", version, disable_version_flag = true, after_help = AFTER_HELP)]
pub struct CpuArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Display CPU usage
    #[arg(short = 'c', long)]
    pub cpuusage: bool,

    /// Display temperature in farenheit
    #[arg(short = 'F', long)]
    pub farenheit: bool,

    /// Colour readings by severity using Pango markup
    #[arg(short = 'm', long)]
    pub markup: bool,
}

/// Memory usage monitor
#[derive(Parser, Debug)]
#[command(name = "meminfo", version, disable_version_flag = true, after_help = AFTER_HELP)]
pub struct MemArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Display the percent bar
    #[arg(short = 'p', long)]
    pub percentbar: bool,
}

/// Disk usage and temperature monitor
#[derive(Parser, Debug)]
#[command(name = "diskinfo", version, disable_version_flag = true, after_help = AFTER_HELP)]
pub struct DiskArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Display the percent bar
    #[arg(short = 'p', long)]
    pub percentbar: bool,

    /// Set the disk path to read temperature from
    #[arg(short = 't', long, value_name = "DISK")]
    pub disktemp: Option<String>,

    /// Display temperature in farenheit
    #[arg(short = 'F', long)]
    pub farenheit: bool,

    /// Mount path of the filesystem to monitor
    pub mountpath: String,
}

/// Network throughput monitor
#[derive(Parser, Debug)]
#[command(name = "netinfo", version, disable_version_flag = true, after_help = AFTER_HELP)]
pub struct NetArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Display rates in bits/second
    #[arg(short = 'b', long)]
    pub bitspersec: bool,

    /// Network interface to monitor
    pub interface: String,
}

/// Rewrites an attached short icon argument (`-iFILE`) to `-i=FILE`.
///
/// The icon value must otherwise be given with `=` so that a bare `-i` never
/// swallows the positional argument that follows it. Flags bundled before
/// the `i` (`-ci`) and everything after `--` are left alone.
pub fn attach_icon_values<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut out = Vec::new();
    let mut positional_only = false;
    for arg in args {
        let arg: OsString = arg.into();
        if !positional_only {
            if arg == "--" {
                positional_only = true;
            } else if let Some(value) = arg.to_str().and_then(|s| s.strip_prefix("-i")) {
                if !value.is_empty() && !value.starts_with('=') {
                    out.push(OsString::from(format!("-i={value}")));
                    continue;
                }
            }
        }
        out.push(arg);
    }
    out
}

/// Parses `argv`, exiting 0 for help/version and 1 for any usage error.
pub fn parse_or_exit<P: Parser>() -> P {
    match P::try_parse_from(attach_icon_values(std::env::args_os())) {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE as i32,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

/// `$HOME`, if set and non-empty.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// Resolves the `--icon` argument of `program`.
///
/// No flag gives `~/.genmon-icon/<program>.png`, a bare flag disables the
/// icon, an absolute path is used as-is and a relative one resolves under
/// `~/.genmon-icon/`.
pub fn resolve_icon(arg: Option<&str>, program: &str, home: Option<&Path>) -> Result<Option<PathBuf>> {
    match arg {
        Some("") => Ok(None),
        Some(path) if Path::new(path).is_absolute() => Ok(Some(PathBuf::from(path))),
        other => {
            let home = home.ok_or_else(|| Error::precondition("HOME is not set"))?;
            let name = other
                .map(str::to_string)
                .unwrap_or_else(|| format!("{program}.png"));
            Ok(Some(home.join(ICON_DIR).join(name)))
        }
    }
}

impl CommonArgs {
    fn icon_for(&self, program: &str) -> Result<Option<PathBuf>> {
        resolve_icon(self.icon.as_deref(), program, home_dir().as_deref())
    }
}

impl CpuArgs {
    pub fn options(&self) -> Result<CpuOptions> {
        Ok(CpuOptions {
            show_usage: self.cpuusage,
            unit: TempUnit::from_fahrenheit_flag(self.farenheit),
            markup: self.markup,
            icon: self.common.icon_for("cpuinfo")?,
        })
    }
}

impl MemArgs {
    pub fn options(&self) -> Result<MemOptions> {
        Ok(MemOptions {
            show_bar: self.percentbar,
            icon: self.common.icon_for("meminfo")?,
        })
    }
}

impl DiskArgs {
    pub fn options(&self) -> Result<DiskOptions> {
        Ok(DiskOptions {
            mount_path: self.mountpath.clone(),
            temp_device: self.disktemp.clone(),
            show_bar: self.percentbar,
            unit: TempUnit::from_fahrenheit_flag(self.farenheit),
            icon: self.common.icon_for("diskinfo")?,
        })
    }
}

impl NetArgs {
    pub fn options(&self) -> Result<NetOptions> {
        Ok(NetOptions {
            interface: self.interface.clone(),
            unit: if self.bitspersec {
                RateUnit::KilobitsPerSec
            } else {
                RateUnit::KibibytesPerSec
            },
            icon: self.common.icon_for("netinfo")?,
        })
    }
}
