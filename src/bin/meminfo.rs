//! Memory usage for genmon.

use std::process::ExitCode;

use genmon_info::cli::{parse_or_exit, MemArgs};
use genmon_info::commands::{command_meminfo, emit, Report};
use genmon_info::config::load_config;
use genmon_info::logging::setup_logging;
use genmon_info::Result;

fn run(args: &MemArgs) -> Result<Report> {
    let opts = args.options()?;
    let config = load_config()?;
    command_meminfo(&config, &opts)
}

fn main() -> ExitCode {
    let args: MemArgs = parse_or_exit();
    setup_logging(args.common.debug);
    emit(run(&args))
}
