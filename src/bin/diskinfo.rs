//! Filesystem usage and drive temperature for genmon.

use std::process::ExitCode;

use genmon_info::cache::CacheStore;
use genmon_info::cli::{parse_or_exit, DiskArgs};
use genmon_info::commands::{command_diskinfo, emit, Report};
use genmon_info::config::load_config;
use genmon_info::logging::setup_logging;
use genmon_info::Result;

async fn run(args: &DiskArgs) -> Result<Report> {
    let opts = args.options()?;
    let config = load_config()?;
    let store = CacheStore::for_current_user(config.cache_dir());
    command_diskinfo(&config, &store, &opts).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: DiskArgs = parse_or_exit();
    setup_logging(args.common.debug);
    emit(run(&args).await)
}
