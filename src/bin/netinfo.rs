//! Network interface throughput for genmon.

use std::process::ExitCode;

use genmon_info::cache::CacheStore;
use genmon_info::cli::{parse_or_exit, NetArgs};
use genmon_info::commands::{command_netinfo, emit, Report};
use genmon_info::config::load_config;
use genmon_info::logging::setup_logging;
use genmon_info::Result;

async fn run(args: &NetArgs) -> Result<Report> {
    let opts = args.options()?;
    let config = load_config()?;
    let store = CacheStore::for_current_user(config.cache_dir());
    command_netinfo(&config, &store, &opts).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: NetArgs = parse_or_exit();
    setup_logging(args.common.debug);
    emit(run(&args).await)
}
