//! Panel monitors for the XFCE generic monitor (genmon) plugin.
//!
//! Four one-shot programs share this library: `cpuinfo`, `meminfo`,
//! `diskinfo` and `netinfo`. Each run samples one subsystem, derives usage
//! or throughput against the previous sample kept in a small cache file,
//! writes the new sample back and prints a genmon XML fragment on stdout.
//!
//! Layout:
//! - [`system`]: samplers over /proc, statvfs and helper programs
//! - [`delta`]: percentages, rates and running maxima from two samples
//! - [`cache`]: per-resource cache records and their atomic store
//! - [`format`]: fragment rendering
//! - [`commands`]: the four monitors wired end to end

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod delta;
pub mod error;
pub mod format;
pub mod logging;
pub mod system;

pub use error::{Error, Result};
