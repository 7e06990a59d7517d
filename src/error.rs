//! Error taxonomy shared by all monitors.
//!
//! Every failure a monitor can hit after argument parsing maps to one variant
//! here, and every variant maps to a process exit code. Usage errors never
//! get this far: clap reports them and the process exits with
//! [`EXIT_USAGE`]. Monitors never degrade silently: a malformed source or a
//! failed precondition aborts the run.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for bad arguments or a missing positional argument.
pub const EXIT_USAGE: u8 = 1;
/// Exit code when the requested filesystem cannot be stat'ed.
pub const EXIT_FS_UNAVAILABLE: u8 = 2;
/// Exit code when the mount path or network interface is absent.
pub const EXIT_RESOURCE_ABSENT: u8 = 3;
/// Exit code for environment precondition failures.
pub const EXIT_PRECONDITION: u8 = 4;
/// Exit code for malformed cache or kernel data.
pub const EXIT_MALFORMED: u8 = 5;

#[derive(Error, Debug)]
pub enum Error {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("{what} unavailable: {reason}")]
    Unavailable {
        what: String,
        reason: String,
        code: u8,
    },

    #[error("malformed {source_name}: {detail}")]
    MalformedData { source_name: String, detail: String },

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write cache {path:?}: {source}")]
    CacheWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0:#}")]
    Config(#[source] anyhow::Error),
}

impl Error {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn malformed(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedData {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }

    pub fn unavailable(what: impl Into<String>, reason: impl Into<String>, code: u8) -> Self {
        Self::Unavailable {
            what: what.into(),
            reason: reason.into(),
            code,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Unavailable { code, .. } => *code,
            Self::MalformedData { .. } => EXIT_MALFORMED,
            Self::Precondition(_) | Self::Read { .. } | Self::CacheWrite { .. } | Self::Config(_) => {
                EXIT_PRECONDITION
            }
        }
    }
}
