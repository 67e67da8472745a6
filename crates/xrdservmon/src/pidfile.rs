use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while reading a PID file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The file could not be read.
    #[error("failed to read pid file '{path}': {source}")]
    Read {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file exists but holds nothing yet.
    #[error("pid file '{path}' is empty")]
    Empty {
        /// PID file path.
        path: PathBuf,
    },
    /// The file did not hold a process identifier.
    #[error("failed to parse pid file '{path}': {source}")]
    Parse {
        /// PID file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: ParseIntError,
    },
}

impl PidFileError {
    /// Returns true when the file simply does not exist.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Reads the PID on the first line of `path`, tolerating surrounding whitespace.
pub(crate) fn read_pid(path: &Path) -> Result<u32, PidFileError> {
    let content = fs::read_to_string(path).map_err(|source| PidFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let Some(first_line) = content.trim().lines().next() else {
        return Err(PidFileError::Empty {
            path: path.to_path_buf(),
        });
    };
    first_line
        .trim()
        .parse::<u32>()
        .map_err(|source| PidFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
