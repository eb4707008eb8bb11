use std::path::PathBuf;

use thiserror::Error;

use crate::Value;

/// Failure reading or building a sorted relation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on relation file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a relation file (bad magic)", path.display())]
    BadMagic { path: PathBuf },

    #[error("relation file {} is truncated: expected {expected} bytes, found {actual}", path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("relation input out of order at entry {index}: {value} follows {previous}")]
    Unsorted {
        index: u64,
        previous: Value,
        value: Value,
    },

    #[error("position {position} is outside relation of {len} entries")]
    PositionOutOfRange { position: usize, len: usize },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
