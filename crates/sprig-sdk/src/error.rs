use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("repository not initialized at {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("repository already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("no complete {role} identity configured (both name and email are required)")]
    MissingIdentity { role: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown object {0:?}")]
    UnknownObject(String),

    #[error("ambiguous object prefix {prefix:?} matches {count} objects")]
    AmbiguousPrefix { prefix: String, count: usize },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] sprig_store::StoreError),

    #[error("invalid value: {0}")]
    Type(#[from] sprig_types::TypeError),
}

impl SdkError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
