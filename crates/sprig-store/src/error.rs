use std::io;
use std::path::{Path, PathBuf};

use sprig_types::ObjectId;

use crate::object::ObjectKind;

/// Ways in which bytes fail to match the object grammar.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// No NUL byte separates the header from the body.
    #[error("missing NUL after header")]
    MissingNul,

    /// The header is not `<kind> <decimal length>`.
    #[error("malformed header {0:?}")]
    MalformedHeader(String),

    /// The header names a kind other than blob, tree or commit.
    #[error("unknown object kind {0:?}")]
    UnknownKind(String),

    /// The declared length disagrees with the bytes that follow the header.
    #[error("header declares {declared} body bytes, found {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// A tree entry is truncated or lacks a separator.
    #[error("malformed tree entry at byte {offset}: {reason}")]
    MalformedTree { offset: usize, reason: &'static str },

    /// A tree entry mode is not one of `100644` or `40000`.
    #[error("unsupported tree entry mode {0:?}")]
    UnknownMode(String),

    /// A tree entry name is empty or contains NUL.
    #[error("invalid tree entry name {0:?}")]
    InvalidEntryName(String),

    /// A commit body does not follow the header-lines-then-message layout.
    #[error("malformed commit: {0}")]
    MalformedCommit(String),
}

/// Coarse classification of a [`StoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bytes do not match the header/body grammar.
    Format,
    /// Content does not hash to the requested ID, or has the wrong kind.
    Integrity,
    /// The requested object does not exist.
    Lookup,
    /// The filesystem failed.
    Io,
}

/// Errors from object store and codec operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bytes do not follow the object grammar.
    #[error("malformed object {}: {source}", subject(.id))]
    Format {
        id: Option<ObjectId>,
        #[source]
        source: FormatError,
    },

    /// The compressed stream could not be inflated.
    #[error("cannot decompress {id} at {}: {source}", .path.display())]
    Decompress {
        id: ObjectId,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {id}: content hashes to {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    /// The object is of a different kind than the caller asked for.
    #[error("kind mismatch for {}: expected {expected}, found {actual}", subject(.id))]
    KindMismatch {
        id: Option<ObjectId>,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// The requested object was not found.
    #[error("object not found: {id}{}", location(.path))]
    NotFound { id: ObjectId, path: Option<PathBuf> },

    /// I/O error from the underlying storage backend.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Which of the four error classes this belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Format { .. } | Self::Decompress { .. } => ErrorClass::Format,
            Self::HashMismatch { .. } | Self::KindMismatch { .. } => ErrorClass::Integrity,
            Self::NotFound { .. } => ErrorClass::Lookup,
            Self::Io { .. } => ErrorClass::Io,
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn subject(id: &Option<ObjectId>) -> String {
    match id {
        Some(id) => id.to_hex(),
        None => "<unhashed>".to_string(),
    }
}

fn location(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" (expected at {})", path.display()),
        None => String::new(),
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        let id = ObjectId::from_hash([1; 20]);
        let format = StoreError::Format {
            id: None,
            source: FormatError::MissingNul,
        };
        let integrity = StoreError::HashMismatch {
            id,
            computed: ObjectId::from_hash([2; 20]),
        };
        let lookup = StoreError::NotFound { id, path: None };
        let io = StoreError::io(Path::new("/x"), io::Error::other("boom"));
        assert_eq!(format.class(), ErrorClass::Format);
        assert_eq!(integrity.class(), ErrorClass::Integrity);
        assert_eq!(lookup.class(), ErrorClass::Lookup);
        assert_eq!(io.class(), ErrorClass::Io);
    }

    #[test]
    fn messages_name_the_object() {
        let id = ObjectId::from_hash([0xab; 20]);
        let err = StoreError::NotFound {
            id,
            path: Some(PathBuf::from("objects/ab/abab")),
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_hex()));
        assert!(msg.contains("objects/ab/abab"));

        let err = StoreError::Format {
            id: None,
            source: FormatError::LengthMismatch {
                declared: 5,
                actual: 4,
            },
        };
        assert_eq!(
            err.to_string(),
            "malformed object <unhashed>: header declares 5 body bytes, found 4"
        );
    }
}
