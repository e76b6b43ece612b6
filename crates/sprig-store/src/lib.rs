//! Content-addressed object storage for sprig.
//!
//! This crate implements a hash-keyed object store laid out like git's
//! `.git/objects/` directory. Every blob, tree and commit is stored as an
//! immutable object identified by the SHA-1 of its canonical bytes
//! (`"<kind> <len>\0"` followed by the body).
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content, CRLF normalized to LF
//! - [`Tree`] -- ordered directory listing mapping names to object IDs
//! - [`Commit`] -- a tree plus parents, author, committer and message
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LooseObjectStore`] -- one zlib file per object under `objects/xx/`
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written. Writing one again is a no-op.
//! 2. Every read re-hashes the bytes and rejects anything that does not
//!    match the requested ID.
//! 3. Writes land in a temporary file and are renamed into place.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod codec;
pub mod error;
pub mod loose;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use codec::{Encoded, Header, Record};
pub use error::{ErrorClass, FormatError, StoreError, StoreResult};
pub use loose::LooseObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, Object, ObjectKind, Tree, TreeEntry};
pub use traits::ObjectStore;
