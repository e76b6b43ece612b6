//! Repository layer for sprig.
//!
//! Builds on the object store to snapshot a work tree:
//!
//! - [`RepoContext`] -- what the builders need from a repository
//! - [`TreeBuilder`] -- walks a directory and writes nested trees bottom-up
//! - [`CommitBuilder`] -- wraps a tree with parents, identity and message
//! - [`Repository`] -- the on-disk context: `.sprig/` layout, `config.toml`
//!   and ignore patterns
//! - [`verify_store`] -- re-reads every object and checks references

pub mod commit;
pub mod config;
pub mod context;
pub mod error;
pub mod repository;
pub mod tree;
pub mod verify;

pub use commit::CommitBuilder;
pub use config::RepoConfig;
pub use context::RepoContext;
pub use error::{SdkError, SdkResult};
pub use repository::{Repository, TreeListing, CONFIG_FILE, METADATA_DIR};
pub use tree::{EntryOrder, TreeBuilder};
pub use verify::{verify_store, VerifyReport, Violation, ViolationKind};

// Re-export key types
pub use sprig_store::{
    Blob, Commit, EntryMode, ErrorClass, LooseObjectStore, Object, ObjectKind, ObjectStore,
    Record, StoreError, Tree, TreeEntry,
};
pub use sprig_types::{Identity, ObjectId, Signature, Timestamp};
