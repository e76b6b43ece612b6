use std::path::{Path, PathBuf};

use sprig_types::{Identity, Timestamp};

use crate::error::SdkResult;

/// What the builders need to know about the repository they work in.
///
/// The builders only read from a context; they never change it.
pub trait RepoContext {
    /// Root of the work tree being snapshotted.
    fn work_dir(&self) -> &Path;

    /// Directory holding repository metadata (`objects/`, `refs/`, ...).
    fn metadata_dir(&self) -> &Path;

    fn objects_dir(&self) -> PathBuf {
        self.metadata_dir().join("objects")
    }

    /// Identity recorded on the `author` line.
    fn author(&self) -> SdkResult<Identity>;

    /// Identity recorded on the `committer` line. Defaults to the author.
    fn committer(&self) -> SdkResult<Identity> {
        self.author()
    }

    /// Timestamp for new commits.
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    /// Whether a path, relative to the work tree, is left out of snapshots.
    fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool;
}
