use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use sprig_store::{
    Blob, EntryMode, LooseObjectStore, ObjectKind, ObjectStore, Record, StoreError,
};
use sprig_types::{Identity, ObjectId, OID_HEX_LEN};
use tracing::{debug, info, warn};

use crate::commit::CommitBuilder;
use crate::config::RepoConfig;
use crate::context::RepoContext;
use crate::error::{SdkError, SdkResult};
use crate::tree::TreeBuilder;
use crate::verify::{verify_store, VerifyReport};

/// Name of the metadata directory at the root of a work tree.
pub const METADATA_DIR: &str = ".sprig";

/// Name of the configuration file inside the metadata directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Subdirectories created by [`Repository::init`]. Only `objects` is
/// written to by this crate.
const LAYOUT: [&str; 5] = ["objects", "refs", "hooks", "info", "logs"];

/// Shortest prefix accepted by [`Repository::resolve`].
pub const MIN_PREFIX_LEN: usize = 4;

/// One line of [`Repository::ls_tree`] output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeListing {
    pub mode: EntryMode,
    /// Kind read from the child's header.
    pub kind: ObjectKind,
    pub id: ObjectId,
    pub name: Vec<u8>,
}

/// A work tree with a `.sprig` metadata directory.
///
/// This is the on-disk [`RepoContext`]: identity comes from `config.toml`
/// and exclusions from the metadata directory plus the ignore file.
#[derive(Debug)]
pub struct Repository {
    work_dir: PathBuf,
    metadata_dir: PathBuf,
    config: RepoConfig,
    ignore: Gitignore,
    store: LooseObjectStore,
}

impl Repository {
    /// Create the metadata layout and a default config under `work_dir`.
    pub fn init(work_dir: impl AsRef<Path>) -> SdkResult<Self> {
        let work_dir = work_dir.as_ref();
        let metadata_dir = work_dir.join(METADATA_DIR);
        if metadata_dir.exists() {
            return Err(SdkError::AlreadyInitialized(metadata_dir));
        }

        for sub in LAYOUT {
            let dir = metadata_dir.join(sub);
            fs::create_dir_all(&dir).map_err(|e| SdkError::io(&dir, e))?;
        }
        RepoConfig::default().save(&metadata_dir.join(CONFIG_FILE))?;

        info!(path = %metadata_dir.display(), "initialized repository");
        Self::open(work_dir)
    }

    /// Open the repository whose work tree is `work_dir`.
    pub fn open(work_dir: impl AsRef<Path>) -> SdkResult<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();
        let metadata_dir = work_dir.join(METADATA_DIR);
        if !metadata_dir.is_dir() {
            return Err(SdkError::NotInitialized(work_dir));
        }

        let config = RepoConfig::load(&metadata_dir.join(CONFIG_FILE))?;
        let ignore = load_ignore(&work_dir, &config.core.ignore_file)?;
        let store = LooseObjectStore::new(metadata_dir.join("objects"))
            .with_compression(config.core.compression);

        debug!(path = %work_dir.display(), "opened repository");
        Ok(Self {
            work_dir,
            metadata_dir,
            config,
            ignore,
            store,
        })
    }

    /// Open the nearest repository at or above `start`.
    pub fn discover(start: impl AsRef<Path>) -> SdkResult<Self> {
        let start = start.as_ref();
        for dir in start.ancestors() {
            if dir.join(METADATA_DIR).is_dir() {
                return Self::open(dir);
            }
        }
        Err(SdkError::NotInitialized(start.to_path_buf()))
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Change one config value and write the file back.
    pub fn set_config(&mut self, key: &str, value: &str) -> SdkResult<()> {
        self.config.set(key, value)?;
        self.config.save(&self.metadata_dir.join(CONFIG_FILE))?;
        self.ignore = load_ignore(&self.work_dir, &self.config.core.ignore_file)?;
        self.store = self.store.clone().with_compression(self.config.core.compression);
        info!(key = key, value = value, "updated config");
        Ok(())
    }

    pub fn store(&self) -> &LooseObjectStore {
        &self.store
    }

    /// Hash content as a blob, storing it when `write` is set.
    pub fn hash_object(&self, data: &[u8], write: bool) -> SdkResult<ObjectId> {
        let record = Record::new(Blob::new(data));
        if write {
            self.store.put(&record)?;
        }
        Ok(record.oid())
    }

    /// Snapshot the work tree using the configured tree options.
    pub fn write_tree(&self) -> SdkResult<ObjectId> {
        TreeBuilder::new(self, &self.store)
            .order(self.config.tree.order)
            .keep_empty_dirs(self.config.tree.keep_empty_dirs)
            .build(&self.work_dir)
    }

    /// Snapshot the work tree and commit it.
    pub fn commit(&self, parents: &[ObjectId], message: &str) -> SdkResult<ObjectId> {
        CommitBuilder::new(self, &self.store)
            .parents(parents.iter().copied())
            .message(message)
            .order(self.config.tree.order)
            .keep_empty_dirs(self.config.tree.keep_empty_dirs)
            .build(&self.work_dir)
    }

    /// Commit an existing tree. The tree must be stored; parents are not checked.
    pub fn commit_tree(
        &self,
        tree: ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> SdkResult<ObjectId> {
        let kind = self.store.get_kind(&tree)?;
        if kind != ObjectKind::Tree {
            return Err(StoreError::KindMismatch {
                id: Some(tree),
                expected: ObjectKind::Tree,
                actual: kind,
            }
            .into());
        }
        CommitBuilder::new(self, &self.store)
            .parents(parents.iter().copied())
            .message(message)
            .build_from_tree(tree)
    }

    /// Read and verify an object.
    pub fn read(&self, id: &ObjectId) -> SdkResult<Record> {
        Ok(self.store.get(id)?)
    }

    /// An object's kind, read from its header only.
    pub fn kind(&self, id: &ObjectId) -> SdkResult<ObjectKind> {
        Ok(self.store.get_kind(id)?)
    }

    /// List a tree's entries with the kind of each child.
    pub fn ls_tree(&self, id: &ObjectId) -> SdkResult<Vec<TreeListing>> {
        let tree = self.store.get_as(id, ObjectKind::Tree)?.into_tree()?;
        tree.entries()
            .iter()
            .map(|entry| -> SdkResult<TreeListing> {
                Ok(TreeListing {
                    mode: entry.mode,
                    kind: self.store.get_kind(&entry.object_id)?,
                    id: entry.object_id,
                    name: entry.name.clone(),
                })
            })
            .collect()
    }

    /// Re-read every stored object and check the links between them.
    pub fn verify(&self) -> SdkResult<VerifyReport> {
        Ok(verify_store(&self.store)?)
    }

    /// Turn a full ID or a unique hex prefix into an ID.
    pub fn resolve(&self, spec: &str) -> SdkResult<ObjectId> {
        let spec = spec.trim();
        if spec.len() == OID_HEX_LEN {
            return Ok(ObjectId::from_hex(spec)?);
        }
        if spec.len() < MIN_PREFIX_LEN
            || spec.len() > OID_HEX_LEN
            || !spec.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(SdkError::UnknownObject(spec.to_string()));
        }

        let prefix = spec.to_ascii_lowercase();
        let matches: Vec<ObjectId> = self
            .store
            .list()?
            .into_iter()
            .filter(|id| id.to_hex().starts_with(&prefix))
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(SdkError::UnknownObject(spec.to_string())),
            _ => Err(SdkError::AmbiguousPrefix {
                prefix: spec.to_string(),
                count: matches.len(),
            }),
        }
    }
}

impl RepoContext for Repository {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    fn objects_dir(&self) -> PathBuf {
        self.store.objects_dir().to_path_buf()
    }

    fn author(&self) -> SdkResult<Identity> {
        self.config.author()
    }

    fn committer(&self) -> SdkResult<Identity> {
        self.config.committer()
    }

    fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        if relative.components().next() == Some(Component::Normal(OsStr::new(METADATA_DIR))) {
            return true;
        }
        self.ignore.matched(relative, is_dir).is_ignore()
    }
}

fn load_ignore(work_dir: &Path, file_name: &str) -> SdkResult<Gitignore> {
    let path = work_dir.join(file_name);
    if !path.is_file() {
        return Ok(Gitignore::empty());
    }
    let mut builder = GitignoreBuilder::new(work_dir);
    if let Some(err) = builder.add(&path) {
        // Bad lines are skipped; the rest of the file still applies.
        warn!(path = %path.display(), error = %err, "problem in ignore file");
    }
    builder
        .build()
        .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))
}
