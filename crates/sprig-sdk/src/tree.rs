use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sprig_store::{Blob, EntryMode, ObjectStore, Record, Tree, TreeEntry};
use sprig_types::ObjectId;
use tracing::{debug, trace};

use crate::context::RepoContext;
use crate::error::{SdkError, SdkResult};

/// Order in which a directory's entries are written into its tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOrder {
    /// Whatever order the filesystem lists them in.
    #[default]
    Enumeration,
    /// By name, with directories compared as if they ended in `/`.
    Sorted,
}

/// Snapshots a directory into nested trees.
///
/// Every blob and subtree is persisted before the tree that refers to it,
/// so the returned root ID is always fully materialized in the store. If
/// the walk fails part way, objects already written stay behind unreferenced.
pub struct TreeBuilder<'a> {
    ctx: &'a dyn RepoContext,
    store: &'a dyn ObjectStore,
    order: EntryOrder,
    keep_empty_dirs: bool,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(ctx: &'a dyn RepoContext, store: &'a dyn ObjectStore) -> Self {
        Self {
            ctx,
            store,
            order: EntryOrder::default(),
            keep_empty_dirs: true,
        }
    }

    pub fn order(mut self, order: EntryOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether an empty subdirectory contributes an entry pointing at the
    /// empty tree. The root tree is always written.
    pub fn keep_empty_dirs(mut self, keep: bool) -> Self {
        self.keep_empty_dirs = keep;
        self
    }

    /// Snapshot `root` and return the ID of its tree.
    ///
    /// Paths handed to the exclusion check are relative to the context's
    /// work tree when `root` lies inside it, and relative to `root` otherwise.
    pub fn build(&self, root: &Path) -> SdkResult<ObjectId> {
        let relative = root.strip_prefix(self.ctx.work_dir()).unwrap_or(Path::new(""));
        let entries = self.collect(root, relative)?;
        self.write(entries, relative)
    }

    fn collect(&self, dir: &Path, relative: &Path) -> SdkResult<Vec<TreeEntry>> {
        let listing = fs::read_dir(dir).map_err(|e| SdkError::io(dir, e))?;
        let mut entries = Vec::new();

        for entry in listing {
            let entry = entry.map_err(|e| SdkError::io(dir, e))?;
            let path = entry.path();
            let name = entry.file_name();
            let rel = relative.join(&name);
            // file_type() does not follow links, so a link always takes the file path
            // below, where fs::read follows it. A link to a directory fails there.
            let is_dir = entry
                .file_type()
                .map_err(|e| SdkError::io(&path, e))?
                .is_dir();

            if self.ctx.is_excluded(&rel, is_dir) {
                trace!(path = %rel.display(), "excluded");
                continue;
            }

            if is_dir {
                let children = self.collect(&path, &rel)?;
                if children.is_empty() && !self.keep_empty_dirs {
                    debug!(path = %rel.display(), "skipped empty directory");
                    continue;
                }
                let id = self.write(children, &rel)?;
                entries.push(TreeEntry::new(EntryMode::Directory, name_bytes(&name), id));
            } else {
                let data = fs::read(&path).map_err(|e| SdkError::io(&path, e))?;
                let id = self.store.put(&Record::new(Blob::new(data)))?;
                debug!(path = %rel.display(), id = %id, "added blob");
                entries.push(TreeEntry::new(EntryMode::Regular, name_bytes(&name), id));
            }
        }

        Ok(entries)
    }

    fn write(&self, entries: Vec<TreeEntry>, relative: &Path) -> SdkResult<ObjectId> {
        let tree = match self.order {
            EntryOrder::Enumeration => Tree::new(entries)?,
            EntryOrder::Sorted => Tree::new_sorted(entries)?,
        };
        let count = tree.len();
        let id = self.store.put(&Record::new(tree))?;
        debug!(path = %relative.display(), id = %id, entries = count, "wrote tree");
        Ok(id)
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::FixedContext;
    use sprig_store::{InMemoryObjectStore, ObjectKind};
    use tempfile::tempdir;

    fn tree_at(store: &InMemoryObjectStore, id: &ObjectId) -> Tree {
        store.get_as(id, ObjectKind::Tree).unwrap().into_tree().unwrap()
    }

    #[test]
    fn single_file_tree() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), b"test content\n").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let id = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        let tree = tree_at(&store, &id);
        assert_eq!(tree.len(), 1);
        let entry = tree.get("file.txt").unwrap();
        assert_eq!(entry.mode, EntryMode::Regular);
        assert_eq!(
            entry.object_id.to_hex(),
            "d670460b4b4aece5915caf5c68d12f560a9fe3e4"
        );
    }

    #[test]
    fn empty_root_is_the_empty_tree() {
        let dir = tempdir().unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();
        let id = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        assert_eq!(id.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn nested_directories_are_persisted_first() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/inner")).unwrap();
        fs::write(dir.path().join("src/inner/lib.rs"), b"fn main() {}\n").unwrap();
        fs::write(dir.path().join("README"), b"hi\n").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let root = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        let src = tree_at(&store, &root).get("src").unwrap().clone();
        assert_eq!(src.mode, EntryMode::Directory);
        let inner = tree_at(&store, &src.object_id).get("inner").unwrap().clone();
        let lib = tree_at(&store, &inner.object_id).get("lib.rs").unwrap().clone();
        assert_eq!(store.get_kind(&lib.object_id).unwrap(), ObjectKind::Blob);
        // root, src, inner, lib.rs, README
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn crlf_content_is_normalized() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("win.txt"), b"a\r\nb").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let root = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        let blob_id = tree_at(&store, &root).get("win.txt").unwrap().object_id;
        let blob = store.get(&blob_id).unwrap().into_blob().unwrap();
        assert_eq!(blob.data(), b"a\nb");
    }

    #[test]
    fn metadata_directory_is_excluded() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".meta/objects")).unwrap();
        fs::write(dir.path().join(".meta/config"), b"x").unwrap();
        fs::write(dir.path().join("kept.txt"), b"kept").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let root = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        let tree = tree_at(&store, &root);
        assert_eq!(tree.len(), 1);
        assert!(tree.get(".meta").is_none());
        assert!(tree.get("kept.txt").is_some());
    }

    #[test]
    fn empty_directory_policy() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/also-empty")).unwrap();
        fs::write(dir.path().join("file"), b"x").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let kept = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        assert!(tree_at(&store, &kept).get("empty").is_some());

        let pruned = TreeBuilder::new(&ctx, &store)
            .keep_empty_dirs(false)
            .build(dir.path())
            .unwrap();
        let tree = tree_at(&store, &pruned);
        assert!(tree.get("empty").is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn sorted_order_is_independent_of_enumeration() {
        let dir = tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        fs::create_dir(dir.path().join("alpha.d")).unwrap();
        fs::write(dir.path().join("alpha.d/x"), b"x").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let id = TreeBuilder::new(&ctx, &store)
            .order(EntryOrder::Sorted)
            .build(dir.path())
            .unwrap();
        let names: Vec<_> = tree_at(&store, &id)
            .entries()
            .iter()
            .map(|e| e.name_lossy().into_owned())
            .collect();
        assert_eq!(names, ["alpha", "alpha.d", "mid", "zeta"]);
    }

    #[test]
    fn identical_content_is_stored_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), b"same").unwrap();
        fs::write(dir.path().join("b"), b"same").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let root = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        let tree = tree_at(&store, &root);
        assert_eq!(tree.get("a").unwrap().object_id, tree.get("b").unwrap().object_id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let dir = tempdir().unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();
        let err = TreeBuilder::new(&ctx, &store)
            .build(&dir.path().join("gone"))
            .unwrap_err();
        assert!(matches!(err, SdkError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_directory_aborts() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();
        let err = TreeBuilder::new(&ctx, &store).build(dir.path()).unwrap_err();
        assert!(matches!(err, SdkError::Io { .. }));
    }
}
