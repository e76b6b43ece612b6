use std::path::Path;

use sprig_store::{Commit, ObjectStore, Record};
use sprig_types::ObjectId;
use tracing::info;

use crate::context::RepoContext;
use crate::error::SdkResult;
use crate::tree::{EntryOrder, TreeBuilder};

/// Records a snapshot as a commit.
///
/// Parents are written in the order given and are not checked against the
/// store. Author and committer share one timestamp taken from the context.
pub struct CommitBuilder<'a> {
    ctx: &'a dyn RepoContext,
    store: &'a dyn ObjectStore,
    parents: Vec<ObjectId>,
    message: String,
    order: EntryOrder,
    keep_empty_dirs: bool,
}

impl<'a> CommitBuilder<'a> {
    pub fn new(ctx: &'a dyn RepoContext, store: &'a dyn ObjectStore) -> Self {
        Self {
            ctx,
            store,
            parents: Vec::new(),
            message: String::new(),
            order: EntryOrder::default(),
            keep_empty_dirs: true,
        }
    }

    pub fn parent(mut self, parent: ObjectId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn parents(mut self, parents: impl IntoIterator<Item = ObjectId>) -> Self {
        self.parents.extend(parents);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Entry order for the snapshot taken by [`build`](Self::build).
    pub fn order(mut self, order: EntryOrder) -> Self {
        self.order = order;
        self
    }

    pub fn keep_empty_dirs(mut self, keep: bool) -> Self {
        self.keep_empty_dirs = keep;
        self
    }

    /// Snapshot `root` and commit the resulting tree.
    pub fn build(&self, root: &Path) -> SdkResult<ObjectId> {
        let tree = TreeBuilder::new(self.ctx, self.store)
            .order(self.order)
            .keep_empty_dirs(self.keep_empty_dirs)
            .build(root)?;
        self.build_from_tree(tree)
    }

    /// Commit a tree that is already in the store.
    pub fn build_from_tree(&self, tree: ObjectId) -> SdkResult<ObjectId> {
        let author = self.ctx.author()?;
        let committer = self.ctx.committer()?;
        let when = self.ctx.now();

        let commit = Commit {
            tree,
            parents: self.parents.clone(),
            author: author.at(when),
            committer: committer.at(when),
            message: self.message.clone(),
        };
        let id = self.store.put(&Record::new(commit))?;
        info!(
            id = %id,
            tree = %tree,
            parents = self.parents.len(),
            "created commit"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::FixedContext;
    use crate::error::SdkError;
    use sprig_store::{InMemoryObjectStore, ObjectKind};
    use sprig_types::{Identity, Timestamp};
    use tempfile::tempdir;

    fn read_commit(store: &InMemoryObjectStore, id: &ObjectId) -> Commit {
        store.get_as(id, ObjectKind::Commit).unwrap().into_commit().unwrap()
    }

    #[test]
    fn root_commit() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello\n").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let id = CommitBuilder::new(&ctx, &store)
            .message("init")
            .build(dir.path())
            .unwrap();

        let record = store.get(&id).unwrap();
        let body = std::str::from_utf8(record.body()).unwrap();
        assert!(!body.contains("parent "));
        assert!(body.contains("\nauthor A <a@x.com> 1700000000 +0000\n"));
        assert!(body.ends_with("\n\ninit\n"));

        let commit = record.into_commit().unwrap();
        assert!(commit.is_root());
        assert_eq!(store.get_kind(&commit.tree).unwrap(), ObjectKind::Tree);
        assert_eq!(commit.author.when, commit.committer.when);
    }

    #[test]
    fn parents_keep_their_order() {
        let dir = tempdir().unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();
        let first = ObjectId::from_hash([1; 20]);
        let second = ObjectId::from_hash([2; 20]);

        let id = CommitBuilder::new(&ctx, &store)
            .parent(second)
            .parents([first])
            .message("merge")
            .build(dir.path())
            .unwrap();
        // Parents need not exist in the store.
        assert_eq!(read_commit(&store, &id).parents, vec![second, first]);
    }

    #[test]
    fn default_message_is_empty() {
        let dir = tempdir().unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();
        let id = CommitBuilder::new(&ctx, &store).build(dir.path()).unwrap();
        assert_eq!(read_commit(&store, &id).message, "");
        assert!(store.get(&id).unwrap().body().ends_with(b"\n\n\n"));
    }

    #[test]
    fn build_from_tree_skips_the_walk() {
        let dir = tempdir().unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();
        let tree = store.put_object(sprig_store::Tree::empty().into()).unwrap();

        let id = CommitBuilder::new(&ctx, &store)
            .message("from tree")
            .build_from_tree(tree)
            .unwrap();
        assert_eq!(read_commit(&store, &id).tree, tree);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn same_inputs_same_commit() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();

        let a = CommitBuilder::new(&ctx, &store).message("m").build(dir.path()).unwrap();
        let b = CommitBuilder::new(&ctx, &store).message("m").build(dir.path()).unwrap();
        assert_eq!(a, b);

        let mut later = FixedContext::new(dir.path());
        later.when = Timestamp::new(1_700_000_001, 0).unwrap();
        let c = CommitBuilder::new(&later, &store).message("m").build(dir.path()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn tree_failure_aborts_commit() {
        let dir = tempdir().unwrap();
        let ctx = FixedContext::new(dir.path());
        let store = InMemoryObjectStore::new();
        let err = CommitBuilder::new(&ctx, &store)
            .build(&dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, SdkError::Io { .. }));
        assert!(store.is_empty());
    }

    struct Anonymous<'a>(&'a FixedContext);

    impl RepoContext for Anonymous<'_> {
        fn work_dir(&self) -> &Path {
            self.0.work_dir()
        }

        fn metadata_dir(&self) -> &Path {
            self.0.metadata_dir()
        }

        fn author(&self) -> SdkResult<Identity> {
            Err(SdkError::MissingIdentity { role: "author" })
        }

        fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
            self.0.is_excluded(relative, is_dir)
        }
    }

    #[test]
    fn missing_identity_fails() {
        let dir = tempdir().unwrap();
        let inner = FixedContext::new(dir.path());
        let ctx = Anonymous(&inner);
        let store = InMemoryObjectStore::new();
        let tree = store.put_object(sprig_store::Tree::empty().into()).unwrap();
        let err = CommitBuilder::new(&ctx, &store)
            .build_from_tree(tree)
            .unwrap_err();
        assert!(matches!(err, SdkError::MissingIdentity { role: "author" }));
    }
}
