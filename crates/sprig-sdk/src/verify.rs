use sprig_store::{ErrorClass, Object, ObjectKind, ObjectStore, StoreError, StoreResult};
use sprig_types::ObjectId;
use tracing::{debug, warn};

/// Result of checking every object in a store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    pub violations: Vec<Violation>,
}

impl VerifyReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A problem found with one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub id: ObjectId,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// The object's bytes fail the grammar or do not decompress.
    Malformed,
    /// The object's bytes hash to a different ID.
    Corrupt,
    /// The object refers to an ID that is not stored.
    MissingReference,
    /// The object refers to an object of the wrong kind.
    WrongKind,
}

/// Re-read every object, then check that trees and commits only refer to
/// objects that exist and have the expected kind.
///
/// Commit parents are checked for presence and kind like any other
/// reference. I/O failures abort the walk.
pub fn verify_store(store: &dyn ObjectStore) -> StoreResult<VerifyReport> {
    let mut report = VerifyReport::default();

    for id in store.list()? {
        report.checked += 1;
        let record = match store.get(&id) {
            Ok(record) => record,
            Err(err) => {
                let kind = match err.class() {
                    ErrorClass::Format => ViolationKind::Malformed,
                    ErrorClass::Integrity => ViolationKind::Corrupt,
                    ErrorClass::Lookup | ErrorClass::Io => return Err(err),
                };
                warn!(id = %id, error = %err, "bad object");
                report.violations.push(Violation {
                    id,
                    kind,
                    description: err.to_string(),
                });
                continue;
            }
        };

        match record.object() {
            Object::Blob(_) => {}
            Object::Tree(tree) => {
                for entry in tree.entries() {
                    check_reference(
                        store,
                        &mut report,
                        id,
                        entry.object_id,
                        entry.mode.object_kind(),
                        &format!("entry {:?}", entry.name_lossy()),
                    )?;
                }
            }
            Object::Commit(commit) => {
                check_reference(store, &mut report, id, commit.tree, ObjectKind::Tree, "tree")?;
                for parent in &commit.parents {
                    check_reference(store, &mut report, id, *parent, ObjectKind::Commit, "parent")?;
                }
            }
        }
    }

    debug!(
        checked = report.checked,
        violations = report.violations.len(),
        "verified store"
    );
    Ok(report)
}

fn check_reference(
    store: &dyn ObjectStore,
    report: &mut VerifyReport,
    from: ObjectId,
    target: ObjectId,
    expected: ObjectKind,
    role: &str,
) -> StoreResult<()> {
    match store.get_kind(&target) {
        Ok(actual) if actual == expected => {}
        Ok(actual) => report.violations.push(Violation {
            id: from,
            kind: ViolationKind::WrongKind,
            description: format!("{role} {target} is a {actual}, expected a {expected}"),
        }),
        Err(StoreError::NotFound { .. }) => report.violations.push(Violation {
            id: from,
            kind: ViolationKind::MissingReference,
            description: format!("{role} {target} is missing"),
        }),
        Err(err) if err.class() == ErrorClass::Io => return Err(err),
        // A broken target is reported when the walk reaches it.
        Err(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_store::{Blob, Commit, EntryMode, InMemoryObjectStore, LooseObjectStore, Tree, TreeEntry};
    use sprig_types::{Identity, Timestamp};

    fn commit(tree: ObjectId, parents: Vec<ObjectId>) -> Commit {
        let sig = Identity::new("A", "a@x.com")
            .unwrap()
            .at(Timestamp::new(0, 0).unwrap());
        Commit {
            tree,
            parents,
            author: sig.clone(),
            committer: sig,
            message: "m".into(),
        }
    }

    #[test]
    fn healthy_store() {
        let store = InMemoryObjectStore::new();
        let blob = store.put_object(Blob::new(b"x").into()).unwrap();
        let tree = store
            .put_object(Tree::new(vec![TreeEntry::new(EntryMode::Regular, "x", blob)]).unwrap().into())
            .unwrap();
        let root = store.put_object(commit(tree, vec![]).into()).unwrap();
        store.put_object(commit(tree, vec![root]).into()).unwrap();

        let report = verify_store(&store).unwrap();
        assert_eq!(report.checked, 4);
        assert!(report.is_valid(), "{:?}", report.violations);
    }

    #[test]
    fn dangling_and_mistyped_references() {
        let store = InMemoryObjectStore::new();
        let blob = store.put_object(Blob::new(b"x").into()).unwrap();
        let missing = ObjectId::from_hash([7; 20]);
        let tree = store
            .put_object(
                Tree::new(vec![
                    TreeEntry::new(EntryMode::Directory, "not-a-tree", blob),
                    TreeEntry::new(EntryMode::Regular, "gone", missing),
                ])
                .unwrap()
                .into(),
            )
            .unwrap();

        let report = verify_store(&store).unwrap();
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            [ViolationKind::WrongKind, ViolationKind::MissingReference]
        );
        assert!(report.violations.iter().all(|v| v.id == tree));
    }

    #[test]
    fn corrupt_objects_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path());
        let a = store.put_object(Blob::new(b"a").into()).unwrap();
        let b = store.put_object(Blob::new(b"b").into()).unwrap();
        let c = store.put_object(Blob::new(b"c").into()).unwrap();
        // a now holds b's bytes, c holds no zlib stream at all.
        std::fs::copy(store.path_for(&b), store.path_for(&a)).unwrap();
        std::fs::write(store.path_for(&c), b"garbage").unwrap();

        let report = verify_store(&store).unwrap();
        assert_eq!(report.checked, 3);
        let found: Vec<_> = report.violations.iter().map(|v| (v.id, v.kind)).collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&(a, ViolationKind::Corrupt)));
        assert!(found.contains(&(c, ViolationKind::Malformed)));
    }
}
