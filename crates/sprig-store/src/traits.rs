use sprig_types::ObjectId;

use crate::codec::Record;
use crate::error::{StoreError, StoreResult};
use crate::object::{Object, ObjectKind};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - An object is stored under the hash of its canonical bytes and is never
///   rewritten. Storing it again is a no-op.
/// - Every object handed back by `get` has been checked against the ID it
///   was asked for. Corrupt data is an error, never a result.
/// - Concurrent reads and writes are safe. Two writers racing on the same
///   object both succeed with the same ID.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Store an encoded object and return its ID.
    fn put(&self, record: &Record) -> StoreResult<ObjectId>;

    /// Fetch and verify an object.
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under `id`.
    fn get(&self, id: &ObjectId) -> StoreResult<Record>;

    /// Report an object's kind without decoding its body.
    ///
    /// Only the header is checked, so this does not detect a corrupt body.
    fn get_kind(&self, id: &ObjectId) -> StoreResult<ObjectKind>;

    /// Whether an object is stored under `id`.
    fn contains(&self, id: &ObjectId) -> StoreResult<bool>;

    /// All stored object IDs, sorted.
    fn list(&self) -> StoreResult<Vec<ObjectId>>;

    /// Encode and store a typed object.
    fn put_object(&self, object: Object) -> StoreResult<ObjectId> {
        self.put(&Record::new(object))
    }

    /// Fetch an object that must be of the given kind.
    fn get_as(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<Record> {
        let record = self.get(id)?;
        if record.kind() != kind {
            return Err(StoreError::KindMismatch {
                id: Some(*id),
                expected: kind,
                actual: record.kind(),
            });
        }
        Ok(record)
    }
}
