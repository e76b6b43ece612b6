use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use sprig_types::ObjectId;

use crate::codec::{self, Record};
use crate::error::{StoreError, StoreResult};
use crate::object::ObjectKind;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Objects are held as canonical bytes
/// behind a `RwLock` and decoded (and re-verified) on every read, so it
/// behaves like the loose store minus compression and files.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Total canonical bytes across all stored objects, headers included.
    pub fn total_bytes(&self) -> u64 {
        self.read_map().values().map(|bytes| bytes.len() as u64).sum()
    }

    /// Replace the bytes stored under `id` without any checks.
    #[cfg(test)]
    pub(crate) fn overwrite(&self, id: ObjectId, bytes: Vec<u8>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, bytes);
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ObjectId, Vec<u8>>> {
        // Entries are only ever inserted whole, so a poisoned map is still consistent.
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, record: &Record) -> StoreResult<ObjectId> {
        let id = record.oid();
        let mut map = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(id)
            .or_insert_with(|| record.canonical().to_vec());
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<Record> {
        let map = self.read_map();
        let bytes = map
            .get(id)
            .ok_or(StoreError::NotFound { id: *id, path: None })?;
        codec::decode(bytes, None, Some(id))
    }

    fn get_kind(&self, id: &ObjectId) -> StoreResult<ObjectKind> {
        let map = self.read_map();
        let bytes = map
            .get(id)
            .ok_or(StoreError::NotFound { id: *id, path: None })?;
        let header = codec::parse_header(bytes).map_err(|source| StoreError::Format {
            id: Some(*id),
            source,
        })?;
        Ok(header.kind)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.read_map().contains_key(id))
    }

    fn list(&self) -> StoreResult<Vec<ObjectId>> {
        let mut ids: Vec<ObjectId> = self.read_map().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}
