use sha1::{Digest, Sha1};
use sprig_types::{ObjectId, OID_RAW_LEN};

/// Kind-tagged SHA-1 content hasher.
///
/// Each hasher carries the kind token (`"blob"`, `"tree"`, `"commit"`) that
/// starts the canonical header. Hashing a body prepends
/// `"<token> <len>\0"`, so the resulting [`ObjectId`] covers exactly the
/// bytes that are written to the store.
pub struct ContentHasher {
    tag: &'static str,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self { tag: "blob" };
    /// Hasher for tree objects.
    pub const TREE: Self = Self { tag: "tree" };
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self { tag: "commit" };

    /// The canonical header for a body of `len` bytes.
    pub fn header(&self, len: usize) -> Vec<u8> {
        format!("{} {}\0", self.tag, len).into_bytes()
    }

    /// Hash a body, header included.
    pub fn hash(&self, body: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(self.header(body.len()));
        hasher.update(body);
        finish(hasher)
    }

    /// Verify that a body produces the expected object ID.
    pub fn verify(&self, body: &[u8], expected: &ObjectId) -> bool {
        self.hash(body) == *expected
    }

    /// SHA-1 over bytes that already carry their header.
    pub fn raw_hash(canonical: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(canonical);
        finish(hasher)
    }

    /// The kind token used by this hasher.
    pub fn tag(&self) -> &str {
        self.tag
    }
}

fn finish(hasher: Sha1) -> ObjectId {
    let digest = hasher.finalize();
    let mut bytes = [0u8; OID_RAW_LEN];
    bytes.copy_from_slice(&digest);
    ObjectId::from_hash(bytes)
}
