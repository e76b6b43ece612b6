use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use sprig_crypto::ContentHasher;
use sprig_types::{ObjectId, Signature};

use crate::error::{FormatError, StoreError, StoreResult};

/// The kind of object stored. Exactly three kinds exist; the set is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory listing: ordered entries mapping names to object references.
    Tree,
    /// Snapshot of a tree plus lineage and identity metadata.
    Commit,
}

impl ObjectKind {
    /// The header token for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    /// The hasher whose header tag matches this kind.
    pub fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Tree => &ContentHasher::TREE,
            Self::Commit => &ContentHasher::COMMIT,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            other => Err(FormatError::UnknownKind(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object.
///
/// Blobs built from workspace content have every CRLF pair rewritten to LF
/// before hashing. The original line endings are not recoverable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    /// Create a blob from file content, normalizing CRLF to LF.
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self {
            data: normalize_line_endings(data.as_ref()),
        }
    }

    /// Wrap a body read back from the store. Stored bodies are taken
    /// verbatim so their hash is preserved.
    pub(crate) fn from_stored(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Replace every `\r\n` with `\n`. A lone `\r` is kept.
pub fn normalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().peekable();
    while let Some(&byte) = iter.next() {
        if byte == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file (`100644`), refers to a blob.
    Regular,
    /// Subdirectory (`40000`), refers to a tree.
    Directory,
}

impl EntryMode {
    /// Octal mode value.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Directory => 0o040000,
        }
    }

    /// The mode as written in a tree body. No zero padding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Directory => "40000",
        }
    }

    /// The kind of object an entry with this mode refers to.
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            Self::Regular => ObjectKind::Blob,
            Self::Directory => ObjectKind::Tree,
        }
    }

    /// Parse the ASCII mode field of a tree entry.
    pub fn parse(field: &[u8]) -> Result<Self, FormatError> {
        match field {
            b"100644" => Ok(Self::Regular),
            b"40000" => Ok(Self::Directory),
            other => Err(FormatError::UnknownMode(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// File mode (regular file or directory).
    pub mode: EntryMode,
    /// Entry name as raw bytes; never empty, never contains NUL.
    pub name: Vec<u8>,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<Vec<u8>>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }

    /// The entry name, with invalid UTF-8 replaced.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Sort key that places a directory as if its name ended in `/`.
    fn sort_key(&self) -> Cow<'_, [u8]> {
        match self.mode {
            EntryMode::Regular => Cow::Borrowed(&self.name),
            EntryMode::Directory => {
                let mut key = self.name.clone();
                key.push(b'/');
                Cow::Owned(key)
            }
        }
    }
}

/// Directory listing object.
///
/// Entries keep the order they were given in. That order is part of the
/// encoded bytes, so the same entries in a different order produce a
/// different tree ID.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree with the given entries, in the given order.
    ///
    /// Fails if any name is empty or contains a NUL byte, since such a name
    /// cannot be encoded.
    pub fn new(entries: Vec<TreeEntry>) -> StoreResult<Self> {
        for entry in &entries {
            if entry.name.is_empty() || entry.name.contains(&0) {
                return Err(StoreError::Format {
                    id: None,
                    source: FormatError::InvalidEntryName(entry.name_lossy().into_owned()),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Create a tree with entries sorted by name, directories compared as if
    /// their name carried a trailing `/`.
    pub fn new_sorted(mut entries: Vec<TreeEntry>) -> StoreResult<Self> {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self::new(entries)
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name.as_bytes())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Snapshot of a tree with lineage and identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commits, first parent first. Empty for a root commit.
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// Message without its trailing newline.
    pub message: String,
}

impl Commit {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// A typed object of one of the three kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Self::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Self::Commit(commit) => Some(commit),
            _ => None,
        }
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Self::Commit(commit)
    }
}
