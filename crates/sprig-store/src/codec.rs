//! Canonical byte form of objects.
//!
//! Every object is stored as `"<kind> <len>\0"` followed by `len` body
//! bytes, and identified by the SHA-1 of that whole sequence. This module
//! maps typed objects to and from that form:
//!
//! ```text
//! blob    body = file content (CRLF already normalized)
//! tree    body = ( <mode> SP <name> NUL <20 raw oid bytes> )*
//! commit  body = tree <hex>\n (parent <hex>\n)* author <sig>\n
//!                committer <sig>\n \n <message>\n
//! ```

use std::fmt::Write as _;

use sprig_crypto::ContentHasher;
use sprig_types::{ObjectId, Signature, OID_RAW_LEN};

use crate::error::{FormatError, StoreError, StoreResult};
use crate::object::{Blob, Commit, EntryMode, Object, ObjectKind, Tree, TreeEntry};

/// Upper bound on header length: `"commit "` + 20 digits + NUL, rounded up.
pub const MAX_HEADER_LEN: usize = 32;

/// Output of [`encode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoded {
    /// `"<kind> <len>\0"`.
    pub header: Vec<u8>,
    /// Header followed by body: the exact bytes hashed and stored.
    pub bytes: Vec<u8>,
    pub oid: ObjectId,
}

/// Build the canonical bytes for a body of the given kind and hash them.
pub fn encode(kind: ObjectKind, body: &[u8]) -> Encoded {
    let header = kind.hasher().header(body.len());
    let mut bytes = Vec::with_capacity(header.len() + body.len());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(body);
    let oid = ContentHasher::raw_hash(&bytes);
    Encoded { header, bytes, oid }
}

/// A parsed object header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub kind: ObjectKind,
    /// Declared body length.
    pub len: usize,
    /// Bytes taken by the header, NUL included.
    pub header_len: usize,
}

/// Parse the header at the start of `bytes`.
///
/// Only the bytes up to the first NUL are examined, so a prefix of an
/// object is enough.
pub fn parse_header(bytes: &[u8]) -> Result<Header, FormatError> {
    let nul = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(FormatError::MissingNul)?;
    let raw = &bytes[..nul];
    let malformed = || FormatError::MalformedHeader(String::from_utf8_lossy(raw).into_owned());

    let text = std::str::from_utf8(raw).map_err(|_| malformed())?;
    let (kind, len) = text.split_once(' ').ok_or_else(malformed)?;
    let kind: ObjectKind = kind.parse()?;

    let canonical_digits = !len.is_empty()
        && len.bytes().all(|b| b.is_ascii_digit())
        && (len == "0" || !len.starts_with('0'));
    if !canonical_digits {
        return Err(malformed());
    }
    let len = len.parse().map_err(|_| malformed())?;

    Ok(Header {
        kind,
        len,
        header_len: nul + 1,
    })
}

/// Parse canonical bytes into a [`Record`], checking them against whatever
/// the caller expects.
///
/// The checks run in order: header grammar, expected kind, declared length,
/// expected hash, then the kind-specific body grammar. Nothing is returned
/// unless every check passes.
pub fn decode(
    bytes: &[u8],
    expected_kind: Option<ObjectKind>,
    expected_oid: Option<&ObjectId>,
) -> StoreResult<Record> {
    let header = parse_header(bytes).map_err(|source| StoreError::Format {
        id: expected_oid.copied(),
        source,
    })?;

    if let Some(expected) = expected_kind {
        if header.kind != expected {
            return Err(StoreError::KindMismatch {
                id: expected_oid.copied(),
                expected,
                actual: header.kind,
            });
        }
    }

    let body = &bytes[header.header_len..];
    if body.len() != header.len {
        return Err(StoreError::Format {
            id: expected_oid.copied(),
            source: FormatError::LengthMismatch {
                declared: header.len,
                actual: body.len(),
            },
        });
    }

    let computed = ContentHasher::raw_hash(bytes);
    if let Some(expected) = expected_oid {
        if computed != *expected {
            return Err(StoreError::HashMismatch {
                id: *expected,
                computed,
            });
        }
    }

    let object = decode_body(header.kind, body).map_err(|source| StoreError::Format {
        id: Some(computed),
        source,
    })?;

    Ok(Record {
        oid: computed,
        object,
        canonical: bytes.to_vec(),
        header_len: header.header_len,
    })
}

/// Serialize a typed object's body.
pub fn encode_body(object: &Object) -> Vec<u8> {
    match object {
        Object::Blob(blob) => blob.data().to_vec(),
        Object::Tree(tree) => encode_tree(tree),
        Object::Commit(commit) => encode_commit(commit).into_bytes(),
    }
}

/// Parse a body of the given kind.
pub fn decode_body(kind: ObjectKind, body: &[u8]) -> Result<Object, FormatError> {
    match kind {
        ObjectKind::Blob => Ok(Object::Blob(Blob::from_stored(body))),
        ObjectKind::Tree => decode_tree(body).map(Object::Tree),
        ObjectKind::Commit => decode_commit(body).map(Object::Commit),
    }
}

fn encode_tree(tree: &Tree) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in tree.entries() {
        out.extend_from_slice(entry.mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(&entry.name);
        out.push(0);
        out.extend_from_slice(entry.object_id.as_bytes());
    }
    out
}

fn decode_tree(body: &[u8]) -> Result<Tree, FormatError> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < body.len() {
        let rest = &body[pos..];

        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or(FormatError::MalformedTree {
                offset: pos,
                reason: "missing space after mode",
            })?;
        let mode_field = &rest[..space];
        if mode_field.is_empty() || !mode_field.iter().all(u8::is_ascii_digit) {
            return Err(FormatError::MalformedTree {
                offset: pos,
                reason: "mode is not decimal digits",
            });
        }
        let mode = EntryMode::parse(mode_field)?;

        let name_start = space + 1;
        let nul = rest[name_start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(FormatError::MalformedTree {
                offset: pos + name_start,
                reason: "missing NUL after name",
            })?;
        let name = &rest[name_start..name_start + nul];
        if name.is_empty() {
            return Err(FormatError::InvalidEntryName(String::new()));
        }

        let oid_start = name_start + nul + 1;
        let oid_end = oid_start + OID_RAW_LEN;
        if rest.len() < oid_end {
            return Err(FormatError::MalformedTree {
                offset: pos + oid_start,
                reason: "truncated object id",
            });
        }
        let object_id = ObjectId::from_raw(&rest[oid_start..oid_end]).map_err(|_| {
            FormatError::MalformedTree {
                offset: pos + oid_start,
                reason: "truncated object id",
            }
        })?;

        entries.push(TreeEntry::new(mode, name, object_id));
        pos += oid_end;
    }

    // Names were checked above, so construction cannot fail on them.
    Tree::new(entries).map_err(|_| FormatError::InvalidEntryName(String::new()))
}

fn encode_commit(commit: &Commit) -> String {
    let mut out = String::new();
    // Writing to a String is infallible.
    let _ = writeln!(out, "tree {}", commit.tree);
    for parent in &commit.parents {
        let _ = writeln!(out, "parent {parent}");
    }
    let _ = writeln!(out, "author {}", commit.author);
    let _ = writeln!(out, "committer {}", commit.committer);
    out.push('\n');
    out.push_str(&commit.message);
    out.push('\n');
    out
}

fn decode_commit(body: &[u8]) -> Result<Commit, FormatError> {
    let malformed = |reason: &str| FormatError::MalformedCommit(reason.to_string());

    let text = std::str::from_utf8(body).map_err(|_| malformed("body is not UTF-8"))?;
    let (headers, message) = text
        .split_once("\n\n")
        .ok_or_else(|| malformed("missing blank line before message"))?;
    let message = message.strip_suffix('\n').unwrap_or(message);

    let mut lines = headers.split('\n').peekable();

    let tree = lines
        .next()
        .and_then(|line| line.strip_prefix("tree "))
        .ok_or_else(|| malformed("missing tree line"))?;
    let tree = ObjectId::from_hex(tree).map_err(|e| malformed(&format!("tree id: {e}")))?;

    let mut parents = Vec::new();
    while let Some(parent) = lines.peek().and_then(|line| line.strip_prefix("parent ")) {
        parents.push(ObjectId::from_hex(parent).map_err(|e| malformed(&format!("parent id: {e}")))?);
        lines.next();
    }

    let author = signature_line(lines.next(), "author")?;
    let committer = signature_line(lines.next(), "committer")?;

    if let Some(extra) = lines.next() {
        return Err(malformed(&format!("unexpected header line {extra:?}")));
    }

    Ok(Commit {
        tree,
        parents,
        author,
        committer,
        message: message.to_string(),
    })
}

fn signature_line(line: Option<&str>, field: &str) -> Result<Signature, FormatError> {
    let value = line
        .and_then(|line| line.strip_prefix(field))
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| FormatError::MalformedCommit(format!("missing {field} line")))?;
    value
        .parse()
        .map_err(|e| FormatError::MalformedCommit(format!("{field}: {e}")))
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A typed object bound to its canonical bytes and ID.
///
/// A `Record` is only produced by [`Record::new`] (encoding) or [`decode`]
/// (parsing verified bytes), so `oid` always equals the hash of
/// `canonical`. Records are immutable: a changed object is a new record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    oid: ObjectId,
    object: Object,
    canonical: Vec<u8>,
    header_len: usize,
}

impl Record {
    /// Encode an object and compute its ID.
    pub fn new(object: impl Into<Object>) -> Self {
        let object = object.into();
        let encoded = encode(object.kind(), &encode_body(&object));
        Self {
            oid: encoded.oid,
            object,
            header_len: encoded.header.len(),
            canonical: encoded.bytes,
        }
    }

    pub fn oid(&self) -> ObjectId {
        self.oid
    }

    pub fn kind(&self) -> ObjectKind {
        self.object.kind()
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn into_object(self) -> Object {
        self.object
    }

    /// Header followed by body.
    pub fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    pub fn header(&self) -> &[u8] {
        &self.canonical[..self.header_len]
    }

    pub fn body(&self) -> &[u8] {
        &self.canonical[self.header_len..]
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.canonical.len() - self.header_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_blob(self) -> StoreResult<Blob> {
        match self.object {
            Object::Blob(blob) => Ok(blob),
            other => Err(kind_mismatch(self.oid, ObjectKind::Blob, other.kind())),
        }
    }

    pub fn into_tree(self) -> StoreResult<Tree> {
        match self.object {
            Object::Tree(tree) => Ok(tree),
            other => Err(kind_mismatch(self.oid, ObjectKind::Tree, other.kind())),
        }
    }

    pub fn into_commit(self) -> StoreResult<Commit> {
        match self.object {
            Object::Commit(commit) => Ok(commit),
            other => Err(kind_mismatch(self.oid, ObjectKind::Commit, other.kind())),
        }
    }
}

fn kind_mismatch(id: ObjectId, expected: ObjectKind, actual: ObjectKind) -> StoreError {
    StoreError::KindMismatch {
        id: Some(id),
        expected,
        actual,
    }
}
