use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Length of a raw object identifier in bytes.
pub const OID_RAW_LEN: usize = 20;

/// Length of a hex-encoded object identifier.
pub const OID_HEX_LEN: usize = 40;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the SHA-1 digest of an object's canonical bytes
/// (`"<kind> <len>\0"` followed by the body). Identical canonical bytes
/// always produce the same `ObjectId`, which is what makes objects
/// deduplicatable and verifiable.
///
/// Inside tree bodies the identifier travels as its 20 raw bytes; everywhere
/// else (paths, commit bodies, display) it is the 40-char lowercase hex form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OID_RAW_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; OID_RAW_LEN]) -> Self {
        Self(hash)
    }

    /// Create an `ObjectId` from a raw byte slice, which must be exactly
    /// [`OID_RAW_LEN`] bytes long.
    pub fn from_raw(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; OID_RAW_LEN] =
            bytes.try_into().map_err(|_| TypeError::InvalidLength {
                expected: OID_RAW_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; OID_RAW_LEN] {
        &self.0
    }

    /// Lowercase hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 7 characters).
    pub fn short_hex(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(7);
        s
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != OID_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: OID_HEX_LEN,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_raw(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OID_RAW_LEN]> for ObjectId {
    fn from(bytes: [u8; OID_RAW_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; OID_RAW_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
