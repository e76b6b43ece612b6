use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sprig_types::{ObjectId, OID_HEX_LEN};
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::codec::{self, Record, MAX_HEADER_LEN};
use crate::error::{StoreError, StoreResult};
use crate::object::ObjectKind;
use crate::traits::ObjectStore;

/// Default zlib level for new objects.
pub const DEFAULT_COMPRESSION: u32 = 6;

/// One zlib-compressed file per object, fanned out by the first two hex
/// digits of the ID: `objects/ab/cdef...`.
///
/// Writes go to a temporary file in the fan-out directory and are renamed
/// into place, so a reader never sees a partial object and two processes
/// storing the same object cannot corrupt each other.
#[derive(Clone, Debug)]
pub struct LooseObjectStore {
    objects_dir: PathBuf,
    compression: Compression,
}

impl LooseObjectStore {
    /// Open a store rooted at `objects_dir`. The directory is created lazily
    /// on the first write.
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
            compression: Compression::new(DEFAULT_COMPRESSION),
        }
    }

    /// Set the zlib level (0-9) used for new objects. Higher values are clamped.
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Where the object with this ID lives: `objects/<hex[0..2]>/<hex[2..40]>`.
    pub fn path_for(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    fn open(&self, id: &ObjectId) -> StoreResult<(PathBuf, File)> {
        let path = self.path_for(id);
        match File::open(&path) {
            Ok(file) => Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                id: *id,
                path: Some(path),
            }),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn write_new(&self, record: &Record, path: &Path) -> StoreResult<()> {
        let dir = path.parent().unwrap_or(self.objects_dir.as_path());
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        let mut encoder = ZlibEncoder::new(tmp, self.compression);
        encoder
            .write_all(record.canonical())
            .map_err(|e| StoreError::io(path, e))?;
        let tmp = encoder.finish().map_err(|e| StoreError::io(path, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(path, e))?;

        if let Err(err) = tmp.persist(path) {
            // Another writer finished the same object first.
            if !path.is_file() {
                return Err(StoreError::io(path, err.error));
            }
        }
        Ok(())
    }
}

impl ObjectStore for LooseObjectStore {
    fn put(&self, record: &Record) -> StoreResult<ObjectId> {
        let id = record.oid();
        let path = self.path_for(&id);

        if path.is_file() {
            trace!(id = %id, "object already stored");
            return Ok(id);
        }

        self.write_new(record, &path)?;
        debug!(
            id = %id,
            kind = %record.kind(),
            size = record.len(),
            "stored object"
        );
        Ok(id)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<Record> {
        let (path, mut file) = self.open(id)?;
        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed)
            .map_err(|e| StoreError::io(&path, e))?;

        let mut canonical = Vec::new();
        ZlibDecoder::new(&compressed[..])
            .read_to_end(&mut canonical)
            .map_err(|source| StoreError::Decompress {
                id: *id,
                path: path.clone(),
                source,
            })?;

        let record = codec::decode(&canonical, None, Some(id))?;
        trace!(id = %id, kind = %record.kind(), "read object");
        Ok(record)
    }

    fn get_kind(&self, id: &ObjectId) -> StoreResult<ObjectKind> {
        let (path, file) = self.open(id)?;
        let mut prefix = Vec::with_capacity(MAX_HEADER_LEN);
        ZlibDecoder::new(BufReader::new(file))
            .take(MAX_HEADER_LEN as u64)
            .read_to_end(&mut prefix)
            .map_err(|source| StoreError::Decompress {
                id: *id,
                path,
                source,
            })?;

        let header = codec::parse_header(&prefix).map_err(|source| StoreError::Format {
            id: Some(*id),
            source,
        })?;
        Ok(header.kind)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.path_for(id).is_file())
    }

    fn list(&self) -> StoreResult<Vec<ObjectId>> {
        let fanouts = match fs::read_dir(&self.objects_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.objects_dir, e)),
        };

        let mut ids = Vec::new();
        for fanout in fanouts {
            let fanout = fanout.map_err(|e| StoreError::io(&self.objects_dir, e))?;
            let prefix = fanout.file_name().to_string_lossy().into_owned();
            if prefix.len() != 2 || !is_lower_hex(&prefix) {
                continue;
            }
            let dir = fanout.path();
            if !dir.is_dir() {
                continue;
            }

            for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
                let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
                let rest = entry.file_name().to_string_lossy().into_owned();
                if rest.len() != OID_HEX_LEN - 2 || !is_lower_hex(&rest) {
                    warn!(path = %entry.path().display(), "ignoring foreign file in object store");
                    continue;
                }
                match ObjectId::from_hex(&format!("{prefix}{rest}")) {
                    Ok(id) => ids.push(id),
                    Err(e) => warn!(path = %entry.path().display(), error = %e, "bad object file name"),
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
