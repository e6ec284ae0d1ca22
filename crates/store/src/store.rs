//! File-backed blob store for index snapshots.
//!
//! One directory per index name, one file per key. Blobs are framed as
//! `[payload][magic "SWB1"][CRC32 BE]` and written atomically via a temp
//! file + rename, so a crash mid-write never corrupts the current blob.
//! Legacy blobs without the footer are accepted with a warning.

use crate::error::StoreError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Magic bytes preceding the CRC32 footer of a framed blob.
const BLOB_CRC_MAGIC: &[u8; 4] = b"SWB1";

/// A key-value blob store scoped to one index name.
///
/// No concurrent writers: callers are expected to route all writes through
/// a single owner (the mutation serializer does this).
#[derive(Debug)]
pub struct BlobStore {
    name: String,
    dir: PathBuf,
}

impl BlobStore {
    /// Open (creating if needed) the store directory for `name` under `root`.
    pub fn open(root: impl AsRef<Path>, name: &str) -> Result<Self, StoreError> {
        let dir = root.as_ref().join(name);
        fs::create_dir_all(&dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&dir, fs::Permissions::from_mode(0o700));
        }
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    /// The index name this store is scoped to.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.blob"))
    }

    /// Store a blob under `key`, replacing any previous value.
    ///
    /// The write goes to a temp file first and is renamed into place.
    pub fn put_blob(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        let crc = crc32fast::hash(blob);
        let mut framed = Vec::with_capacity(blob.len() + 8);
        framed.extend_from_slice(blob);
        framed.extend_from_slice(BLOB_CRC_MAGIC);
        framed.extend_from_slice(&crc.to_be_bytes());

        let path = self.blob_path(key);
        let tmp = self.dir.join(format!("{key}.blob.tmp"));
        fs::write(&tmp, &framed)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp, &path)?;

        tracing::info!(
            store = %self.name,
            key,
            bytes = blob.len(),
            "stored blob (CRC32 {:#010x})",
            crc
        );
        Ok(())
    }

    /// Fetch the blob stored under `key`, verifying its CRC32 footer.
    ///
    /// A missing file surfaces as [`StoreError::SnapshotMissing`]; a footer
    /// mismatch as [`StoreError::Corrupt`]. Blobs without the footer are
    /// treated as legacy payloads and returned as-is.
    pub fn get_blob(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::SnapshotMissing(key.to_string()))
            }
            Err(e) => return Err(StoreError::Unavailable(e)),
        };

        if raw.len() >= 8 && &raw[raw.len() - 8..raw.len() - 4] == BLOB_CRC_MAGIC {
            let payload = &raw[..raw.len() - 8];
            let stored = u32::from_be_bytes([
                raw[raw.len() - 4],
                raw[raw.len() - 3],
                raw[raw.len() - 2],
                raw[raw.len() - 1],
            ]);
            let computed = crc32fast::hash(payload);
            if computed != stored {
                return Err(StoreError::Corrupt(format!(
                    "CRC32 mismatch for key '{key}': stored {stored:#010x}, computed {computed:#010x}"
                )));
            }
            tracing::debug!(store = %self.name, key, "blob CRC32 verified");
            Ok(payload.to_vec())
        } else {
            tracing::warn!(store = %self.name, key, "blob has no CRC32 footer (legacy format)");
            Ok(raw)
        }
    }

    /// Remove the store directory and everything in it.
    pub fn destroy(self) -> Result<(), StoreError> {
        fs::remove_dir_all(&self.dir)?;
        tracing::info!(store = %self.name, "destroyed blob store");
        Ok(())
    }
}
